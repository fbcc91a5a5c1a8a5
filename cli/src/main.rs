//! CLI entrypoint for Chainbet Quorum
//!
//! This is the main binary that wires together all layers using
//! dependency injection and runs a local replica fleet.

use anyhow::{Context, Result, anyhow, bail};
use chainbet_application::{HolderCountSource, NoProgress, RoundProgressNotifier};
use chainbet_infrastructure::{ConfigLoader, Ed25519Signer, FileConfig, LocalFleet, StaticHolderSource};
use chainbet_presentation::{Cli, ConsoleFormatter, OutputFormat, ProgressReporter, SimpleProgress};
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Holder counts used when neither fixed counts nor an explorer are configured
const FALLBACK_COUNTS: (u64, u64) = (1_000, 1_000);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(&cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    info!("Starting Chainbet Quorum");

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Could not load configuration: {}", e))?
    };
    config = config.with_local_participants(cli.replicas);
    if let Some(rounds) = cli.rounds {
        config.round.max_rounds = Some(rounds);
    }
    if cli.in_memory {
        config.journal.in_memory = true;
    }

    let settings = match config.replica_settings() {
        Ok(settings) => settings,
        Err(issues) => {
            for issue in &issues {
                error!("{}", issue);
                eprintln!("config: {}", issue);
            }
            bail!("Invalid configuration ({} issues)", issues.len());
        }
    };
    check_local_keys(&config)?;

    // === Dependency Injection ===
    let oracle = build_oracle(&cli, &config)?;
    let participants = config.participants.len() as u32;
    let mut builder = LocalFleet::builder(settings, participants, oracle).with_pool(cli.pool);
    if !config.journal.in_memory {
        builder = builder.with_journal_dir(&config.journal.dir);
    }
    let fleet = builder.build().context("Could not open replica journals")?;

    if let Some(choice) = cli.bet_choice {
        let bet_id = fleet
            .ledger()
            .place_bet(choice, cli.bet_stake, cli.bettor_address());
        info!("Placed bet {} on {} (stake {})", bet_id, choice, cli.bet_stake);
    }

    // === Run ===
    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping replicas");
            ctrl_c_token.cancel();
        }
    });

    let show_progress = !cli.quiet && cli.output != OutputFormat::Json;
    let reporter = (show_progress && std::io::stderr().is_terminal())
        .then(|| Arc::new(ProgressReporter::new()));
    let progress: Arc<dyn RoundProgressNotifier> = match (&reporter, show_progress) {
        (Some(reporter), _) => reporter.clone(),
        (None, true) => Arc::new(SimpleProgress),
        (None, false) => Arc::new(NoProgress),
    };

    let reports = fleet.run(token, progress).await?;
    if let Some(reporter) = reporter {
        reporter.finish();
    }

    // Output results
    let output = match cli.output {
        OutputFormat::Full => ConsoleFormatter::format(&reports),
        OutputFormat::Summary => ConsoleFormatter::format_summary(&reports),
        OutputFormat::Json => ConsoleFormatter::format_json(&reports),
    };
    println!("{}", output);

    let halted: Vec<String> = reports
        .iter()
        .filter(|r| r.halted.is_some())
        .map(|r| r.replica.to_string())
        .collect();
    if !halted.is_empty() {
        bail!("Replicas need operator attention: {}", halted.join(", "));
    }
    Ok(())
}

/// Initialize logging based on verbosity level, optionally mirrored to a
/// daily-rotated file
fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "chainbet-quorum.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Could not initialize logging: {}", e))?;

    Ok(guard)
}

/// The local fleet signs with locally derived keys only
fn check_local_keys(config: &FileConfig) -> Result<()> {
    let keys = config.participant_keys()?;
    for (position, (id, key)) in keys.iter().enumerate() {
        if id.0 as usize != position {
            bail!("Local fleet needs participant ids 0..{}, found {}", keys.len(), id);
        }
        if *key != Ed25519Signer::local(*id).verifying_key() {
            bail!(
                "Participant {} does not use its locally derived key; remove [[participants]] to run a local fleet",
                id
            );
        }
    }
    Ok(())
}

fn build_oracle(cli: &Cli, config: &FileConfig) -> Result<Arc<dyn HolderCountSource>> {
    if let Some((arbitrum, base)) = cli.static_counts() {
        info!("Using fixed holder counts: arbitrum {}, base {}", arbitrum, base);
        return Ok(Arc::new(StaticHolderSource::new(arbitrum, base)));
    }

    #[cfg(feature = "blockscout")]
    if config.oracle.has_tokens() {
        let source = chainbet_infrastructure::BlockscoutHolderSource::new(
            config.oracle.arbitrum.to_endpoint(),
            config.oracle.base.to_endpoint(),
            std::time::Duration::from_secs(config.oracle.request_timeout_seconds),
        )?;
        info!("Querying holder counts from Blockscout explorers");
        return Ok(Arc::new(source));
    }

    #[cfg(not(feature = "blockscout"))]
    if config.oracle.has_tokens() {
        warn!("Token addresses configured but built without the blockscout feature");
    }

    let (arbitrum, base) = FALLBACK_COUNTS;
    warn!(
        "No holder counts given; using fixed counts arbitrum {}, base {}",
        arbitrum, base
    );
    Ok(Arc::new(StaticHolderSource::new(arbitrum, base)))
}

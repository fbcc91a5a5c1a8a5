//! Progress reporting for replica rounds

use chainbet_application::RoundProgressNotifier;
use chainbet_domain::{ReplicaId, Round, RoundIndex, RoundPhase};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// One spinner line per replica showing its current round and phase
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<BTreeMap<ReplicaId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(BTreeMap::new()),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn with_bar(&self, replica: ReplicaId, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = bars.entry(replica).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(Self::spinner_style());
            bar.set_prefix(replica.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        f(bar);
    }

    /// Stop every spinner, leaving the last message on screen
    pub fn finish(&self) {
        if let Ok(bars) = self.bars.lock() {
            for bar in bars.values() {
                bar.finish();
            }
        }
    }

    fn phase_display_name(phase: RoundPhase) -> &'static str {
        match phase {
            RoundPhase::CollectFacts => "collecting holder counts",
            RoundPhase::FactsAgreed => "facts agreed",
            RoundPhase::Decide => "deciding",
            RoundPhase::BuildTx => "building transaction",
            RoundPhase::CollectSignatures => "collecting signatures",
            RoundPhase::SignaturesAgreed => "signatures agreed",
            RoundPhase::Submit => "submitting",
            RoundPhase::Confirmed => "confirmed",
            RoundPhase::Failed => "failed",
        }
    }

    fn completion_message(round: &Round) -> String {
        match round.failure() {
            Some(failure) => format!(
                "{} round {} {} in {}",
                "x".red(),
                round.index(),
                failure.kind.as_str().red(),
                failure.phase
            ),
            None => format!("{} round {} {}", "v".green(), round.index(), "confirmed".green()),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundProgressNotifier for ProgressReporter {
    fn on_round_start(&self, replica: ReplicaId, round: RoundIndex) {
        self.with_bar(replica, |bar| bar.set_message(format!("round {} starting...", round)));
    }

    fn on_phase(&self, replica: ReplicaId, round: RoundIndex, phase: RoundPhase) {
        self.with_bar(replica, |bar| {
            bar.set_message(format!("round {} {}", round, Self::phase_display_name(phase)))
        });
    }

    fn on_round_complete(&self, replica: ReplicaId, round: &Round) {
        let message = Self::completion_message(round);
        self.with_bar(replica, |bar| bar.set_message(message));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl RoundProgressNotifier for SimpleProgress {
    fn on_round_start(&self, replica: ReplicaId, round: RoundIndex) {
        println!("{} {} round {}", "->".cyan(), replica.to_string().bold(), round);
    }

    fn on_phase(&self, _replica: ReplicaId, _round: RoundIndex, _phase: RoundPhase) {}

    fn on_round_complete(&self, replica: ReplicaId, round: &Round) {
        println!(
            "  {} {}",
            replica,
            ProgressReporter::completion_message(round)
        );
    }
}

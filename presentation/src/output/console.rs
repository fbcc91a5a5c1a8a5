//! Console output formatter for replica reports

use chainbet_application::ReplicaReport;
use chainbet_domain::{Decision, Round, RoundIndex, RoundOutcome, TxHash};
use colored::Colorize;
use std::collections::{BTreeMap, BTreeSet};

/// Formats replica reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Every round of every replica
    pub fn format(reports: &[ReplicaReport]) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Chainbet Quorum Rounds"));
        output.push('\n');

        for report in reports {
            output.push_str(&Self::section_header(&report.replica.to_string()));
            if report.rounds.is_empty() {
                output.push_str(&format!("  {}\n", "no rounds run".dimmed()));
            }
            for round in &report.rounds {
                output.push_str(&Self::round_line(round));
                if let Some(decision) = round.decision() {
                    output.push_str(&format!("      {}\n", Self::decision_line(decision)));
                }
            }
            if let Some(halted) = &report.halted {
                output.push_str(&format!(
                    "  {} {}\n",
                    "Halted:".red().bold(),
                    halted
                ));
            }
        }

        output.push_str(&Self::divergence_section(reports));
        output.push_str(&Self::footer());
        output
    }

    /// One line per replica
    pub fn format_summary(reports: &[ReplicaReport]) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{}\n\n",
            "=== Chainbet Quorum Summary ===".cyan().bold()
        ));

        for report in reports {
            let last = report
                .rounds
                .last()
                .and_then(|r| r.decision())
                .map(Self::decision_line)
                .unwrap_or_else(|| "-".to_string());
            let failed = report.failed();
            let failed = if failed > 0 {
                format!("{} failed", failed).red().to_string()
            } else {
                "0 failed".dimmed().to_string()
            };
            output.push_str(&format!(
                "{:<12} {} confirmed, {}  {}\n",
                report.replica.to_string().bold(),
                report.confirmed().to_string().green(),
                failed,
                last
            ));
            if let Some(halted) = &report.halted {
                output.push_str(&format!("             {} {}\n", "halted:".red(), halted));
            }
        }

        output.push_str(&Self::divergence_section(reports));
        output
    }

    /// Format as JSON
    pub fn format_json(reports: &[ReplicaReport]) -> String {
        serde_json::to_string_pretty(reports).unwrap_or_else(|_| "[]".to_string())
    }

    fn round_line(round: &Round) -> String {
        let index = format!("round {}", round.index());
        match (round.outcome(), round.failure()) {
            (Some(RoundOutcome::Settled { receipt }), _) => format!(
                "  {} {:<10} {} {} nonce {}{}\n",
                "v".green(),
                index,
                "settled".green(),
                receipt.tx_hash.short(),
                receipt.nonce,
                receipt
                    .final_block
                    .map(|b| format!(" block {}", b))
                    .unwrap_or_default()
            ),
            (Some(RoundOutcome::NoAction { reason }), _) => format!(
                "  {} {:<10} {} ({})\n",
                "v".green(),
                index,
                "no action".yellow(),
                reason
            ),
            (None, Some(failure)) => format!(
                "  {} {:<10} {} in {}: {}\n",
                "x".red(),
                index,
                failure.kind.as_str().red(),
                failure.phase,
                failure.message
            ),
            (None, None) => format!("  {} {:<10} {}\n", "?".dimmed(), index, round.phase()),
        }
    }

    fn decision_line(decision: &Decision) -> String {
        let winner = decision
            .winning_chain
            .map(|c| c.to_string())
            .unwrap_or_else(|| "tie".to_string());
        let mut line = format!(
            "winner {} by {} holders, {}",
            winner, decision.holder_difference, decision.verdict
        );
        if let Some(bet) = decision.bet_id {
            line.push_str(&format!(" (bet {})", bet));
        }
        if decision.pays_out() {
            line.push_str(&format!(", prize {}", decision.prize_amount));
        }
        line
    }

    /// Rounds where replicas settled different transactions
    pub fn divergent_rounds(reports: &[ReplicaReport]) -> Vec<RoundIndex> {
        let mut settled: BTreeMap<RoundIndex, BTreeSet<TxHash>> = BTreeMap::new();
        for report in reports {
            for round in &report.rounds {
                if let Some(receipt) = round.outcome().and_then(|o| o.receipt()) {
                    settled.entry(round.index()).or_default().insert(receipt.tx_hash);
                }
            }
        }
        settled
            .into_iter()
            .filter(|(_, hashes)| hashes.len() > 1)
            .map(|(index, _)| index)
            .collect()
    }

    fn divergence_section(reports: &[ReplicaReport]) -> String {
        let divergent = Self::divergent_rounds(reports);
        if divergent.is_empty() {
            format!("\n{}\n", "Settlements agree across replicas".green())
        } else {
            let rounds: Vec<String> = divergent.iter().map(|r| r.to_string()).collect();
            format!(
                "\n{} {}\n",
                "Replicas settled different transactions in rounds:".red().bold(),
                rounds.join(", ")
            )
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{RoundRecord, RunOutcome, RunReport, TrajectoryTrend, Verdict};

/// Format a RunReport for human-readable terminal output.
pub fn format_report(report: &RunReport) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("leakprobe\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    let scheduled = report.config.terminal_round() + 1;
    match report.outcome {
        RunOutcome::Completed => {
            output.push_str(&format!("  Rounds: {} of {}\n", report.rounds.len(), scheduled));
        }
        RunOutcome::CollapsedEarly { round } => {
            output.push_str(&format!(
                "  Rounds: {} of {} ({})\n",
                report.rounds.len(),
                scheduled,
                format!("collapsed at round {}", round).yellow()
            ));
        }
    }
    output.push_str(&format!(
        "  Budget: {} samples per round\n",
        report.config.sample_budget
    ));
    if let Some(last) = report.rounds.last() {
        output.push_str(&format!(
            "  Final population: {} rows, {} identities\n",
            last.population, last.distinct_identities
        ));
    }
    output.push('\n');

    output.push_str(&format!("  {}\n\n", format_verdict(report.final_verdict())));

    if let Some(test) = report
        .rounds
        .iter()
        .rev()
        .find_map(|record| record.distinguishability.as_ref())
    {
        if let (Some(observed), Some(threshold)) = (test.observed_mmd, test.threshold) {
            output.push_str(&format!("    Observed MMD:   {:.6}\n", observed));
            output.push_str(&format!(
                "    Null threshold: {:.6} (significance {})\n",
                threshold, test.significance
            ));
        }
        if let (Some((a, b)), Some((na, nb))) = (test.cluster_pair, test.population_sizes) {
            output.push_str(&format!(
                "    Cluster pair:   {} vs {} ({} + {} rows)\n",
                a, b, na, nb
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "  Agreement trajectory: {} (slope {:+.4})\n",
        format_trend(report.trajectory.trend),
        report.trajectory.slope
    ));
    for point in &report.trajectory.points {
        output.push_str(&format!(
            "    round {:>2}: rand {:.4}, adjusted {:.4}\n",
            point.round, point.rand_index, point.adjusted_rand_index
        ));
    }
    output.push('\n');

    output.push_str(&sep);
    output.push('\n');
    output.push_str(
        "Note: The verdict describes the final round's clusters; it does not gate control flow.\n",
    );

    output
}

/// One-line progress summary for a finished round.
pub fn format_round(record: &RoundRecord) -> String {
    let mut line = format!(
        "round {:>2}: {} rows, {} clusters",
        record.round,
        record.population,
        record.partition.clusters()
    );
    if record.partition.noise > 0 {
        line.push_str(&format!(" (+{} noise)", record.partition.noise));
    }
    if let Some(quality) = record.partition.quality {
        line.push_str(&format!(", silhouette {:.2}", quality));
    }
    if let Some(agreement) = &record.agreement {
        line.push_str(&format!(", adjusted rand {:.2}", agreement.adjusted_rand_index));
    }
    if let Some(test) = &record.distinguishability {
        line.push_str(&format!(", {}", test.verdict));
    }
    line
}

/// Format a Verdict for display.
fn format_verdict(verdict: Verdict) -> String {
    match verdict {
        Verdict::Different => "\u{26A0} Distributions are different".yellow().bold().to_string(),
        Verdict::Similar => "\u{2713} Distributions are similar".green().bold().to_string(),
        Verdict::CannotTest => "\u{26A0} Cannot test: fewer than two clusters survived"
            .yellow()
            .to_string(),
    }
}

/// Format a TrajectoryTrend for display.
fn format_trend(trend: TrajectoryTrend) -> String {
    match trend {
        TrajectoryTrend::Rising => "rising".green().to_string(),
        TrajectoryTrend::Flat => "flat".normal().to_string(),
        TrajectoryTrend::Degrading => "degrading".red().to_string(),
    }
}

//! Output formatting for CLI responses.

use anyhow::Error;
use colored::Colorize;
use folio_activity::{Activity, FetchOutcome};
use folio_perf::{AlertSeverity, QualityTier};
use folio_telemetry::SimulationSummary;
use serde::Serialize;
use serde_json::json;

fn print_json<T: Serialize>(value: &T, what: &str) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format {what} as JSON: {e}"),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    print_json(
        &json!({
            "success": false,
            "error": {
                "message": error.to_string(),
                "causes": chain,
            }
        }),
        "error",
    );
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
}

fn tier_label(tier: QualityTier) -> colored::ColoredString {
    match tier {
        QualityTier::High => tier.as_str().green(),
        QualityTier::Medium => tier.as_str().yellow(),
        QualityTier::Low => tier.as_str().red(),
    }
}

fn severity_label(severity: AlertSeverity) -> colored::ColoredString {
    match severity {
        AlertSeverity::Low => severity.as_str().dimmed(),
        AlertSeverity::Medium => severity.as_str().yellow(),
        AlertSeverity::High => severity.as_str().red().bold(),
    }
}

/// Print a simulation run
pub fn print_simulation(summary: &SimulationSummary, json: bool) {
    if json {
        print_json(&json!({ "success": true, "simulation": summary }), "simulation");
        return;
    }

    println!(
        "{} {:?} profile, {} frames, {} snapshots",
        "Simulation:".bold(),
        summary.profile,
        summary.frames,
        summary.snapshots
    );

    if summary.tier_changes.is_empty() {
        println!("{}", "No quality tier changes".dimmed());
    } else {
        println!("{}", "Tier changes:".bold());
        for change in &summary.tier_changes {
            println!(
                "  {:>8} ms  {} -> {}  (mean {:.1} fps)",
                change.changed_at_ms,
                tier_label(change.from),
                tier_label(change.to),
                change.mean_fps
            );
        }
    }

    if summary.alerts.is_empty() {
        println!("{}", "No alerts".dimmed());
    } else {
        println!("{}", "Alerts:".bold());
        for alert in &summary.alerts {
            println!(
                "  {:>8} ms  [{}] {}",
                alert.fired_at_ms(),
                severity_label(alert.severity()),
                alert.message()
            );
        }
    }

    println!("{}", "Report:".bold());
    for line in summary.report.to_string().lines() {
        println!("  {line}");
    }
}

/// Print the activity feed
pub fn print_activities(outcome: &FetchOutcome<Vec<Activity>>, json: bool) {
    if json {
        print_json(
            &json!({ "success": outcome.is_success(), "activity": outcome }),
            "activity feed",
        );
        return;
    }

    if let Some(reason) = &outcome.error {
        eprintln!(
            "{} {} (after {} attempts)",
            "Activity feed unavailable:".red().bold(),
            reason,
            outcome.attempts
        );
        return;
    }
    if outcome.data.is_empty() {
        println!("{}", "No recent activity".yellow());
        return;
    }

    println!("{}", "Recent Activity:".bold());
    for activity in &outcome.data {
        println!(
            "  {} {} {} {}",
            activity.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            activity.kind.cyan(),
            activity.project_name.as_deref().unwrap_or("-").bold(),
            activity.description
        );
    }
}

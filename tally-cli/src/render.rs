//! Terminal rendering
//!
//! Status colors, progress lines and the notification bridge that turns
//! controller notices into terminal output.

use colored::*;
use tally_core::domain::job::{JobHandle, JobStatus, StatusSnapshot};
use tally_core::domain::log::ParsingLog;
use tally_sync::{JobUpdate, NotificationBridge, TransitionEvent};

/// Prints status changes and retire notices as they happen
pub struct TerminalBridge;

impl NotificationBridge for TerminalBridge {
    fn transition(&self, event: &TransitionEvent) {
        let arrow = match event.to {
            JobStatus::Completed => "✓".green(),
            JobStatus::Failed => "✗".red(),
            JobStatus::Cancelled => "■".dimmed(),
            _ => "▸".cyan(),
        };

        println!(
            "{} Job {} is now {}",
            arrow,
            event.job_id().to_string().cyan(),
            colorize_status(event.to)
        );

        if let Some(message) = &event.snapshot.message {
            if event.is_terminal() {
                println!("  {}", message.dimmed());
            }
        }
    }

    fn retired(&self, previous: &JobHandle, replacement: &JobHandle) {
        println!(
            "{} Stopped following job {} ({}); it keeps running on the server. Now following job {}.",
            "⚠".yellow(),
            previous.job_id.to_string().cyan(),
            previous.origin,
            replacement.job_id.to_string().cyan()
        );
    }
}

/// One line per update that did not change the status
pub fn print_progress(update: &JobUpdate) {
    let snapshot = &update.snapshot;
    let mut line = format!("  [{:>3}%]", update.progress);

    if let (Some(current), Some(total)) = (snapshot.current, snapshot.total) {
        line.push_str(&format!(" {}/{}", current, total));
    }
    line.push_str(&format!(
        " processed={} added={} updated={} failed={}",
        snapshot.processed, snapshot.added, snapshot.updated, snapshot.failed
    ));

    match &snapshot.task {
        Some(task) => println!("{} {}", line.dimmed(), task),
        None => println!("{}", line.dimmed()),
    }
}

/// Print detailed status information
pub fn print_snapshot_details(snapshot: &StatusSnapshot) {
    println!("{}", "Job Status:".bold());
    println!("  ID:        {}", snapshot.job_id.to_string().cyan());
    println!("  Status:    {}", colorize_status(snapshot.status));
    println!("  Progress:  {}%", snapshot.derived_progress());
    println!("  Processed: {}", snapshot.processed);
    println!("  Added:     {}", snapshot.added);
    println!("  Updated:   {}", snapshot.updated);
    println!("  Failed:    {}", snapshot.failed);

    if let Some(started) = snapshot.started_at {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(ended) = snapshot.ended_at {
        println!("  Ended:     {}", ended.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(elapsed) = snapshot.elapsed() {
        println!("  Duration:  {:.0}s", elapsed);
    }
    if let Some(message) = &snapshot.message {
        println!("\n{}", "Message:".bold());
        println!("{}", message);
    }
    if !snapshot.errors.is_empty() {
        println!("\n{}", "Errors:".bold());
        for error in &snapshot.errors {
            println!("  {}", error.red());
        }
    }
}

/// Print a parsing log entry as a summary
pub fn print_log_summary(log: &ParsingLog) {
    let source = log
        .source
        .as_ref()
        .map(|source| source.name.clone())
        .unwrap_or_else(|| format!("source {}", log.source_id));

    println!("  {} Job {} ({})", "▸".cyan(), log.id.to_string().dimmed(), source);
    println!("    Status:  {}", colorize_status(log.status));
    println!(
        "    Items:   {} processed, {} added, {} updated, {} failed",
        log.items_processed, log.items_added, log.items_updated, log.items_failed
    );
    if let Some(started) = log.start_time {
        println!(
            "    Started: {}",
            started.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Colorize job status for display
pub fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Starting => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Cancelled => status_str.dimmed(),
        JobStatus::Unknown => status_str.normal(),
    }
}

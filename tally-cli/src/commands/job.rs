//! Job command handlers
//!
//! Launching, attaching and following jobs go through the controller so the
//! terminal sees the same status flow as the console. One-shot queries use
//! the HTTP client directly.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use colored::*;
use tally_client::BackendClient;
use tally_core::domain::descriptor::JobDescriptor;
use tally_core::domain::job::{JobHandle, JobId, SpecialImport};
use tally_sync::{CancelError, JobController, SyncConfig};

use crate::render::{TerminalBridge, print_log_summary, print_progress, print_snapshot_details};
use crate::types::OptionArg;

fn controller(config: &SyncConfig) -> JobController {
    let backend = Arc::new(BackendClient::new(&config.backend_url));
    JobController::new(backend, config.clone()).with_bridge(Arc::new(TerminalBridge))
}

/// Start a general parsing job
pub async fn start(
    config: &SyncConfig,
    source: i64,
    style: i64,
    mode: Option<String>,
    options: Vec<OptionArg>,
    detach: bool,
) -> Result<()> {
    let mut controller = controller(config);
    controller
        .refresh_catalog()
        .await
        .context("Failed to fetch sources, styles and modes")?;

    let mut descriptor = JobDescriptor::new(source, style);
    if let Some(mode) = mode {
        descriptor = descriptor.with_mode(mode);
    }
    for option in options {
        descriptor = descriptor.with_option(option.name, option.value);
    }

    let handle = controller
        .launch(descriptor)
        .await
        .context("Failed to start parsing job")?;
    print_started(&handle);

    if detach {
        return Ok(());
    }
    follow(&mut controller).await
}

/// Run one of the fixed imports
pub async fn special(config: &SyncConfig, import: SpecialImport, detach: bool) -> Result<()> {
    let mut controller = controller(config);
    let handle = controller
        .launch(import)
        .await
        .with_context(|| format!("Failed to start {}", import.label()))?;
    print_started(&handle);

    if detach {
        return Ok(());
    }
    follow(&mut controller).await
}

/// Follow a job started elsewhere
pub async fn attach(config: &SyncConfig, id: i64) -> Result<()> {
    let mut controller = controller(config);
    let handle = controller.attach(JobId(id))?;
    println!("{} Following job {}", "▸".cyan(), handle.job_id.to_string().cyan());

    follow(&mut controller).await
}

/// Show the current status of a job
pub async fn status(config: &SyncConfig, id: i64) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let snapshot = match client.parsing_status(JobId(id)).await {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_found() => bail!("No parsing job with id {}", id),
        Err(e) => return Err(e).with_context(|| format!("Failed to fetch status of job {}", id)),
    };

    print_snapshot_details(&snapshot);
    Ok(())
}

/// Ask the backend to stop a job
pub async fn stop(config: &SyncConfig, id: i64) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let ack = match client.stop_parsing(JobId(id)).await {
        Ok(ack) => ack,
        Err(e) if e.is_not_found() => bail!("No parsing job with id {}", id),
        Err(e) => return Err(e).with_context(|| format!("Failed to stop job {}", id)),
    };

    println!(
        "{} {}",
        "✓".green(),
        ack.message.unwrap_or_else(|| format!("Stop requested for job {}", id))
    );
    Ok(())
}

/// List recent parsing jobs
pub async fn logs(config: &SyncConfig, limit: u32) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let logs = client
        .parsing_logs(limit)
        .await
        .context("Failed to list parsing jobs")?;

    if logs.is_empty() {
        println!("{}", "No parsing jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", logs.len()).bold());
        println!();
        for log in &logs {
            print_log_summary(log);
        }
    }

    Ok(())
}

fn print_started(handle: &JobHandle) {
    println!(
        "{} Started job {} ({})",
        "✓".green(),
        handle.job_id.to_string().cyan(),
        handle.origin
    );
    if let Some(message) = &handle.message {
        println!("  {}", message.dimmed());
    }
}

/// Render updates until the job reaches a terminal status
///
/// Ctrl-C asks the backend to stop the job and keeps following until the
/// stop shows up in the status. Once the backend has answered a stop
/// request, the next Ctrl-C stops following. An unreachable backend leaves
/// the next Ctrl-C retrying the stop.
async fn follow(controller: &mut JobController) -> Result<()> {
    let mut cancel_requested = false;

    loop {
        tokio::select! {
            update = controller.next_update() => {
                let Some(update) = update else { break };
                if update.transition.is_none() {
                    print_progress(&update);
                }
                if update.is_terminal() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                if cancel_requested {
                    println!("{}", "Stopped following; the job may still be winding down.".yellow());
                    break;
                }

                match controller.cancel().await {
                    Ok(()) => {
                        cancel_requested = true;
                        println!("{}", "Stop requested, waiting for the job to wind down...".yellow());
                    }
                    Err(CancelError::NoActiveJob) => break,
                    Err(e) if e.is_retryable() => {
                        println!("{} {} (press Ctrl-C to try again)", "⚠".yellow(), e);
                    }
                    Err(e) => {
                        cancel_requested = true;
                        println!("{} {}", "⚠".yellow(), e);
                    }
                }
            }
        }
    }

    Ok(())
}

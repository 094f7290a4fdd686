//! Reference data command handlers

use anyhow::{Context, Result};
use colored::*;
use tally_client::BackendClient;
use tally_sync::SyncConfig;

/// List all parsing sources
pub async fn list_sources(config: &SyncConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let sources = client
        .list_sources()
        .await
        .context("Failed to list parsing sources")?;

    if sources.is_empty() {
        println!("{}", "No parsing sources found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} source(s):", sources.len()).bold());
    println!();
    for source in sources {
        let state = if source.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        println!("  {} {} {} [{}]", "▸".cyan(), source.id.to_string().cyan(), source.name, state);
        if !source.url.is_empty() {
            println!("    URL: {}", source.url.dimmed());
        }
        if let Some(description) = &source.description {
            println!("    {}", description);
        }
    }

    Ok(())
}

/// List all parsing styles
pub async fn list_styles(config: &SyncConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let styles = client
        .list_styles()
        .await
        .context("Failed to list parsing styles")?;

    if styles.is_empty() {
        println!("{}", "No parsing styles found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} style(s):", styles.len()).bold());
    println!();
    for style in styles {
        println!("  {} {} {}", "▸".cyan(), style.id.to_string().cyan(), style.name);
        println!(
            "    Images: {}  Deep details: {}",
            yes_no(style.include_images),
            yes_no(style.deep_details)
        );
        if let Some(description) = &style.description {
            println!("    {}", description);
        }
    }

    Ok(())
}

/// List parsing modes with their option schema
pub async fn list_modes(config: &SyncConfig) -> Result<()> {
    let client = BackendClient::new(&config.backend_url);
    let modes = client
        .list_modes()
        .await
        .context("Failed to list parsing modes")?;

    for mode in modes {
        let icon = mode.icon.as_deref().unwrap_or("▸");
        println!("{} {} ({})", icon, mode.name.bold(), mode.id.cyan());
        if !mode.description.is_empty() {
            println!("  {}", mode.description);
        }
        if let Some(estimate) = &mode.estimated_time {
            println!("  Estimated time: {}", estimate.dimmed());
        }

        for (name, spec) in &mode.params {
            let mut line = format!("  -o {}=<{}>", name, spec.kind);
            if let Some(default) = &spec.default {
                line.push_str(&format!(" default {}", default));
            }
            match (spec.min, spec.max) {
                (Some(min), Some(max)) => line.push_str(&format!(" range {}..={}", min, max)),
                (Some(min), None) => line.push_str(&format!(" min {}", min)),
                (None, Some(max)) => line.push_str(&format!(" max {}", max)),
                (None, None) => {}
            }
            println!("{}", line.cyan());
            if !spec.description.is_empty() {
                println!("      {}", spec.description.dimmed());
            }
        }
        println!();
    }

    Ok(())
}

fn yes_no(flag: bool) -> ColoredString {
    if flag { "yes".green() } else { "no".dimmed() }
}

//! Show replica status.

use anyhow::Result;

use crate::config::{self, Paths};
use sync_store::EventStore;

/// Run the status command.
pub async fn run(paths: &Paths) -> Result<()> {
    println!("=== replica status ===");
    println!();

    let config = match config::load(paths) {
        Ok(config) => config,
        Err(e) => {
            println!("Replica: NOT READY");
            println!("  {e}");
            return Ok(());
        }
    };

    let store = config::open_store(paths, &config).await?;
    let cached = store.count().await?;
    let latest = store.latest_timestamp().await?;

    println!("Replica:");
    println!(
        "  Database: {}",
        config.database_path(&paths.data_dir).display()
    );
    println!("  Cached:   {cached} events");
    match latest {
        Some(ts) => println!("  Latest:   {} ({})", ts, format_timestamp(ts)),
        None => println!("  Latest:   (empty)"),
    }

    println!();
    println!("Relays: {} configured", config.relays.urls.len());
    for url in &config.relays.urls {
        println!("  {url}");
    }
    println!("  Timeout: {}s per relay", config.relays.timeout_secs);

    println!();
    let window = config.sync_window();
    println!("Window:");
    println!("  Overlap:   {}s", window.overlap_secs());
    println!("  Bootstrap: {} days", window.bootstrap_secs() / 86400);
    let now = now();
    println!("  Next since: {}", window.since(latest, now));

    Ok(())
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Format a Unix timestamp relative to now.
fn format_timestamp(ts: u64) -> String {
    let now = now();
    if ts > now {
        return "in the future".to_string();
    }
    let diff = now - ts;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

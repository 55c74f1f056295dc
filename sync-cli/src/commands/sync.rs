//! Run one sync pass.

use anyhow::Result;
use std::sync::Arc;
use sync_client::Connector;

use crate::config::{self, Paths};

/// Run the sync command.
pub async fn run(paths: &Paths, connector: Arc<dyn Connector>) -> Result<()> {
    let coordinator = config::coordinator(paths, connector).await?;
    let relays = coordinator.settings().relays.len();

    println!("Syncing from {relays} relays...");
    let outcome = coordinator.request_sync().await?;

    println!();
    println!("  Fetched:  {} ({} unique)", outcome.fetched, outcome.unique);
    println!("  New:      {}", outcome.inserted);
    if outcome.rejected > 0 {
        println!("  Rejected: {}", outcome.rejected);
    }
    println!("  Cached:   {}", outcome.stored_count);

    if !outcome.warnings.is_empty() {
        println!();
        println!(
            "Warnings ({} of {relays} relays incomplete):",
            outcome.warnings.len()
        );
        for warning in &outcome.warnings {
            println!("  {}: {}", warning.relay, warning.reason);
        }
    }

    Ok(())
}

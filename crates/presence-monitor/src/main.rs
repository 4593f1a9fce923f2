//! Presence Monitor - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use presence_monitor::{init_logging, run, MonitorArgs};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = MonitorArgs::parse();
    init_logging(args.json_logs)?;

    info!("=== Presence Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let summary = run(&args, std::io::stdout()).await?;
    info!(
        ticks = summary.ticks,
        snapshots = summary.snapshots,
        skipped = summary.skipped_ticks,
        detection_failures = summary.detection_failures,
        "Replay finished"
    );

    if args.summary {
        let json = serde_json::to_string(&summary).context("failed to encode summary")?;
        println!("{}", json);
    }

    Ok(())
}

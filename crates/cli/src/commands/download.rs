//! `download` command implementation.

use anyhow::{Context, Result};
use dataset::{Downloader, HubClient};
use tracing::info;

use crate::args::DownloadArgs;

/// Execute the `download` command
pub async fn run_download(args: &DownloadArgs) -> Result<()> {
    let hub = HubClient::from_env().context("Failed to create Hugging Face client")?;
    let downloader = Downloader::new(hub).with_progress(!args.no_progress);

    let summary = downloader
        .run(args.size, &args.dir)
        .await
        .with_context(|| format!("Failed to download Bench2Drive ({})", args.size))?;

    info!(
        target_dir = %summary.target_dir.display(),
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        extracted = summary.extracted,
        "Dataset ready"
    );
    println!(
        "Bench2Drive-{} ready in {} ({} downloaded, {} already present, {} archives extracted)",
        args.size,
        summary.target_dir.display(),
        summary.downloaded,
        summary.skipped,
        summary.extracted
    );
    Ok(())
}

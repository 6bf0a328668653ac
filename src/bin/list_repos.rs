use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use slack_notify::config::DEFAULT_GITHUB_API_URL;
use slack_notify::github::GithubClient;
use slack_notify::migration::report;
use slack_notify::migration::rollout::USAGE_COLUMNS;
use slack_notify::migration::scan_org;
use slack_notify::retry::TokioSleeper;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "List workflows in an organization that use a given action and write a CSV report"
)]
struct Args {
    /// Organization to scan
    #[arg(long)]
    org: String,

    /// Action reference to look for inside workflow files
    #[arg(long, default_value = "SonarSource/gh-action_build-notify")]
    action: String,

    /// Report file to write
    #[arg(long, default_value = "migration_report.csv")]
    output: PathBuf,

    /// Pause between workflow file reads, in milliseconds
    #[arg(long, default_value = "1000")]
    pause_ms: u64,

    /// GitHub API base URL
    #[arg(long, default_value = DEFAULT_GITHUB_API_URL)]
    api_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    slack_notify::init_tracing();

    let args = Args::parse();
    let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;
    let client = GithubClient::new(token, &args.api_url)?;

    let usages = scan_org(
        &client,
        &TokioSleeper,
        &args.org,
        &args.action,
        Duration::from_millis(args.pause_ms),
    )
    .await?;

    let rows: Vec<Vec<String>> = usages.iter().map(|u| u.to_row()).collect();
    tokio::fs::write(&args.output, report::render(&USAGE_COLUMNS, &rows))
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(rows = rows.len(), path = %args.output.display(), "report written");
    Ok(())
}

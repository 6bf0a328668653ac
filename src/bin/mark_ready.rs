use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use slack_notify::config::DEFAULT_GITHUB_API_URL;
use slack_notify::github::GithubClient;
use slack_notify::migration::{mark_ready, report};

#[derive(Debug, Parser)]
#[command(author, version, about = "Mark rollout pull requests as ready for review")]
struct Args {
    /// CSV with repository and pr_url columns
    #[arg(long, default_value = "pr_report.csv")]
    input: PathBuf,

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

    let text = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let rows = report::parse(&text)?;

    let mut failures = 0;
    for row in &rows {
        let (repo, pr_url) = match (row.require("repository"), row.require("pr_url")) {
            (Ok(repo), Ok(url)) => (repo, url),
            (r, u) => {
                warn!(err = ?r.err().or(u.err()), "skipping incomplete row");
                continue;
            }
        };
        if let Err(err) = mark_ready(&client, repo, pr_url).await {
            failures += 1;
            error!(repository = repo, pr_url, "failed to mark ready: {err:#}");
        }
    }
    info!(rows = rows.len(), failures, "finished");
    Ok(())
}

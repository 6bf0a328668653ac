use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use slack_notify::config::DEFAULT_GITHUB_API_URL;
use slack_notify::github::GithubClient;
use slack_notify::migration::{report, roll_out};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Open pull requests that install the Slack notification workflow"
)]
struct Args {
    /// CSV with repository, workflow and slack_channel columns
    #[arg(long, default_value = "migration_report.csv")]
    input: PathBuf,

    /// Action reference the workflow should use
    #[arg(long, default_value = "SonarSource/gh-action_slack-notify@v1")]
    action_ref: String,

    /// Branch holding the change
    #[arg(long, default_value = "migration-branch")]
    branch: String,

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

    let mut opened = 0;
    for row in &rows {
        let fields = (
            row.require("repository"),
            row.require("workflow"),
            row.require("slack_channel"),
        );
        let (repo, workflow, channel) = match fields {
            (Ok(r), Ok(w), Ok(c)) => (r, w, c),
            (r, w, c) => {
                let err = r.err().or(w.err()).or(c.err());
                warn!(?err, "skipping incomplete row");
                continue;
            }
        };
        match roll_out(&client, repo, workflow, channel, &args.action_ref, &args.branch).await {
            Ok(result) => {
                opened += 1;
                info!(repository = repo, url = %result.pull.html_url, change = ?result.change, "rolled out");
            }
            Err(err) => error!(repository = repo, "rollout failed: {err:#}"),
        }
    }
    info!(rows = rows.len(), opened, "rollout finished");
    Ok(())
}

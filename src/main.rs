use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use slack_notify::config;
use slack_notify::github::GithubClient;
use slack_notify::pipeline::{exit_code, Pipeline, Settings};
use slack_notify::retry::TokioSleeper;
use slack_notify::slack::SlackClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Post failed check runs of a check suite to a Slack channel"
)]
struct Args {
    /// YAML config file; the environment is used when omitted
    #[arg(long)]
    config: Option<PathBuf>,
}

async fn run(args: Args) -> Result<i32> {
    let cfg = match &args.config {
        Some(path) => config::load(path),
        None => config::from_env(),
    }
    .context("invalid configuration")?;

    let github = GithubClient::new(cfg.github.token.clone(), &cfg.github.api_url)?;
    let slack = SlackClient::new(cfg.slack.token.clone(), &cfg.slack.api_url)?;
    let sleeper = TokioSleeper;

    info!(
        repository = %cfg.invocation.repository,
        check_suite_id = cfg.invocation.check_suite_id,
        "retrieving failed check runs"
    );
    let mut pipeline = Pipeline::new(&github, &slack, &sleeper, Settings::from(&cfg));
    let res = pipeline.run().await;
    match &res {
        Ok(outcome) => info!(
            failed_runs = outcome.attachments.len(),
            delivered = outcome.delivered,
            "done"
        ),
        Err(err) => error!(state = ?pipeline.state(), "notification failed: {err:#}"),
    }
    Ok(exit_code(&res))
}

#[tokio::main]
async fn main() -> ExitCode {
    slack_notify::init_tracing();

    let args = Args::parse();
    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!("startup failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

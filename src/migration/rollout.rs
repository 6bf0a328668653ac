use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::workflow::{
    first_non_comment_line, parse_pull_number, render_workflow, workflow_path, CODEOWNERS_PATH,
    WORKFLOWS_DIR,
};
use crate::github::model::PullRequest;
use crate::github::RepoHost;
use crate::retry::Sleeper;

/// A workflow file that references the action being migrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowUsage {
    pub repository: String,
    pub workflow: String,
    pub codeowners: Option<String>,
}

impl WorkflowUsage {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.repository.clone(),
            self.workflow.clone(),
            self.codeowners.clone().unwrap_or_default(),
        ]
    }
}

pub const USAGE_COLUMNS: [&str; 3] = ["repository", "workflow", "codeowners"];

/// Find every workflow in `org` that mentions `action`. Repositories that fail
/// to scan are logged and skipped.
#[instrument(skip(host, sleeper))]
pub async fn scan_org(
    host: &dyn RepoHost,
    sleeper: &dyn Sleeper,
    org: &str,
    action: &str,
    pause: Duration,
) -> Result<Vec<WorkflowUsage>> {
    let repos = host
        .list_org_repos(org)
        .await
        .with_context(|| format!("failed to list repositories of {org}"))?;

    let mut usages = Vec::new();
    for repo in repos.iter().filter(|r| !r.archived) {
        match scan_repo(host, sleeper, &repo.full_name, action, pause).await {
            Ok(found) => usages.extend(found),
            Err(err) => warn!(?err, repository = %repo.full_name, "failed to scan repository"),
        }
    }
    info!(repositories = repos.len(), matches = usages.len(), "organization scan finished");
    Ok(usages)
}

async fn scan_repo(
    host: &dyn RepoHost,
    sleeper: &dyn Sleeper,
    repo: &str,
    action: &str,
    pause: Duration,
) -> Result<Vec<WorkflowUsage>> {
    let Some(entries) = host.list_dir(repo, WORKFLOWS_DIR).await? else {
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    let mut codeowners: Option<Option<String>> = None;
    for entry in entries {
        if entry.typ != "file" {
            info!(repository = repo, item = %entry.name, "skipping non-file item");
            continue;
        }
        let file = match host.get_file(repo, &entry.path, None).await {
            Ok(Some(file)) => file,
            Ok(None) => continue,
            Err(err) => {
                warn!(?err, repository = repo, workflow = %entry.name, "failed to read workflow");
                continue;
            }
        };
        if file.text.contains(action) {
            if codeowners.is_none() {
                let owners = match host.get_file(repo, CODEOWNERS_PATH, None).await {
                    Ok(Some(f)) => first_non_comment_line(&f.text),
                    _ => None,
                };
                codeowners = Some(owners);
            }
            info!(repository = repo, workflow = %entry.name, "found action usage");
            found.push(WorkflowUsage {
                repository: repo.to_string(),
                workflow: entry.name.clone(),
                codeowners: codeowners.clone().flatten(),
            });
        }
        if !pause.is_zero() {
            sleeper.sleep(pause).await;
        }
    }
    Ok(found)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutResult {
    pub change: FileChange,
    pub pull: PullRequest,
}

/// Put the notification workflow on `branch` of `repo` and open a pull request.
#[instrument(skip(host, action_ref))]
pub async fn roll_out(
    host: &dyn RepoHost,
    repo: &str,
    workflow_file: &str,
    slack_channel: &str,
    action_ref: &str,
    branch: &str,
) -> Result<RolloutResult> {
    let path = workflow_path(workflow_file);
    let content =
        render_workflow(action_ref, slack_channel).context("failed to render workflow")?;

    let info = host.get_repo(repo).await?;
    let base_sha = host.branch_head(repo, &info.default_branch).await?;
    if !host.create_branch(repo, branch, &base_sha).await? {
        info!(branch, "reusing existing branch");
    }

    let existing = host.get_file(repo, &path, Some(branch)).await?;
    let change = match existing {
        Some(file) => {
            host.put_file(
                repo,
                &path,
                branch,
                "Update workflow with new Slack notification action",
                &content,
                Some(&file.sha),
            )
            .await?;
            FileChange::Updated
        }
        None => {
            host.put_file(
                repo,
                &path,
                branch,
                "Create workflow with new Slack notification action",
                &content,
                None,
            )
            .await?;
            FileChange::Created
        }
    };
    info!(?change, path = %path, "workflow file written");

    let pull = host
        .create_pull(
            repo,
            &format!("Update Slack notification in {path}"),
            &format!("This PR updates the Slack notification action in {path}."),
            branch,
            &info.default_branch,
        )
        .await
        .context("failed to create pull request")?;
    info!(url = %pull.html_url, "created pull request");
    Ok(RolloutResult { change, pull })
}

/// Take the pull request at `pr_url` out of draft.
#[instrument(skip(host))]
pub async fn mark_ready(host: &dyn RepoHost, repo: &str, pr_url: &str) -> Result<()> {
    let number =
        parse_pull_number(pr_url).ok_or_else(|| anyhow!("no pull request number in {pr_url:?}"))?;
    let pull = host.get_pull(repo, number).await?;
    if !pull.draft {
        info!(number, "pull request is already ready for review");
        return Ok(());
    }
    host.mark_ready_for_review(&pull).await?;
    info!(number, "marked pull request ready for review");
    Ok(())
}

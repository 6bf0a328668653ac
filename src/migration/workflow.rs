//! The notification workflow file and small helpers for repository scans.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const WORKFLOWS_DIR: &str = ".github/workflows";
pub const CODEOWNERS_PATH: &str = ".github/CODEOWNERS";
pub const WEBHOOK_SECRET_EXPR: &str = "${{ secrets.SLACK_WEBHOOK }}";

static PULL_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/pulls?/(\d+)/?(?:[?#].*)?$").expect("valid pull URL regex"));

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workflow {
    pub name: String,
    pub on: Triggers,
    pub jobs: BTreeMap<String, Job>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Triggers {
    pub check_suite: ActivityTypes,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityTypes {
    pub types: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    #[serde(rename = "runs-on")]
    pub runs_on: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub uses: String,
    pub with: BTreeMap<String, String>,
}

/// Workflow that notifies `slack_channel` whenever a check suite completes.
pub fn notification_workflow(action_ref: &str, slack_channel: &str) -> Workflow {
    let with = BTreeMap::from([
        ("slackChannel".to_string(), slack_channel.to_string()),
        (
            "slack_webhook_secret".to_string(),
            WEBHOOK_SECRET_EXPR.to_string(),
        ),
    ]);
    Workflow {
        name: "Slack Notifications".into(),
        on: Triggers {
            check_suite: ActivityTypes {
                types: vec!["completed".into()],
            },
        },
        jobs: BTreeMap::from([(
            "notify".to_string(),
            Job {
                runs_on: "ubuntu-latest".into(),
                steps: vec![Step {
                    name: "Send Slack Notification".into(),
                    uses: action_ref.to_string(),
                    with,
                }],
            },
        )]),
    }
}

pub fn render_workflow(action_ref: &str, slack_channel: &str) -> Result<String, serde_yaml::Error> {
    let body = serde_yaml::to_string(&notification_workflow(action_ref, slack_channel))?;
    Ok(format!("---\n{body}"))
}

pub fn workflow_path(file_name: &str) -> String {
    format!("{WORKFLOWS_DIR}/{}", file_name.trim_start_matches('/'))
}

/// First line of a CODEOWNERS file that is neither blank nor a comment.
pub fn first_non_comment_line(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
}

/// Pull request number from its web URL, e.g. `https://github.com/o/r/pull/12`.
pub fn parse_pull_number(url: &str) -> Option<u64> {
    PULL_URL
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

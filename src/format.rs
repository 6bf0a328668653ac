//! Slack attachment payloads for failed check runs.
use serde::{Deserialize, Serialize};

use crate::model::CheckRun;

/// Summary line sent alongside the attachments.
pub const SUMMARY_TEXT: &str = "CI checks failed";

const FAILURE_COLOR: &str = "danger";

/// One attachment per failed check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    Context { elements: Vec<ContextElement> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    Image { image_url: String, alt_text: String },
    Mrkdwn { text: String },
}

fn mrkdwn_section(text: String) -> Block {
    Block::Section {
        text: TextObject::Mrkdwn { text },
    }
}

/// Slack mention markup; an unresolved user renders as an empty reference.
pub fn mention(chat_user_id: Option<&str>) -> String {
    format!("<@{}>", chat_user_id.unwrap_or_default())
}

pub fn build_attachment(run: &CheckRun, repository: &str, chat_user_id: Option<&str>) -> Attachment {
    let header = format!(
        "*{}* - <{}|{}> {} in *{}*",
        run.app_name,
        run.details_url,
        run.name,
        run.conclusion.as_str(),
        repository
    );
    let detail = format!(
        "Branch: *{}*\nCommit: *{}*\nActor: {}",
        run.head_branch,
        run.head_sha,
        mention(chat_user_id)
    );
    let footer = Block::Context {
        elements: vec![
            ContextElement::Image {
                image_url: run.app_icon_url.clone(),
                alt_text: "Icon".into(),
            },
            ContextElement::Mrkdwn {
                text: format!("<{}|View more details>", run.details_url),
            },
        ],
    };

    Attachment {
        color: FAILURE_COLOR.into(),
        blocks: vec![mrkdwn_section(header), mrkdwn_section(detail), footer],
    }
}

/// One attachment per run, in input order.
pub fn build_attachments(
    failed_runs: &[CheckRun],
    repository: &str,
    chat_user_id: Option<&str>,
) -> Vec<Attachment> {
    let chat_user_id = chat_user_id.filter(|id| !id.is_empty());
    failed_runs
        .iter()
        .map(|run| build_attachment(run, repository, chat_user_id))
        .collect()
}

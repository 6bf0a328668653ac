//! Slack Web API client: user directory and message posting.
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::error::{parse_retry_after, ApiError};
use crate::format::Attachment;
use crate::github::parse_base_url;
use crate::model::ChatUser;

const USERS_PAGE_LIMIT: u32 = 200;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The full workspace directory.
    async fn list_users(&self) -> Result<Vec<ChatUser>, ApiError>;

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Debug)]
struct PostMessageReq<'a> {
    channel: &'a str,
    text: &'a str,
    attachments: &'a [Attachment],
}

#[derive(Deserialize, Debug)]
struct SlackResp {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UsersListResp {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<ChatUser>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize, Debug)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

impl SlackClient {
    pub fn new(token: String, base_url: &str) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .user_agent(concat!("slack-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, method: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(method)
            .map_err(|e| ApiError::Config(format!("invalid Slack method {method:?}: {e}")))
    }

    pub fn build_post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<reqwest::Request, ApiError> {
        let body = PostMessageReq {
            channel,
            text,
            attachments,
        };
        Ok(self
            .http
            .post(self.endpoint("chat.postMessage")?)
            .bearer_auth(&self.token)
            .json(&body)
            .build()?)
    }
}

/// Slack reports most failures as HTTP 200 with `ok: false`.
async fn read_slack<T: for<'de> Deserialize<'de>>(res: Response, method: &str) -> Result<T, ApiError> {
    let status = res.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = parse_retry_after(res.headers());
        warn!(method, retry_after_secs, "rate limited by Slack");
        return Err(ApiError::RateLimited { retry_after_secs });
    }
    let body = res.text().await?;
    if !status.is_success() {
        warn!(method, status = status.as_u16(), body = %body, "Slack HTTP error");
        return Err(ApiError::Api {
            service: "slack",
            status: status.as_u16(),
            message: body,
        });
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{method}: {e}")))
}

fn slack_failure(status: u16, error: Option<String>) -> ApiError {
    ApiError::Api {
        service: "slack",
        status,
        message: error.unwrap_or_else(|| "unknown_error".into()),
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<ChatUser>, ApiError> {
        let mut users = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut url = self.endpoint("users.list")?;
            url.query_pairs_mut()
                .append_pair("limit", &USERS_PAGE_LIMIT.to_string());
            if !cursor.is_empty() {
                url.query_pairs_mut().append_pair("cursor", &cursor);
            }
            let res = self.http.get(url).bearer_auth(&self.token).send().await?;
            let status = res.status().as_u16();
            let page: UsersListResp = read_slack(res, "users.list").await?;
            if !page.ok {
                return Err(slack_failure(status, page.error));
            }
            users.extend(page.members);
            cursor = page
                .response_metadata
                .map(|m| m.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                break;
            }
        }
        debug!(count = users.len(), "listed Slack users");
        Ok(users)
    }

    #[instrument(skip(self, text, attachments), fields(attachment_count = attachments.len()))]
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<(), ApiError> {
        let request = self.build_post_message(channel, text, attachments)?;
        let res = self.http.execute(request).await?;
        let status = res.status().as_u16();
        let ack: SlackResp = read_slack(res, "chat.postMessage").await?;
        if !ack.ok {
            return Err(slack_failure(status, ack.error));
        }
        Ok(())
    }
}

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::error::{parse_retry_after, ApiError};
use crate::model::{Actor, CheckSuite};

pub mod model;
pub mod repos;

pub use repos::RepoHost;

use model::{CheckRunsPage, CheckSuiteResp, UserResp};

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;

/// Read access to check suites and users on the source-control host.
#[async_trait]
pub trait SourceControl: Send + Sync {
    async fn get_check_suite(&self, repo: &str, id: u64) -> Result<CheckSuite, ApiError>;

    async fn get_actor(&self, id: u64) -> Result<Actor, ApiError>;
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Parse an API base URL, making sure relative joins keep its path.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ApiError::Config(format!("invalid base URL {raw:?}: {e}")))
}

impl GithubClient {
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

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("invalid GitHub path {path:?}: {e}")))
    }

    pub(crate) fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    pub fn build_get(&self, path: &str) -> Result<reqwest::Request, ApiError> {
        Ok(self.authed(self.http.get(self.endpoint(path)?)).build()?)
    }

    pub(crate) async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let res = req.send().await?;
        check_response(res, what).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<T, ApiError> {
        self.get_json_at(self.endpoint(path)?, what).await
    }

    pub(crate) async fn get_json_at<T: DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
    ) -> Result<T, ApiError> {
        let req = self.authed(self.http.get(url));
        let res = self.send(req, what).await?;
        decode(res, what).await
    }

    /// GitHub Enterprise serves GraphQL at `/api/graphql`, beside the `/api/v3` REST root.
    pub(crate) fn graphql_endpoint(&self) -> Result<Url, ApiError> {
        let rel = if self.base_url.path().ends_with("/v3/") {
            "../graphql"
        } else {
            "graphql"
        };
        self.endpoint(rel)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
}

/// Map non-success statuses onto [`ApiError`].
pub(crate) async fn check_response(res: Response, what: &str) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(what.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = parse_retry_after(res.headers());
        warn!(what, retry_after_secs, "rate limited by GitHub");
        return Err(ApiError::RateLimited { retry_after_secs });
    }
    let message = res.text().await.unwrap_or_default();
    warn!(what, status = status.as_u16(), body = %message, "GitHub API error");
    Err(ApiError::Api {
        service: "github",
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(res: Response, what: &str) -> Result<T, ApiError> {
    let body = res.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{what}: {e}")))
}

#[async_trait]
impl SourceControl for GithubClient {
    #[instrument(skip(self))]
    async fn get_check_suite(&self, repo: &str, id: u64) -> Result<CheckSuite, ApiError> {
        let what = format!("check suite {id} in {repo}");
        let suite: CheckSuiteResp = self
            .get_json(&format!("repos/{repo}/check-suites/{id}"), &what)
            .await?;
        let head_branch = suite.head_branch.unwrap_or_default();

        let mut check_runs = Vec::new();
        let mut page = 1;
        loop {
            let path =
                format!("repos/{repo}/check-suites/{id}/check-runs?per_page={PER_PAGE}&page={page}");
            let batch: CheckRunsPage = self.get_json(&path, &what).await?;
            let fetched = batch.check_runs.len();
            check_runs.extend(
                batch
                    .check_runs
                    .into_iter()
                    .map(|r| r.into_check_run(&head_branch)),
            );
            if fetched == 0 || check_runs.len() as u64 >= batch.total_count {
                break;
            }
            page += 1;
        }
        debug!(head_sha = %suite.head_sha, runs = check_runs.len(), "fetched check runs");

        Ok(CheckSuite {
            id: suite.id,
            repository: repo.to_string(),
            check_runs,
        })
    }

    #[instrument(skip(self))]
    async fn get_actor(&self, id: u64) -> Result<Actor, ApiError> {
        let user: UserResp = self.get_json(&format!("user/{id}"), &format!("actor {id}")).await?;
        Ok(user.into())
    }
}

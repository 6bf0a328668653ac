//! Repository-write operations used by the workflow rollout tools.
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::model::{
    ContentEntry, FileContent, FileResp, GitRefResp, GraphqlResp, PullRequest, PutFileReq,
    Repository,
};
use super::{check_response, decode, GithubClient, PER_PAGE};
use crate::error::ApiError;

const MARK_READY_MUTATION: &str = "mutation MarkReady($id: ID!) { \
     markPullRequestReadyForReview(input: {pullRequestId: $id}) { pullRequest { isDraft } } }";

#[async_trait]
pub trait RepoHost: Send + Sync {
    async fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>, ApiError>;

    async fn get_repo(&self, repo: &str) -> Result<Repository, ApiError>;

    /// Directory listing, or `None` when the path is absent or not a directory.
    async fn list_dir(&self, repo: &str, path: &str) -> Result<Option<Vec<ContentEntry>>, ApiError>;

    /// File contents at `git_ref` (default branch when `None`), or `None` when absent.
    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Option<FileContent>, ApiError>;

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, ApiError>;

    /// Returns `false` when the branch already exists.
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<bool, ApiError>;

    /// Create the file, or update it when `sha` names the existing blob.
    async fn put_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        message: &str,
        content: &str,
        sha: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn create_pull(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, ApiError>;

    async fn get_pull(&self, repo: &str, number: u64) -> Result<PullRequest, ApiError>;

    async fn mark_ready_for_review(&self, pull: &PullRequest) -> Result<(), ApiError>;
}

pub fn decode_file(resp: FileResp) -> Result<FileContent, ApiError> {
    if resp.encoding != "base64" {
        return Err(ApiError::Decode(format!(
            "unsupported content encoding {:?}",
            resp.encoding
        )));
    }
    let compact: String = resp.content.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ApiError::Decode(format!("file content: {e}")))?;
    let text =
        String::from_utf8(bytes).map_err(|e| ApiError::Decode(format!("file content: {e}")))?;
    Ok(FileContent {
        sha: resp.sha,
        text,
    })
}

fn not_found_as_none<T>(res: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl RepoHost for GithubClient {
    #[instrument(skip(self))]
    async fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>, ApiError> {
        let mut repos = Vec::new();
        let mut page = 1;
        loop {
            let path = format!("orgs/{org}/repos?per_page={PER_PAGE}&page={page}");
            let batch: Vec<Repository> = self.get_json(&path, &format!("organization {org}")).await?;
            let fetched = batch.len();
            repos.extend(batch);
            if fetched < PER_PAGE as usize {
                break;
            }
            page += 1;
        }
        debug!(count = repos.len(), "listed organization repositories");
        Ok(repos)
    }

    async fn get_repo(&self, repo: &str) -> Result<Repository, ApiError> {
        self.get_json(&format!("repos/{repo}"), &format!("repository {repo}"))
            .await
    }

    async fn list_dir(&self, repo: &str, path: &str) -> Result<Option<Vec<ContentEntry>>, ApiError> {
        let value: Option<Value> = not_found_as_none(
            self.get_json(
                &format!("repos/{repo}/contents/{path}"),
                &format!("{path} in {repo}"),
            )
            .await,
        )?;
        match value {
            Some(Value::Array(items)) => {
                let entries = serde_json::from_value(Value::Array(items))
                    .map_err(|e| ApiError::Decode(format!("{path} listing: {e}")))?;
                Ok(Some(entries))
            }
            _ => Ok(None),
        }
    }

    async fn get_file(
        &self,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Option<FileContent>, ApiError> {
        let mut url = self.endpoint(&format!("repos/{repo}/contents/{path}"))?;
        if let Some(r) = git_ref {
            url.query_pairs_mut().append_pair("ref", r);
        }
        let resp: Option<FileResp> =
            not_found_as_none(self.get_json_at(url, &format!("{path} in {repo}")).await)?;
        resp.map(decode_file).transpose()
    }

    async fn branch_head(&self, repo: &str, branch: &str) -> Result<String, ApiError> {
        let r: GitRefResp = self
            .get_json(
                &format!("repos/{repo}/git/ref/heads/{branch}"),
                &format!("branch {branch} in {repo}"),
            )
            .await?;
        Ok(r.object.sha)
    }

    #[instrument(skip(self, sha))]
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(&format!("repos/{repo}/git/refs"))?;
        let req = self
            .authed(self.http().post(url))
            .json(&json!({ "ref": format!("refs/heads/{branch}"), "sha": sha }));
        let res = req.send().await?;
        // GitHub answers 422 "Reference already exists" for an existing branch.
        if res.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = res.text().await.unwrap_or_default();
            if body.contains("already exists") {
                info!("branch already exists; continuing");
                return Ok(false);
            }
            return Err(ApiError::Api {
                service: "github",
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                message: body,
            });
        }
        check_response(res, &format!("branch {branch} in {repo}")).await?;
        Ok(true)
    }

    #[instrument(skip(self, content, sha))]
    async fn put_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
        message: &str,
        content: &str,
        sha: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("repos/{repo}/contents/{path}"))?;
        let body = PutFileReq {
            message,
            content: STANDARD.encode(content),
            branch,
            sha,
        };
        let req = self.authed(self.http().put(url)).json(&body);
        self.send(req, &format!("{path} in {repo}")).await?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn create_pull(
        &self,
        repo: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequest, ApiError> {
        let url = self.endpoint(&format!("repos/{repo}/pulls"))?;
        let req = self.authed(self.http().post(url)).json(&json!({
            "title": title,
            "body": body,
            "head": head,
            "base": base,
        }));
        let what = format!("pull request in {repo}");
        let res = self.send(req, &what).await?;
        decode(res, &what).await
    }

    async fn get_pull(&self, repo: &str, number: u64) -> Result<PullRequest, ApiError> {
        self.get_json(
            &format!("repos/{repo}/pulls/{number}"),
            &format!("pull request #{number} in {repo}"),
        )
        .await
    }

    #[instrument(skip(self, pull), fields(number = pull.number))]
    async fn mark_ready_for_review(&self, pull: &PullRequest) -> Result<(), ApiError> {
        let url = self.graphql_endpoint()?;
        let req = self.authed(self.http().post(url)).json(&json!({
            "query": MARK_READY_MUTATION,
            "variables": { "id": pull.node_id },
        }));
        let what = format!("pull request #{}", pull.number);
        let res = self.send(req, &what).await?;
        let resp: GraphqlResp = decode(res, &what).await?;
        if let Some(first) = resp.errors.first() {
            return Err(ApiError::Api {
                service: "github",
                status: 200,
                message: first.message.clone(),
            });
        }
        Ok(())
    }
}

//! GitHub REST wire shapes. Only the fields this crate reads are declared.
use serde::{Deserialize, Serialize};

use crate::model::{Actor, CheckRun, Conclusion};

#[derive(Deserialize, Debug)]
pub struct CheckSuiteResp {
    pub id: u64,
    #[serde(default)]
    pub head_branch: Option<String>,
    pub head_sha: String,
}

#[derive(Deserialize, Debug)]
pub struct CheckRunsPage {
    pub total_count: u64,
    pub check_runs: Vec<CheckRunResp>,
}

#[derive(Deserialize, Debug)]
pub struct CheckRunResp {
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    pub head_sha: String,
    #[serde(default)]
    pub details_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub app: Option<AppResp>,
}

#[derive(Deserialize, Debug)]
pub struct AppResp {
    pub name: String,
    #[serde(default)]
    pub owner: Option<OwnerResp>,
}

#[derive(Deserialize, Debug)]
pub struct OwnerResp {
    #[serde(default)]
    pub avatar_url: String,
}

impl CheckRunResp {
    pub fn into_check_run(self, head_branch: &str) -> CheckRun {
        let (app_name, app_icon_url) = match self.app {
            Some(app) => (app.name, app.owner.map(|o| o.avatar_url).unwrap_or_default()),
            None => (String::new(), String::new()),
        };
        CheckRun {
            name: self.name,
            conclusion: self.conclusion.unwrap_or(Conclusion::Unknown),
            app_name,
            app_icon_url,
            details_url: self.details_url.or(self.html_url).unwrap_or_default(),
            head_sha: self.head_sha,
            head_branch: head_branch.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct UserResp {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserResp> for Actor {
    fn from(u: UserResp) -> Self {
        Actor {
            id: u.id,
            login: u.login,
            display_name: u.name.filter(|n| !n.trim().is_empty()),
            email: u.email,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub full_name: String,
    #[serde(default)]
    pub archived: bool,
    pub default_branch: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub typ: String,
    pub sha: String,
}

#[derive(Deserialize, Debug)]
pub struct FileResp {
    pub sha: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

/// Decoded file contents plus the blob sha needed to update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub sha: String,
    pub text: String,
}

#[derive(Deserialize, Debug)]
pub struct GitRefResp {
    pub object: GitObject,
}

#[derive(Deserialize, Debug)]
pub struct GitObject {
    pub sha: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub node_id: String,
    #[serde(default)]
    pub draft: bool,
}

#[derive(Serialize, Debug)]
pub struct PutFileReq<'a> {
    pub message: &'a str,
    pub content: String,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
pub struct GraphqlResp {
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Deserialize, Debug)]
pub struct GraphqlError {
    pub message: String,
}

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slack_notify::error::ApiError;
use slack_notify::format::{build_attachments, SUMMARY_TEXT};
use slack_notify::github::model::PullRequest;
use slack_notify::github::{GithubClient, RepoHost, SourceControl};
use slack_notify::model::{CheckRun, Conclusion};
use slack_notify::slack::{ChatPlatform, SlackClient};

#[tokio::test]
async fn github_check_suite_is_assembled_from_both_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/check-suites/9"))
        .and(header("Authorization", "Bearer gh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9,
            "head_branch": "feature/x",
            "head_sha": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/check-suites/9/check-runs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "check_runs": [
                {
                    "name": "build",
                    "conclusion": "failure",
                    "head_sha": "abc123",
                    "details_url": "https://ci.example/build",
                    "app": { "name": "CI", "owner": { "avatar_url": "https://avatars.example/ci.png" } }
                },
                {
                    "name": "deploy",
                    "conclusion": null,
                    "head_sha": "abc123",
                    "html_url": "https://github.com/octo/repo/runs/2",
                    "app": { "name": "Deployer" }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::new("gh-token".into(), &server.uri()).unwrap();
    let suite = client.get_check_suite("octo/repo", 9).await.unwrap();
    assert_eq!(suite.id, 9);
    assert_eq!(suite.repository, "octo/repo");
    assert_eq!(
        suite.check_runs,
        vec![
            CheckRun {
                name: "build".into(),
                conclusion: Conclusion::Failure,
                app_name: "CI".into(),
                app_icon_url: "https://avatars.example/ci.png".into(),
                details_url: "https://ci.example/build".into(),
                head_sha: "abc123".into(),
                head_branch: "feature/x".into(),
            },
            CheckRun {
                name: "deploy".into(),
                conclusion: Conclusion::Unknown,
                app_name: "Deployer".into(),
                app_icon_url: String::new(),
                details_url: "https://github.com/octo/repo/runs/2".into(),
                head_sha: "abc123".into(),
                head_branch: "feature/x".into(),
            },
        ]
    );
}

fn run_json(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "conclusion": "failure",
        "head_sha": "abc123",
        "details_url": format!("https://ci.example/{name}"),
        "app": { "name": "CI" }
    })
}

#[tokio::test]
async fn github_check_runs_follow_pages_until_total_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/check-suites/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9,
            "head_branch": "main",
            "head_sha": "abc123"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/check-suites/9/check-runs"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "check_runs": [run_json("build"), run_json("lint")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/check-suites/9/check-runs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "check_runs": [run_json("test")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::new("t".into(), &server.uri()).unwrap();
    let suite = client.get_check_suite("octo/repo", 9).await.unwrap();
    let names: Vec<_> = suite.check_runs.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["build", "lint", "test"]);
}

#[tokio::test]
async fn github_file_ref_is_query_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contents/.github/workflows/n.yml"))
        .and(query_param("ref", "feat#1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": "blob-1",
            "content": "bmFtZTogbm90aWZ5Cg==",
            "encoding": "base64"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::new("t".into(), &server.uri()).unwrap();
    let file = client
        .get_file("o/r", ".github/workflows/n.yml", Some("feat#1"))
        .await
        .unwrap()
        .expect("file on branch");
    assert_eq!(file.sha, "blob-1");
    assert_eq!(file.text, "name: notify\n");
}

#[tokio::test]
async fn github_enterprise_graphql_sits_beside_rest_root() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql"))
        .and(body_partial_json(json!({ "variables": { "id": "PR_7" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "markPullRequestReadyForReview": { "pullRequest": { "isDraft": false } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::new("t".into(), &format!("{}/api/v3", server.uri())).unwrap();
    let pull = PullRequest {
        number: 7,
        html_url: "https://ghe.example.com/o/r/pull/7".into(),
        node_id: "PR_7".into(),
        draft: true,
    };
    client.mark_ready_for_review(&pull).await.unwrap();
}

#[tokio::test]
async fn github_missing_suite_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/repo/check-suites/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let client = GithubClient::new("t".into(), &server.uri()).unwrap();
    let err = client.get_check_suite("octo/repo", 404).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn github_actor_maps_blank_name_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "login": "jdoe",
            "name": "",
            "email": "jd@example.com"
        })))
        .mount(&server)
        .await;

    let client = GithubClient::new("t".into(), &server.uri()).unwrap();
    let actor = client.get_actor(42).await.unwrap();
    assert_eq!(actor.login, "jdoe");
    assert_eq!(actor.display_name, None);
    assert_eq!(actor.email.as_deref(), Some("jd@example.com"));

    let err = client.get_actor(43).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn slack_users_are_collected_across_cursor_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users.list"))
        .and(query_param("cursor", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "members": [ { "id": "U2", "profile": { "first_name": "John", "last_name": "Doe" } } ],
            "response_metadata": { "next_cursor": "" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users.list"))
        .and(header("Authorization", "Bearer xoxb-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "members": [ { "id": "U1", "profile": { "first_name": "Jane", "last_name": "Roe" } } ],
            "response_metadata": { "next_cursor": "page-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SlackClient::new("xoxb-1".into(), &server.uri()).unwrap();
    let users = client.list_users().await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["U1", "U2"]);
}

#[tokio::test]
async fn slack_429_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users.list"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let client = SlackClient::new("xoxb-1".into(), &server.uri()).unwrap();
    let err = client.list_users().await.unwrap_err();
    assert!(matches!(err, ApiError::RateLimited { retry_after_secs: 7 }));
}

#[tokio::test]
async fn slack_not_ok_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
        )
        .mount(&server)
        .await;

    let client = SlackClient::new("xoxb-1".into(), &server.uri()).unwrap();
    let err = client.post_message("C404", "hi", &[]).await.unwrap_err();
    match err {
        ApiError::Api {
            service, message, ..
        } => {
            assert_eq!(service, "slack");
            assert_eq!(message, "channel_not_found");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn slack_post_message_sends_channel_text_and_attachments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("Authorization", "Bearer xoxb-1"))
        .and(body_partial_json(json!({
            "channel": "C1",
            "text": SUMMARY_TEXT
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let run = CheckRun {
        name: "build".into(),
        conclusion: Conclusion::Failure,
        app_name: "CI".into(),
        app_icon_url: String::new(),
        details_url: "https://ci.example/build".into(),
        head_sha: "abc123".into(),
        head_branch: "main".into(),
    };
    let attachments = build_attachments(&[run], "octo/repo", Some("U1"));
    let client = SlackClient::new("xoxb-1".into(), &server.uri()).unwrap();
    client
        .post_message("C1", SUMMARY_TEXT, &attachments)
        .await
        .unwrap();
}

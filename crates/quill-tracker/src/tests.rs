//! Tests for vendor API request shapes and error mapping.

use httpmock::prelude::*;
use quill_store::{Registration, Vendor};
use serde_json::json;

use super::{gitlab::encode_project_path, NewIssue, TrackerClient, TrackerError};

fn registration(vendor: Vendor) -> Registration {
    Registration {
        id: 1,
        user_id: "u1".to_string(),
        vendor,
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        token: "secret-token".to_string(),
    }
}

fn issue() -> NewIssue {
    NewIssue {
        title: "It broke".to_string(),
        body: "> quoted message".to_string(),
        labels: vec!["bug".to_string()],
    }
}

fn client_for(server: &MockServer) -> TrackerClient {
    TrackerClient::with_api_bases(server.base_url(), server.base_url()).expect("client")
}

#[tokio::test]
async fn github_verify_sends_auth_headers() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/acme/widgets")
            .header("authorization", "Bearer secret-token")
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", "2022-11-28");
        then.status(200).json_body(json!({ "full_name": "acme/widgets" }));
    });

    let client = client_for(&server);
    client
        .verify_credential(&registration(Vendor::GitHub))
        .await
        .expect("verify ok");
    mock.assert();
}

#[tokio::test]
async fn github_verify_maps_unauthorized() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets");
        then.status(401).json_body(json!({ "message": "Bad credentials" }));
    });

    let client = client_for(&server);
    let error = client
        .verify_credential(&registration(Vendor::GitHub))
        .await
        .expect_err("verify fails");
    assert!(matches!(error, TrackerError::Unauthorized));
}

#[tokio::test]
async fn github_verify_maps_missing_repo() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets");
        then.status(404).json_body(json!({ "message": "Not Found" }));
    });

    let client = client_for(&server);
    let error = client
        .verify_credential(&registration(Vendor::GitHub))
        .await
        .expect_err("verify fails");
    assert!(matches!(error, TrackerError::RepoNotFound));
}

#[tokio::test]
async fn github_verify_surfaces_other_statuses() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets");
        then.status(500).json_body(json!({ "message": "boom" }));
    });

    let client = client_for(&server);
    let error = client
        .verify_credential(&registration(Vendor::GitHub))
        .await
        .expect_err("verify fails");
    match error {
        TrackerError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn github_create_issue_posts_labels_and_returns_url() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/acme/widgets/issues")
            .header("authorization", "Bearer secret-token")
            .json_body(json!({
                "title": "It broke",
                "body": "> quoted message",
                "labels": ["bug"],
            }));
        then.status(201).json_body(json!({
            "number": 17,
            "html_url": "https://github.com/acme/widgets/issues/17",
        }));
    });

    let client = client_for(&server);
    let url = client
        .create_issue(&registration(Vendor::GitHub), &issue())
        .await
        .expect("create ok");
    assert_eq!(url, "https://github.com/acme/widgets/issues/17");
    mock.assert();
}

#[tokio::test]
async fn gitlab_verify_uses_private_token_and_encoded_path() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/projects/acme%2Fwidgets")
            .header("PRIVATE-TOKEN", "secret-token");
        then.status(200).json_body(json!({ "path_with_namespace": "acme/widgets" }));
    });

    let client = client_for(&server);
    client
        .verify_credential(&registration(Vendor::GitLab))
        .await
        .expect("verify ok");
    mock.assert();
}

#[tokio::test]
async fn gitlab_create_issue_joins_labels_and_returns_url() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/projects/acme%2Fwidgets/issues")
            .header("PRIVATE-TOKEN", "secret-token")
            .json_body(json!({
                "title": "It broke",
                "description": "> quoted message",
                "labels": "bug",
            }));
        then.status(201).json_body(json!({
            "iid": 4,
            "web_url": "https://gitlab.com/acme/widgets/-/issues/4",
        }));
    });

    let client = client_for(&server);
    let url = client
        .create_issue(&registration(Vendor::GitLab), &issue())
        .await
        .expect("create ok");
    assert_eq!(url, "https://gitlab.com/acme/widgets/-/issues/4");
    mock.assert();
}

#[tokio::test]
async fn gitlab_create_issue_maps_unauthorized() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/projects/acme%2Fwidgets/issues");
        then.status(403).json_body(json!({ "message": "forbidden" }));
    });

    let client = client_for(&server);
    let error = client
        .create_issue(&registration(Vendor::GitLab), &issue())
        .await
        .expect_err("create fails");
    assert!(matches!(error, TrackerError::Unauthorized));
}

#[tokio::test]
async fn blank_title_is_rejected_before_any_request() {
    let server = MockServer::start();
    let client = client_for(&server);
    let mut blank = issue();
    blank.title = "   ".to_string();
    let error = client
        .create_issue(&registration(Vendor::GitHub), &blank)
        .await
        .expect_err("rejected");
    assert!(matches!(error, TrackerError::InvalidArgument(_)));
}

#[tokio::test]
async fn missing_token_is_rejected_before_any_request() {
    let server = MockServer::start();
    let client = client_for(&server);
    let mut anonymous = registration(Vendor::GitHub);
    anonymous.token = String::new();
    let error = client
        .verify_credential(&anonymous)
        .await
        .expect_err("rejected");
    assert!(matches!(error, TrackerError::InvalidArgument(_)));
}

#[test]
fn project_path_encoding_escapes_reserved_bytes() {
    assert_eq!(encode_project_path("acme", "widgets"), "acme%2Fwidgets");
    assert_eq!(
        encode_project_path("group/sub", "repo name"),
        "group%2Fsub%2Frepo%20name"
    );
    assert_eq!(encode_project_path("a-b.c_d", "r~1"), "a-b.c_d%2Fr~1");
}

//! GitLab REST API calls (project lookup, issue creation).

use quill_store::Registration;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{error_message, NewIssue, TrackerClient, TrackerError, TrackerResult};

const GITLAB_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Clone, Deserialize)]
struct GitlabIssueCreateResponse {
    web_url: Option<String>,
}

/// Percent-encodes `owner/repo` into the single path segment the projects
/// endpoint expects.
pub(crate) fn encode_project_path(owner: &str, repo: &str) -> String {
    let mut encoded = String::new();
    for byte in format!("{owner}/{repo}").bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

impl TrackerClient {
    pub(crate) async fn gitlab_verify(&self, registration: &Registration) -> TrackerResult<()> {
        let url = format!(
            "{}/projects/{}",
            self.gitlab_api_base,
            encode_project_path(&registration.owner, &registration.repo)
        );
        let response = self
            .http
            .get(url)
            .header(GITLAB_TOKEN_HEADER, &registration.token)
            .send()
            .await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TrackerError::from_status(status, error_message(response).await));
        }
        debug!(repo = %registration.short_name(), "gitlab project lookup ok");
        Ok(())
    }

    pub(crate) async fn gitlab_create_issue(
        &self,
        registration: &Registration,
        issue: &NewIssue,
    ) -> TrackerResult<String> {
        let url = format!(
            "{}/projects/{}/issues",
            self.gitlab_api_base,
            encode_project_path(&registration.owner, &registration.repo)
        );
        let response = self
            .http
            .post(url)
            .header(GITLAB_TOKEN_HEADER, &registration.token)
            .json(&json!({
                "title": issue.title,
                "description": issue.body,
                "labels": issue.labels.join(","),
            }))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TrackerError::from_status(status, error_message(response).await));
        }
        let created: GitlabIssueCreateResponse = response.json().await?;
        debug!(repo = %registration.short_name(), "gitlab issue created");
        Ok(created.web_url.unwrap_or_default())
    }
}

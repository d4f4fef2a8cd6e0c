//! GitHub REST API calls (repo lookup, issue creation).

use quill_store::Registration;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{error_message, NewIssue, TrackerClient, TrackerError, TrackerResult};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, Deserialize)]
struct GithubIssueCreateResponse {
    html_url: Option<String>,
}

impl TrackerClient {
    pub(crate) async fn github_verify(&self, registration: &Registration) -> TrackerResult<()> {
        let url = format!(
            "{}/repos/{}/{}",
            self.github_api_base, registration.owner, registration.repo
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(&registration.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header("x-github-api-version", GITHUB_API_VERSION)
            .send()
            .await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TrackerError::from_status(status, error_message(response).await));
        }
        debug!(repo = %registration.short_name(), "github repo lookup ok");
        Ok(())
    }

    pub(crate) async fn github_create_issue(
        &self,
        registration: &Registration,
        issue: &NewIssue,
    ) -> TrackerResult<String> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            self.github_api_base, registration.owner, registration.repo
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&registration.token)
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header("x-github-api-version", GITHUB_API_VERSION)
            .json(&json!({
                "title": issue.title,
                "body": issue.body,
                "labels": issue.labels,
            }))
            .send()
            .await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(TrackerError::from_status(status, error_message(response).await));
        }
        let created: GithubIssueCreateResponse = response.json().await?;
        debug!(repo = %registration.short_name(), "github issue created");
        Ok(created.html_url.unwrap_or_default())
    }
}

//! HTTP clients for the supported issue-tracker vendors.
//!
//! One uniform capability — verify a stored credential, create a remote
//! issue — dispatched over the closed [`Vendor`] enum. Adding a vendor means
//! adding a module here; the store and session crates are untouched.

use std::time::Duration;

use quill_store::{Registration, Vendor};
use thiserror::Error;

mod github;
mod gitlab;
#[cfg(test)]
mod tests;

const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const DEFAULT_GITLAB_API_BASE: &str = "https://gitlab.com/api/v4";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors returned by vendor API calls.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("credential rejected by vendor")]
    Unauthorized,
    #[error("remote repository not found")]
    RepoNotFound,
    #[error("vendor api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl TrackerError {
    /// Maps an HTTP error status to the coarse categories callers branch on.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            404 => Self::RepoNotFound,
            _ => Self::Api { status, message },
        }
    }
}

/// Content of an issue to create remotely.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Client for both vendor REST APIs. Credentials are per-registration, so
/// auth headers are attached per request rather than baked into the client.
#[derive(Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    github_api_base: String,
    gitlab_api_base: String,
}

impl TrackerClient {
    pub fn new() -> TrackerResult<Self> {
        Self::with_api_bases(DEFAULT_GITHUB_API_BASE, DEFAULT_GITLAB_API_BASE)
    }

    /// Builds a client pointed at alternate API bases. Used by tests to talk
    /// to a local mock server.
    pub fn with_api_bases(
        github_api_base: impl Into<String>,
        gitlab_api_base: impl Into<String>,
    ) -> TrackerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("quill/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            http,
            github_api_base: trim_base(github_api_base.into()),
            gitlab_api_base: trim_base(gitlab_api_base.into()),
        })
    }

    /// Checks that the registration's token can read the remote repository.
    pub async fn verify_credential(&self, registration: &Registration) -> TrackerResult<()> {
        validate_registration(registration)?;
        match registration.vendor {
            Vendor::GitHub => self.github_verify(registration).await,
            Vendor::GitLab => self.gitlab_verify(registration).await,
        }
    }

    /// Creates an issue on the remote repository and returns its browser URL.
    pub async fn create_issue(
        &self,
        registration: &Registration,
        issue: &NewIssue,
    ) -> TrackerResult<String> {
        validate_registration(registration)?;
        if issue.title.trim().is_empty() {
            return Err(TrackerError::InvalidArgument("issue title must not be blank"));
        }
        match registration.vendor {
            Vendor::GitHub => self.github_create_issue(registration, issue).await,
            Vendor::GitLab => self.gitlab_create_issue(registration, issue).await,
        }
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn validate_registration(registration: &Registration) -> TrackerResult<()> {
    if registration.owner.is_empty() || registration.repo.is_empty() {
        return Err(TrackerError::InvalidArgument("registration missing owner or repo"));
    }
    if registration.token.is_empty() {
        return Err(TrackerError::InvalidArgument("registration missing token"));
    }
    Ok(())
}

/// Reads an error body and pulls out the vendor's message field when present.
pub(crate) async fn error_message(response: reqwest::Response) -> String {
    let raw = response.text().await.unwrap_or_default();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) {
        for field in ["message", "error", "error_description"] {
            if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "no error details".to_string()
    } else {
        let mut message: String = trimmed.chars().take(200).collect();
        if message.len() < trimmed.len() {
            message.push('…');
        }
        message
    }
}

//! Pure rendering and parsing helpers for the interaction flows.

use anyhow::{bail, Result};
use quill_session::IssueSession;
use quill_store::{Registration, Vendor};
use quill_tracker::TrackerError;

/// Parses a repository browser URL into `(owner, repo, vendor)`.
///
/// Accepted shape: `https://github.com/{owner}/{repo}` or the gitlab.com
/// equivalent, with an optional trailing `.git` or `/`. The error text is
/// shown to the user verbatim.
pub(super) fn parse_repo_url(raw: &str) -> Result<(String, String, Vendor)> {
    let trimmed = raw.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    let Some(rest) = rest else {
        bail!("URL must start with https://");
    };
    let rest = rest.trim_end_matches('/');
    let mut segments = rest.split('/');
    let host = segments.next().unwrap_or_default();
    let vendor = match host {
        "github.com" | "www.github.com" => Vendor::GitHub,
        "gitlab.com" | "www.gitlab.com" => Vendor::GitLab,
        _ => bail!("host must be github.com or gitlab.com"),
    };
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    if owner.is_empty() || repo.is_empty() || segments.next().is_some() {
        bail!("URL path must be exactly {{owner}}/{{repo}}");
    }
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        bail!("URL path must be exactly {{owner}}/{{repo}}");
    }
    Ok((owner.to_string(), repo.to_string(), vendor))
}

/// Markdown body of the remote issue: the quoted source message plus an
/// attribution line linking back to Discord.
pub(super) fn render_issue_body(session: &IssueSession) -> String {
    let quoted: String = session
        .message_content
        .lines()
        .map(|line| format!("> {line}\n"))
        .collect();
    let quoted = if quoted.is_empty() {
        "> \n".to_string()
    } else {
        quoted
    };
    format!(
        "{quoted}\n*Originally posted by **{}** on [Discord]({})*",
        session.author_name,
        message_link(session)
    )
}

/// Deep link to the source message. DM channels have no guild id; Discord
/// uses the `@me` placeholder there.
pub(super) fn message_link(session: &IssueSession) -> String {
    let guild = if session.guild_id.is_empty() {
        "@me"
    } else {
        &session.guild_id
    };
    format!(
        "https://discord.com/channels/{guild}/{}/{}",
        session.channel_id, session.message_id
    )
}

/// Step prompt shown above wizard components, e.g. "Create bug report [1 / 2]".
pub(super) fn step_prompt(kind: quill_session::IssueKind, step: u8) -> String {
    format!("Create {} [{step} / 2]", kind.display())
}

/// One listing line per registration on the management view.
pub(super) fn render_repo_line(registration: &Registration) -> String {
    format!("[{}]({})", registration.short_name(), registration.url())
}

pub(super) fn render_repo_count(count: usize) -> String {
    match count {
        0 => "No repositories registered yet.".to_string(),
        1 => "1 repository registered:".to_string(),
        n => format!("{n} repositories registered:"),
    }
}

/// User-facing explanation for a failed vendor call. The coarse status split
/// is owned by the tracker; the wording is owned here.
pub(super) fn verify_failure_reason(error: &TrackerError) -> &'static str {
    match error {
        TrackerError::Unauthorized => "Invalid token",
        TrackerError::RepoNotFound => "Repository not found",
        _ => "Internal error",
    }
}

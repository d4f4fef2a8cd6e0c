//! Tests for the pure interaction helpers (custom ids, URL parsing, rendering).

use quill_session::{IssueKind, IssueSession};
use quill_store::{Registration, Vendor};
use quill_tracker::TrackerError;

use super::custom_ids::CustomId;
use super::render_helpers::{
    message_link, parse_repo_url, render_issue_body, render_repo_count, render_repo_line,
    step_prompt, verify_failure_reason,
};

#[test]
fn custom_ids_round_trip() {
    let cases = vec![
        CustomId::IssueRepoSelect {
            token: "17".to_string(),
        },
        CustomId::IssueSubmit {
            token: "17".to_string(),
        },
        CustomId::RepoAddOpen,
        CustomId::RepoAdd {
            user_id: "123456".to_string(),
        },
        CustomId::RepoDelete { id: 9 },
        CustomId::RepoTest { id: 9 },
    ];
    for case in cases {
        assert_eq!(CustomId::decode(&case.encode()), Some(case));
    }
}

#[test]
fn unknown_custom_ids_are_rejected() {
    assert_eq!(CustomId::decode(""), None);
    assert_eq!(CustomId::decode("something-else"), None);
    assert_eq!(CustomId::decode("repo-delete:not-a-number"), None);
    assert_eq!(CustomId::decode("repo-test:"), None);
}

#[test]
fn parse_repo_url_accepts_both_vendors() {
    let (owner, repo, vendor) = parse_repo_url("https://github.com/acme/widgets").expect("github");
    assert_eq!((owner.as_str(), repo.as_str()), ("acme", "widgets"));
    assert_eq!(vendor, Vendor::GitHub);

    let (owner, repo, vendor) =
        parse_repo_url("https://gitlab.com/acme/widgets/").expect("gitlab with trailing slash");
    assert_eq!((owner.as_str(), repo.as_str()), ("acme", "widgets"));
    assert_eq!(vendor, Vendor::GitLab);

    let (_, repo, _) =
        parse_repo_url("  https://github.com/acme/widgets.git ").expect("git suffix");
    assert_eq!(repo, "widgets");
}

#[test]
fn parse_repo_url_rejects_bad_input() {
    for raw in [
        "",
        "github.com/acme/widgets",
        "ftp://github.com/acme/widgets",
        "https://bitbucket.org/acme/widgets",
        "https://github.com/acme",
        "https://github.com/acme/widgets/extra",
        "https://github.com//widgets",
    ] {
        assert!(parse_repo_url(raw).is_err(), "should reject {raw:?}");
    }
}

fn test_session() -> IssueSession {
    IssueSession {
        requester_id: "42".to_string(),
        guild_id: "100".to_string(),
        channel_id: "200".to_string(),
        message_id: "300".to_string(),
        author_id: "7".to_string(),
        author_name: "alice".to_string(),
        message_content: "first line\nsecond line".to_string(),
        message_timestamp: "2026-01-01T00:00:00Z".to_string(),
        kind: IssueKind::Bug,
        registration_id: Some(1),
        title: Some("It broke".to_string()),
    }
}

#[test]
fn issue_body_quotes_every_line_and_links_back() {
    let body = render_issue_body(&test_session());
    assert!(body.starts_with("> first line\n> second line\n"));
    assert!(body.contains("**alice**"));
    assert!(body.contains("https://discord.com/channels/100/200/300"));
}

#[test]
fn message_link_uses_at_me_for_dms() {
    let mut session = test_session();
    session.guild_id = String::new();
    assert_eq!(
        message_link(&session),
        "https://discord.com/channels/@me/200/300"
    );
}

#[test]
fn step_prompts_name_the_issue_kind() {
    assert_eq!(step_prompt(IssueKind::Bug, 1), "Create bug report [1 / 2]");
    assert_eq!(
        step_prompt(IssueKind::Feature, 2),
        "Create feature request [2 / 2]"
    );
    assert_eq!(step_prompt(IssueKind::Generic, 1), "Create issue [1 / 2]");
}

#[test]
fn repo_overview_rendering() {
    let registration = Registration {
        id: 3,
        user_id: "42".to_string(),
        vendor: Vendor::GitHub,
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        token: "t".to_string(),
    };
    assert_eq!(
        render_repo_line(&registration),
        "[acme/widgets](https://github.com/acme/widgets)"
    );
    assert_eq!(render_repo_count(0), "No repositories registered yet.");
    assert_eq!(render_repo_count(1), "1 repository registered:");
    assert_eq!(render_repo_count(3), "3 repositories registered:");
}

#[test]
fn verify_failures_map_to_user_text() {
    assert_eq!(
        verify_failure_reason(&TrackerError::Unauthorized),
        "Invalid token"
    );
    assert_eq!(
        verify_failure_reason(&TrackerError::RepoNotFound),
        "Repository not found"
    );
    assert_eq!(
        verify_failure_reason(&TrackerError::Api {
            status: 500,
            message: "boom".to_string(),
        }),
        "Internal error"
    );
}

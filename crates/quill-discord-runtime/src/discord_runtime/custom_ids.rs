//! Encoding of wizard state into component custom ids.
//!
//! Discord delivers every follow-up step as a fresh stateless event; the only
//! correlation channel is the custom id string embedded in the component. The
//! id carries an action prefix plus either a session token, a registration id
//! or a user id.

const ISSUE_REPO_PREFIX: &str = "issue-repo:";
const ISSUE_SUBMIT_PREFIX: &str = "issue-submit:";
const REPO_ADD_OPEN: &str = "repo-add-open";
const REPO_ADD_PREFIX: &str = "repo-add:";
const REPO_DELETE_PREFIX: &str = "repo-delete:";
const REPO_TEST_PREFIX: &str = "repo-test:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum CustomId {
    /// Step-1 select menu of the issue wizard.
    IssueRepoSelect { token: String },
    /// Step-2 title modal of the issue wizard.
    IssueSubmit { token: String },
    /// "Add repository" button on the management listing.
    RepoAddOpen,
    /// Repository add modal.
    RepoAdd { user_id: String },
    RepoDelete { id: u64 },
    RepoTest { id: u64 },
}

impl CustomId {
    pub(super) fn encode(&self) -> String {
        match self {
            Self::IssueRepoSelect { token } => format!("{ISSUE_REPO_PREFIX}{token}"),
            Self::IssueSubmit { token } => format!("{ISSUE_SUBMIT_PREFIX}{token}"),
            Self::RepoAddOpen => REPO_ADD_OPEN.to_string(),
            Self::RepoAdd { user_id } => format!("{REPO_ADD_PREFIX}{user_id}"),
            Self::RepoDelete { id } => format!("{REPO_DELETE_PREFIX}{id}"),
            Self::RepoTest { id } => format!("{REPO_TEST_PREFIX}{id}"),
        }
    }

    pub(super) fn decode(raw: &str) -> Option<Self> {
        if raw == REPO_ADD_OPEN {
            return Some(Self::RepoAddOpen);
        }
        if let Some(token) = raw.strip_prefix(ISSUE_REPO_PREFIX) {
            return Some(Self::IssueRepoSelect {
                token: token.to_string(),
            });
        }
        if let Some(token) = raw.strip_prefix(ISSUE_SUBMIT_PREFIX) {
            return Some(Self::IssueSubmit {
                token: token.to_string(),
            });
        }
        if let Some(user_id) = raw.strip_prefix(REPO_ADD_PREFIX) {
            return Some(Self::RepoAdd {
                user_id: user_id.to_string(),
            });
        }
        if let Some(id) = raw.strip_prefix(REPO_DELETE_PREFIX) {
            return id.parse().ok().map(|id| Self::RepoDelete { id });
        }
        if let Some(id) = raw.strip_prefix(REPO_TEST_PREFIX) {
            return id.parse().ok().map(|id| Self::RepoTest { id });
        }
        None
    }
}

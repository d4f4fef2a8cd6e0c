//! In-memory wizard sessions for the multi-step issue-creation flow.
//!
//! Each Discord interaction step is a separate stateless exchange, correlated
//! only by an opaque token embedded in component custom ids. The manager hands
//! out monotonically issued tokens and stores plain session values under them.
//! Sessions live for the process lifetime; an abandoned wizard is never
//! reclaimed, which is an accepted leak bounded by process restarts.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use thiserror::Error;
use tracing::debug;

/// Result type for session manager operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session under token '{0}'")]
    NotFound(String),
}

/// Kind of issue being filed, chosen by which message command was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueKind {
    #[default]
    Generic,
    Bug,
    Feature,
}

impl IssueKind {
    /// Human-readable noun for prompts ("Create bug report [1 / 2]").
    pub fn display(self) -> &'static str {
        match self {
            Self::Generic => "issue",
            Self::Bug => "bug report",
            Self::Feature => "feature request",
        }
    }

    /// Label attached to the remote issue, if any.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Generic => None,
            Self::Bug => Some("bug"),
            Self::Feature => Some("enhancement"),
        }
    }
}

/// State of one in-progress issue wizard. Plain value semantics: steps load
/// it, modify their copy and store it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueSession {
    /// User driving the wizard. Only this user may advance the session.
    pub requester_id: String,
    pub guild_id: String,
    pub channel_id: String,
    /// Message the issue is being filed about.
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub message_content: String,
    pub message_timestamp: String,
    pub kind: IssueKind,
    /// Set in step 2, never reset afterwards.
    pub registration_id: Option<u64>,
    /// Set in step 3; re-submission may overwrite it.
    pub title: Option<String>,
}

/// Process-local session registry: an atomic token counter plus a mutex-held
/// map. Operations on distinct tokens only contend on the map lock; same-token
/// races are last-write-wins, which the sequential UI flow makes benign.
#[derive(Debug, Default)]
pub struct SessionManager {
    counter: AtomicU64,
    sessions: Mutex<HashMap<String, IssueSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `session` under a fresh, never-before-issued token and returns
    /// the token.
    pub fn create(&self, session: IssueSession) -> String {
        let token = (self.counter.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        self.lock().insert(token.clone(), session);
        debug!(token, "session created");
        token
    }

    /// Returns a copy of the session under `token`.
    pub fn load(&self, token: &str) -> SessionResult<IssueSession> {
        self.lock()
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(token.to_string()))
    }

    /// Replaces the session under `token`, inserting it if absent.
    pub fn store(&self, token: &str, session: IssueSession) {
        self.lock().insert(token.to_string(), session);
    }

    /// Removes the session under `token`. Removing an unknown token is a no-op.
    pub fn delete(&self, token: &str) {
        self.lock().remove(token);
        debug!(token, "session deleted");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, IssueSession>> {
        // A poisoned lock means another handler panicked mid-insert; the map
        // itself is still structurally sound, so keep serving.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn session_for(requester: &str) -> IssueSession {
        IssueSession {
            requester_id: requester.to_string(),
            kind: IssueKind::Bug,
            ..IssueSession::default()
        }
    }

    #[test]
    fn round_trips_session_value() {
        let manager = SessionManager::new();
        let mut session = session_for("u1");
        session.message_content = "it broke".to_string();

        let token = manager.create(session.clone());
        assert_eq!(manager.load(&token).expect("load"), session);

        session.registration_id = Some(9);
        manager.store(&token, session.clone());
        assert_eq!(manager.load(&token).expect("reload"), session);
    }

    #[test]
    fn delete_makes_token_unknown() {
        let manager = SessionManager::new();
        let token = manager.create(session_for("u1"));
        manager.delete(&token);
        assert!(matches!(
            manager.load(&token),
            Err(SessionError::NotFound(_))
        ));
        // Idempotent.
        manager.delete(&token);
    }

    #[test]
    fn load_of_unknown_token_fails() {
        let manager = SessionManager::new();
        assert!(matches!(
            manager.load("no-such-token"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn tokens_are_unique_and_monotonic() {
        let manager = SessionManager::new();
        let first: u64 = manager.create(session_for("u1")).parse().expect("numeric");
        let second: u64 = manager.create(session_for("u1")).parse().expect("numeric");
        assert!(second > first);
    }

    #[test]
    fn tokens_stay_unique_across_threads() {
        let manager = Arc::new(SessionManager::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(std::thread::spawn(move || {
                (0..100)
                    .map(|_| manager.create(IssueSession::default()))
                    .collect::<Vec<_>>()
            }));
        }
        let mut tokens: Vec<String> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("join"))
            .collect();
        let issued = tokens.len();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), issued);
    }

    #[test]
    fn same_token_store_is_last_write_wins() {
        let manager = SessionManager::new();
        let token = manager.create(session_for("u1"));

        let mut first = session_for("u1");
        first.title = Some("first".to_string());
        let mut second = session_for("u1");
        second.title = Some("second".to_string());

        manager.store(&token, first);
        manager.store(&token, second.clone());
        assert_eq!(manager.load(&token).expect("load"), second);
    }

    #[test]
    fn issue_kind_labels() {
        assert_eq!(IssueKind::Generic.label(), None);
        assert_eq!(IssueKind::Bug.label(), Some("bug"));
        assert_eq!(IssueKind::Feature.label(), Some("enhancement"));
        assert_eq!(IssueKind::Bug.display(), "bug report");
    }
}

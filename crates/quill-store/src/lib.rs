//! Durable registration store mapping Discord users to issue-tracker repos.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod registry;

pub use registry::RegistryStore;

/// Result type for registry store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("registration {0} not found")]
    NotFound(u64),
    #[error("storage failure: {0}")]
    Storage(#[from] redb::Error),
    #[error("failed to decode registration record: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redb::DatabaseError> for StoreError {
    fn from(error: redb::DatabaseError) -> Self {
        Self::Storage(error.into())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(error: redb::TransactionError) -> Self {
        Self::Storage(error.into())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(error: redb::TableError) -> Self {
        Self::Storage(error.into())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(error: redb::StorageError) -> Self {
        Self::Storage(error.into())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(error: redb::CommitError) -> Self {
        Self::Storage(error.into())
    }
}

/// Supported issue-tracker providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    GitHub,
    GitLab,
}

impl Vendor {
    /// Hostname of the vendor's public instance.
    pub fn host(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
        }
    }

    pub(crate) fn as_db_value(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
        }
    }

    pub(crate) fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "github" => Some(Self::GitHub),
            "gitlab" => Some(Self::GitLab),
            _ => None,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_value())
    }
}

/// A registered repository owned by one Discord user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: u64,
    pub user_id: String,
    pub vendor: Vendor,
    pub owner: String,
    pub repo: String,
    pub token: String,
}

impl Registration {
    /// Full name used to order listings: `host/owner/repo`.
    pub fn display_name(&self) -> String {
        format!("{}/{}/{}", self.vendor.host(), self.owner, self.repo)
    }

    /// Short `owner/repo` label for UI elements.
    pub fn short_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Browser URL of the remote repository.
    pub fn url(&self) -> String {
        format!("https://{}/{}/{}", self.vendor.host(), self.owner, self.repo)
    }
}

/// Input for [`RegistryStore::create_or_update`].
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub user_id: String,
    pub vendor: Vendor,
    pub owner: String,
    pub repo: String,
    pub token: String,
}

/// On-disk shape of a registration record. The serialization is the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegistrationRecord {
    pub(crate) id: u64,
    pub(crate) user_id: String,
    pub(crate) vendor: String,
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) token: String,
}

impl RegistrationRecord {
    pub(crate) fn into_registration(self) -> StoreResult<Registration> {
        let vendor = Vendor::from_db_value(&self.vendor)
            .ok_or(StoreError::InvalidArgument("unknown vendor in record"))?;
        Ok(Registration {
            id: self.id,
            user_id: self.user_id,
            vendor,
            owner: self.owner,
            repo: self.repo,
            token: self.token,
        })
    }
}

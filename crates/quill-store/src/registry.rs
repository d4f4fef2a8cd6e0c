//! redb-backed registry with a manual secondary index over the business key.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use tracing::{info, warn};

use crate::{NewRegistration, Registration, RegistrationRecord, StoreError, StoreResult, Vendor};

/// Primary table: registration id -> serialized record.
const REGISTRATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("registrations");
/// Secondary index: business key -> registration id.
const REGISTRATION_INDEX: TableDefinition<&str, u64> = TableDefinition::new("registration_index");
/// Single-cell counters.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_registration_id";

/// Delimiter joining business key components. Components containing this
/// byte are rejected up front so two distinct keys can never collide.
const KEY_DELIMITER: char = '\u{1f}';

fn business_key(user_id: &str, vendor: Vendor, owner: &str, repo: &str) -> String {
    format!(
        "{user_id}{KEY_DELIMITER}{}{KEY_DELIMITER}{owner}{KEY_DELIMITER}{repo}",
        vendor.as_db_value()
    )
}

/// Durable store for repository registrations.
///
/// All mutating operations run inside a single redb write transaction, so the
/// secondary index and the primary table can never diverge. Writes insert the
/// index entry before the record; deletes remove the record before scanning
/// the index, so a dangling index entry is never observable.
pub struct RegistryStore {
    db: Database,
}

impl RegistryStore {
    /// Opens (or creates) the database at `path` and ensures all tables exist.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        let txn = db.begin_write()?;
        {
            txn.open_table(REGISTRATIONS)?;
            txn.open_table(REGISTRATION_INDEX)?;
            txn.open_table(META)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Creates a registration, or updates the existing one when the business
    /// key `(user, vendor, owner, repo)` is already known. Returns the stored
    /// registration and whether it was newly created. The id is assigned on
    /// first sight of a business key and never changes afterwards.
    pub fn create_or_update(&self, params: NewRegistration) -> StoreResult<(Registration, bool)> {
        validate_component(&params.user_id, "user id")?;
        validate_component(&params.owner, "owner")?;
        validate_component(&params.repo, "repo")?;
        if params.token.is_empty() {
            return Err(StoreError::InvalidArgument("token must not be empty"));
        }

        let key = business_key(&params.user_id, params.vendor, &params.owner, &params.repo);
        let txn = self.db.begin_write()?;
        let (record, created) = {
            let mut index = txn.open_table(REGISTRATION_INDEX)?;
            let mut registrations = txn.open_table(REGISTRATIONS)?;
            let existing = index.get(key.as_str())?.map(|guard| guard.value());
            let (id, created) = match existing {
                Some(id) => (id, false),
                None => {
                    let mut meta = txn.open_table(META)?;
                    let id = meta.get(NEXT_ID_KEY)?.map(|guard| guard.value()).unwrap_or(1);
                    meta.insert(NEXT_ID_KEY, id + 1)?;
                    index.insert(key.as_str(), id)?;
                    (id, true)
                }
            };
            let record = RegistrationRecord {
                id,
                user_id: params.user_id,
                vendor: params.vendor.as_db_value().to_string(),
                owner: params.owner,
                repo: params.repo,
                token: params.token,
            };
            let data = serde_json::to_vec(&record)?;
            registrations.insert(id, data.as_slice())?;
            (record, created)
        };
        txn.commit()?;
        info!(id = record.id, created, "registration stored");
        Ok((record.into_registration()?, created))
    }

    /// Fetches a registration by id.
    pub fn get(&self, id: u64) -> StoreResult<Registration> {
        if id == 0 {
            return Err(StoreError::InvalidArgument("id must be positive"));
        }
        let txn = self.db.begin_read()?;
        let table = txn.open_table(REGISTRATIONS)?;
        let Some(guard) = table.get(id)? else {
            return Err(StoreError::NotFound(id));
        };
        let record: RegistrationRecord = serde_json::from_slice(guard.value())?;
        record.into_registration()
    }

    /// Lists a user's registrations ordered by display name ascending.
    pub fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<Registration>> {
        if user_id.is_empty() {
            return Err(StoreError::InvalidArgument("user id must not be empty"));
        }
        let mut registrations: Vec<Registration> = self
            .decode_all()?
            .into_iter()
            .filter(|registration| registration.user_id == user_id)
            .collect();
        registrations.sort_by(|a, b| a.display_name().cmp(&b.display_name()));
        Ok(registrations)
    }

    /// Number of registrations owned by `user_id`.
    pub fn count_for_user(&self, user_id: &str) -> StoreResult<usize> {
        Ok(self.list_for_user(user_id)?.len())
    }

    /// All registrations, in storage order. Intended for export and
    /// diagnostics only.
    pub fn list_all(&self) -> StoreResult<Vec<Registration>> {
        self.decode_all()
    }

    /// Deletes a registration and every index entry resolving to it. Deleting
    /// an id that does not exist is not an error.
    pub fn delete(&self, id: u64) -> StoreResult<()> {
        if id == 0 {
            return Err(StoreError::InvalidArgument("id must be positive"));
        }
        let txn = self.db.begin_write()?;
        {
            let mut registrations = txn.open_table(REGISTRATIONS)?;
            registrations.remove(id)?;
            // The index is keyed by business key, not id, so removal is a
            // reverse scan over its values.
            let mut index = txn.open_table(REGISTRATION_INDEX)?;
            let mut stale = Vec::new();
            for entry in index.iter()? {
                let (key, value) = entry?;
                if value.value() == id {
                    stale.push(key.value().to_string());
                }
            }
            for key in stale {
                index.remove(key.as_str())?;
            }
        }
        txn.commit()?;
        info!(id, "registration deleted");
        Ok(())
    }

    /// Removes every registration and index entry. The id sequence is not
    /// reset, so ids stay unique across the wipe. Mainly for tests and
    /// maintenance.
    pub fn delete_all(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(REGISTRATIONS)?;
        txn.delete_table(REGISTRATION_INDEX)?;
        {
            txn.open_table(REGISTRATIONS)?;
            txn.open_table(REGISTRATION_INDEX)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn decode_all(&self) -> StoreResult<Vec<Registration>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(REGISTRATIONS)?;
        let mut registrations = Vec::new();
        for entry in table.iter()? {
            let (id, data) = entry?;
            let record: RegistrationRecord = match serde_json::from_slice(data.value()) {
                Ok(record) => record,
                Err(error) => {
                    warn!(id = id.value(), %error, "skipping undecodable registration record");
                    continue;
                }
            };
            match record.into_registration() {
                Ok(registration) => registrations.push(registration),
                Err(error) => {
                    warn!(id = id.value(), %error, "skipping invalid registration record");
                }
            }
        }
        Ok(registrations)
    }
}

fn validate_component(value: &str, field: &'static str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidArgument("business key component must not be empty"));
    }
    if value.contains(KEY_DELIMITER) {
        warn!(field, "rejected business key component containing delimiter byte");
        return Err(StoreError::InvalidArgument(
            "business key component contains reserved delimiter",
        ));
    }
    Ok(())
}

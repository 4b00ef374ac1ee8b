//! Collaborative store contract.
//!
//! # Responsibility
//! - Define the object/group primitives the account and bootstrap services
//!   build on: groups with role grants, ordered lists, records, inbox items,
//!   profiles, roots and accounts.
//! - Keep storage details behind one seam so a replicated backend can stand
//!   in for the local SQLite one.
//!
//! # Invariants
//! - Every created value gets a fresh `CoId`.
//! - List operations preserve insertion order.
//! - Reads reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::account::{ProfileDraft, RoomyAccount, RoomyProfile, RoomyRoot};
use crate::model::covalue::{CoId, CoValueKind};
use crate::model::group::{GroupMember, Principal, Role};
use crate::model::inbox::InboxItem;
use crate::model::validation::ValidationError;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from collaborative store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Value failed schema validation before write.
    Validation(ValidationError),
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target value or group does not exist.
    NotFound(CoId),
    /// Target exists but has a different shape than the operation needs.
    KindMismatch {
        id: CoId,
        expected: &'static str,
        actual: CoValueKind,
    },
    /// Operation was asked to create a value of an unsuitable kind.
    UnsupportedKind(CoValueKind),
    /// Account root/profile is already populated and must not be replaced.
    AccountFieldAlreadySet { account: CoId, field: &'static str },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "covalue not found: {id}"),
            Self::KindMismatch {
                id,
                expected,
                actual,
            } => write!(
                f,
                "covalue {id} has kind {} but {expected} was expected",
                actual.as_str()
            ),
            Self::UnsupportedKind(kind) => {
                write!(f, "operation does not support kind {}", kind.as_str())
            }
            Self::AccountFieldAlreadySet { account, field } => {
                write!(f, "account {account} already has {field} set")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::InvalidData(message) => write!(f, "invalid persisted covalue data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store primitives consumed by services.
pub trait CoStore {
    /// Runs `f` atomically. Nested calls are not supported.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;

    fn create_group(&self) -> StoreResult<CoId>;
    /// Grants `role` to `principal`, replacing any earlier grant.
    fn add_member(&self, group: &CoId, principal: &Principal, role: Role) -> StoreResult<()>;
    fn group_members(&self, group: &CoId) -> StoreResult<Vec<GroupMember>>;

    /// Returns the kind of a stored value, or `None` when absent.
    fn value_kind(&self, id: &CoId) -> StoreResult<Option<CoValueKind>>;
    fn value_owner(&self, id: &CoId) -> StoreResult<Option<CoId>>;

    fn create_list(&self, kind: CoValueKind, owner: &CoId, items: &[CoId]) -> StoreResult<CoId>;
    fn list_items(&self, list: &CoId) -> StoreResult<Vec<CoId>>;
    fn push_list_item(&self, list: &CoId, item: &CoId) -> StoreResult<()>;
    /// Removes the first occurrence of `item`. Returns whether one was found.
    fn remove_list_item(&self, list: &CoId, item: &CoId) -> StoreResult<bool>;

    fn create_record(&self, owner: &CoId) -> StoreResult<CoId>;
    fn record_get(&self, record: &CoId, key: &str) -> StoreResult<Option<String>>;
    fn record_set(&self, record: &CoId, key: &str, value: &str) -> StoreResult<()>;
    fn record_entries(&self, record: &CoId) -> StoreResult<BTreeMap<String, String>>;

    /// Creates an empty last-read record. `None` owner means account-private.
    fn create_last_read_list(&self, owner: Option<&CoId>) -> StoreResult<CoId>;
    fn last_read_get(&self, record: &CoId, key: &str) -> StoreResult<Option<i64>>;
    fn last_read_set(&self, record: &CoId, key: &str, read_at: i64) -> StoreResult<()>;
    fn last_read_entries(&self, record: &CoId) -> StoreResult<BTreeMap<String, i64>>;

    fn create_inbox_item(&self, owner: &CoId, item: &InboxItem) -> StoreResult<CoId>;
    fn get_inbox_item(&self, id: &CoId) -> StoreResult<Option<InboxItem>>;
    fn set_inbox_item_read(&self, id: &CoId, read: bool) -> StoreResult<()>;

    fn create_root(&self, last_read: &CoId) -> StoreResult<RoomyRoot>;
    fn get_root(&self, id: &CoId) -> StoreResult<Option<RoomyRoot>>;

    fn create_profile(&self, owner: &CoId, draft: &ProfileDraft) -> StoreResult<RoomyProfile>;
    fn get_profile(&self, id: &CoId) -> StoreResult<Option<RoomyProfile>>;
    fn update_profile(&self, profile: &RoomyProfile) -> StoreResult<()>;

    /// Creates an account with unset root and profile.
    fn create_account(&self) -> StoreResult<RoomyAccount>;
    fn get_account(&self, id: &CoId) -> StoreResult<Option<RoomyAccount>>;
    fn set_account_root(&self, account: &CoId, root: &CoId) -> StoreResult<()>;
    fn set_account_profile(&self, account: &CoId, profile: &CoId) -> StoreResult<()>;
}

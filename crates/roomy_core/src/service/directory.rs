//! Deployment-wide directories backed by the bootstrapped singletons.
//!
//! # Responsibility
//! - Register accounts and spaces in the global id lists.
//! - Record and resolve space migrations in the migration reference.
//!
//! # Invariants
//! - Registration is idempotent: an id appears at most once per list.
//! - Operations fail with `MissingId` until the target is bootstrapped.

use crate::config::{ConfigError, DeploymentIds, DeploymentTarget};
use crate::model::account::{AccountCreation, MigratedAccount};
use crate::model::covalue::CoId;
use crate::repo::co_store::{CoStore, StoreError};
use crate::service::account_service::{create_migrated_account, AccountServiceError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors from directory operations.
#[derive(Debug)]
pub enum DirectoryError {
    Config(ConfigError),
    Account(AccountServiceError),
    Store(StoreError),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Account(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Account(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ConfigError> for DirectoryError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<AccountServiceError> for DirectoryError {
    fn from(value: AccountServiceError) -> Self {
        Self::Account(value)
    }
}

impl From<StoreError> for DirectoryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Directory operations over the configured singleton ids.
pub struct DirectoryService<S: CoStore> {
    store: S,
    ids: DeploymentIds,
}

impl<S: CoStore> DirectoryService<S> {
    pub fn new(store: S, ids: DeploymentIds) -> Self {
        Self { store, ids }
    }

    pub fn ids(&self) -> &DeploymentIds {
        &self.ids
    }

    /// Adds an account to the all-accounts list. Returns `false` if present.
    pub fn register_account(&self, account: &CoId) -> DirectoryResult<bool> {
        self.register(DeploymentTarget::AllAccountsList, account)
    }

    /// Creates a migrated account and appends it to the all-accounts list.
    ///
    /// Both writes commit together; nothing is created when registration
    /// fails.
    pub fn create_account(
        &self,
        creation: Option<&AccountCreation>,
    ) -> DirectoryResult<MigratedAccount> {
        let list = self.ids.require(DeploymentTarget::AllAccountsList)?;
        let account = self.store.transaction(|store| -> DirectoryResult<_> {
            let account = create_migrated_account(store, creation)?;
            store.push_list_item(list, &account.id)?;
            Ok(account)
        })?;
        debug!(
            "event=directory_register module=directory status=ok target={} id={}",
            DeploymentTarget::AllAccountsList,
            account.id
        );
        Ok(account)
    }

    /// Adds a space to the all-spaces list. Returns `false` if present.
    pub fn register_space(&self, space: &CoId) -> DirectoryResult<bool> {
        self.register(DeploymentTarget::AllSpacesList, space)
    }

    pub fn all_accounts(&self) -> DirectoryResult<Vec<CoId>> {
        let list = self.ids.require(DeploymentTarget::AllAccountsList)?;
        Ok(self.store.list_items(list)?)
    }

    pub fn all_spaces(&self) -> DirectoryResult<Vec<CoId>> {
        let list = self.ids.require(DeploymentTarget::AllSpacesList)?;
        Ok(self.store.list_items(list)?)
    }

    /// Records that `old_space` now lives at `new_space`, overwriting any
    /// earlier mapping.
    pub fn record_space_migration(&self, old_space: &str, new_space: &CoId) -> DirectoryResult<()> {
        let record = self.ids.require(DeploymentTarget::SpaceMigrationReference)?;
        self.store
            .record_set(record, old_space, new_space.as_str())?;
        debug!(
            "event=space_migration_record module=directory status=ok old_space={old_space} new_space={new_space}"
        );
        Ok(())
    }

    /// Looks up where `old_space` was migrated to.
    pub fn resolve_space_migration(&self, old_space: &str) -> DirectoryResult<Option<CoId>> {
        let record = self.ids.require(DeploymentTarget::SpaceMigrationReference)?;
        let Some(text) = self.store.record_get(record, old_space)? else {
            return Ok(None);
        };
        let id = CoId::parse(&text).map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid space id `{text}` in migration reference for `{old_space}`"
            ))
        })?;
        Ok(Some(id))
    }

    fn register(&self, target: DeploymentTarget, id: &CoId) -> DirectoryResult<bool> {
        let list = self.ids.require(target)?;
        let added = self.store.transaction(|store| -> DirectoryResult<bool> {
            if store.list_items(list)?.contains(id) {
                return Ok(false);
            }
            store.push_list_item(list, id)?;
            Ok(true)
        })?;
        if added {
            debug!("event=directory_register module=directory status=ok target={target} id={id}");
        }
        Ok(added)
    }
}

//! Account use-case service and migration hook.
//!
//! # Responsibility
//! - Create and load accounts, running the migration hook every time.
//! - Expose profile, joined-space, inbox and last-read operations on
//!   migrated accounts.
//!
//! # Invariants
//! - The hook sets `root` before `profile`, each only while unset.
//! - A second hook run on the same account changes nothing.
//! - Hook writes happen inside one store transaction.

use crate::model::account::{
    AccountCreation, MigratedAccount, ProfileDraft, ProfileUpdate, RoomyAccount, RoomyProfile,
};
use crate::model::covalue::CoId;
use crate::model::group::Role;
use crate::model::inbox::{InboxItem, StoredInboxItem};
use crate::repo::co_store::{CoStore, StoreError};
use crate::service::helpers::{create_entity_list, create_inbox, create_space_list, public_group};
use log::{debug, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AccountResult<T> = Result<T, AccountServiceError>;

/// Errors from account service operations.
#[derive(Debug)]
pub enum AccountServiceError {
    /// Account id does not exist.
    AccountNotFound(CoId),
    /// Account points at a root/profile that is missing from the store.
    DanglingReference {
        account: CoId,
        field: &'static str,
        target: CoId,
    },
    /// Inbox item is not part of this account's inbox.
    InboxItemNotFound(CoId),
    /// Store-level failure.
    Store(StoreError),
}

impl Display for AccountServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountNotFound(id) => write!(f, "account not found: {id}"),
            Self::DanglingReference {
                account,
                field,
                target,
            } => write!(f, "account {account} references missing {field} {target}"),
            Self::InboxItemNotFound(id) => write!(f, "inbox item not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for AccountServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// What one hook run populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub root_created: bool,
    pub profile_created: bool,
}

impl MigrationOutcome {
    pub fn is_noop(&self) -> bool {
        !self.root_created && !self.profile_created
    }
}

/// Use-case service for accounts on top of a collaborative store.
pub struct AccountService<S: CoStore> {
    store: S,
}

impl<S: CoStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new account and populates it through the migration hook.
    ///
    /// # Contract
    /// - Profile name is `creation.name`, or `Anonymous` when absent.
    /// - Returned account has both root and profile set.
    pub fn create_account(
        &self,
        creation: Option<&AccountCreation>,
    ) -> AccountResult<MigratedAccount> {
        self.store
            .transaction(|store| create_migrated_account(store, creation))
    }

    /// Loads an account, running the migration hook first.
    ///
    /// `creation` only matters when the profile is still unset.
    pub fn load_account(
        &self,
        id: &CoId,
        creation: Option<&AccountCreation>,
    ) -> AccountResult<MigratedAccount> {
        Ok(self.load_with_outcome(id, creation)?.0)
    }

    /// Runs the migration hook on an existing account and reports what it
    /// populated.
    pub fn migrate_account(
        &self,
        id: &CoId,
        creation: Option<&AccountCreation>,
    ) -> AccountResult<MigrationOutcome> {
        Ok(self.load_with_outcome(id, creation)?.1)
    }

    /// Returns the raw account without running the hook.
    pub fn get_account(&self, id: &CoId) -> AccountResult<Option<RoomyAccount>> {
        Ok(self.store.get_account(id)?)
    }

    /// Applies a partial profile update.
    pub fn update_profile(
        &self,
        account: &CoId,
        update: &ProfileUpdate,
    ) -> AccountResult<RoomyProfile> {
        let mut profile = self.load_account(account, None)?.profile;
        if update.is_empty() {
            return Ok(profile);
        }
        update.apply_to(&mut profile).map_err(StoreError::from)?;
        self.store.update_profile(&profile)?;
        Ok(profile)
    }

    /// Appends a space to the joined-spaces list.
    ///
    /// Returns `false` when the space was already joined.
    pub fn join_space(&self, account: &CoId, space: &CoId) -> AccountResult<bool> {
        let list = self.load_account(account, None)?.profile.joined_spaces;
        let joined = self.store.transaction(|store| -> AccountResult<bool> {
            if store.list_items(&list)?.contains(space) {
                return Ok(false);
            }
            store.push_list_item(&list, space)?;
            Ok(true)
        })?;
        if joined {
            debug!("event=space_join module=account status=ok account={account} space={space}");
        }
        Ok(joined)
    }

    /// Removes a space from the joined-spaces list.
    ///
    /// Returns `false` when the space was not joined.
    pub fn leave_space(&self, account: &CoId, space: &CoId) -> AccountResult<bool> {
        let list = self.load_account(account, None)?.profile.joined_spaces;
        Ok(self.store.remove_list_item(&list, space)?)
    }

    /// Joined spaces in join order.
    pub fn joined_spaces(&self, account: &CoId) -> AccountResult<Vec<CoId>> {
        let list = self.load_account(account, None)?.profile.joined_spaces;
        Ok(self.store.list_items(&list)?)
    }

    /// Appends an item to the account's inbox.
    ///
    /// The item is owned by the inbox's group so other writers can add to it.
    pub fn push_inbox_item(&self, account: &CoId, item: &InboxItem) -> AccountResult<CoId> {
        let inbox = self.load_account(account, None)?.profile.roomy_inbox;
        let owner = self
            .store
            .value_owner(&inbox)?
            .ok_or_else(|| StoreError::InvalidData(format!("inbox {inbox} has no owner group")))?;

        let id = self.store.transaction(|store| -> AccountResult<CoId> {
            let id = store.create_inbox_item(&owner, item)?;
            store.push_list_item(&inbox, &id)?;
            Ok(id)
        })?;
        debug!(
            "event=inbox_push module=account status=ok account={} item={} type={}",
            account, id, item.kind
        );
        Ok(id)
    }

    /// Inbox items in arrival order.
    pub fn list_inbox(&self, account: &CoId) -> AccountResult<Vec<StoredInboxItem>> {
        let inbox = self.load_account(account, None)?.profile.roomy_inbox;
        let mut items = Vec::new();
        for id in self.store.list_items(&inbox)? {
            let item = self
                .store
                .get_inbox_item(&id)?
                .ok_or_else(|| AccountServiceError::InboxItemNotFound(id.clone()))?;
            items.push(StoredInboxItem { id, item });
        }
        Ok(items)
    }

    /// Sets the read flag on one inbox item.
    pub fn mark_inbox_item_read(
        &self,
        account: &CoId,
        item: &CoId,
        read: bool,
    ) -> AccountResult<()> {
        let inbox = self.load_account(account, None)?.profile.roomy_inbox;
        if !self.store.list_items(&inbox)?.contains(item) {
            return Err(AccountServiceError::InboxItemNotFound(item.clone()));
        }
        self.store.set_inbox_item_read(item, read)?;
        Ok(())
    }

    /// Counts items whose read flag is unset or `false`.
    pub fn unread_count(&self, account: &CoId) -> AccountResult<usize> {
        Ok(self
            .list_inbox(account)?
            .iter()
            .filter(|stored| !stored.item.is_read())
            .count())
    }

    /// Records the last-read timestamp (epoch ms) for a room/channel.
    pub fn set_last_read(&self, account: &CoId, key: &str, read_at: i64) -> AccountResult<()> {
        let record = self.load_account(account, None)?.root.last_read;
        self.store.last_read_set(&record, key, read_at)?;
        Ok(())
    }

    pub fn last_read(&self, account: &CoId, key: &str) -> AccountResult<Option<i64>> {
        let record = self.load_account(account, None)?.root.last_read;
        Ok(self.store.last_read_get(&record, key)?)
    }

    pub fn last_read_entries(&self, account: &CoId) -> AccountResult<BTreeMap<String, i64>> {
        let record = self.load_account(account, None)?.root.last_read;
        Ok(self.store.last_read_entries(&record)?)
    }

    fn load_with_outcome(
        &self,
        id: &CoId,
        creation: Option<&AccountCreation>,
    ) -> AccountResult<(MigratedAccount, MigrationOutcome)> {
        let (account, outcome) = self.store.transaction(|store| -> AccountResult<_> {
            let account = store
                .get_account(id)?
                .ok_or_else(|| AccountServiceError::AccountNotFound(id.clone()))?;
            run_migration(store, &account, creation)
        })?;
        if !outcome.is_noop() {
            info!(
                "event=account_migrate module=account status=ok account={} root_created={} profile_created={}",
                account.id, outcome.root_created, outcome.profile_created
            );
        }
        Ok((account, outcome))
    }
}

/// Creates an account and runs the hook on it. Callers own the transaction.
pub(crate) fn create_migrated_account<S: CoStore>(
    store: &S,
    creation: Option<&AccountCreation>,
) -> AccountResult<MigratedAccount> {
    let account = store.create_account()?;
    let (account, outcome) = run_migration(store, &account, creation)?;
    info!(
        "event=account_create module=account status=ok account={} root_created={} profile_created={}",
        account.id, outcome.root_created, outcome.profile_created
    );
    Ok(account)
}

/// Fills unset account fields with defaults and returns the populated view.
fn run_migration<S: CoStore>(
    store: &S,
    account: &RoomyAccount,
    creation: Option<&AccountCreation>,
) -> AccountResult<(MigratedAccount, MigrationOutcome)> {
    let mut outcome = MigrationOutcome::default();

    let root_id = match &account.root {
        Some(id) => id.clone(),
        None => {
            let last_read = store.create_last_read_list(None)?;
            let root = store.create_root(&last_read)?;
            store.set_account_root(&account.id, &root.id)?;
            outcome.root_created = true;
            root.id
        }
    };

    let profile_id = match &account.profile {
        Some(id) => id.clone(),
        None => {
            let draft = ProfileDraft {
                name: AccountCreation::profile_name(creation),
                joined_spaces: create_space_list(store)?,
                roomy_inbox: create_inbox(store)?,
                new_joined_spaces_test: create_entity_list(store)?,
            };
            let owner = public_group(store, Role::Reader)?;
            let profile = store.create_profile(&owner, &draft)?;
            store.set_account_profile(&account.id, &profile.id)?;
            outcome.profile_created = true;
            profile.id
        }
    };

    let root = store
        .get_root(&root_id)?
        .ok_or_else(|| AccountServiceError::DanglingReference {
            account: account.id.clone(),
            field: "root",
            target: root_id.clone(),
        })?;
    let profile =
        store
            .get_profile(&profile_id)?
            .ok_or_else(|| AccountServiceError::DanglingReference {
                account: account.id.clone(),
                field: "profile",
                target: profile_id.clone(),
            })?;

    Ok((
        MigratedAccount {
            id: account.id.clone(),
            profile,
            root,
        },
        outcome,
    ))
}

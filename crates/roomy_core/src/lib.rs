//! Core account and schema logic for Roomy.
//!
//! Declares the account/profile/inbox schemas, runs the account migration
//! hook, and creates the deployment's global singleton values on top of a
//! collaborative store.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DeploymentIds, DeploymentTarget, DEFAULT_IDS_FILE_NAME};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::account::{
    AccountCreation, MigratedAccount, ProfileUpdate, RoomyAccount, RoomyProfile, RoomyRoot,
    DEFAULT_PROFILE_NAME,
};
pub use model::covalue::{CoId, CoValueKind};
pub use model::group::{GroupMember, Principal, Role};
pub use model::inbox::{InboxItem, InboxItemType, StoredInboxItem};
pub use model::validation::ValidationError;
pub use repo::co_store::{CoStore, StoreError, StoreResult};
pub use repo::sqlite_store::SqliteCoStore;
pub use service::account_service::{
    AccountResult, AccountService, AccountServiceError, MigrationOutcome,
};
pub use service::bootstrap::{
    create_all_accounts_list, create_all_spaces_list, create_space_migration_reference,
    ensure_deployment_ids, BootstrapError, BootstrapReport, BootstrapResult,
};
pub use service::directory::{DirectoryError, DirectoryResult, DirectoryService};
pub use service::helpers::{create_inbox, create_space_list, public_group};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

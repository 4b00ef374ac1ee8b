//! Run-once creation of a deployment's global singleton values.
//!
//! # Responsibility
//! - Create the all-spaces list, the all-accounts list and the space
//!   migration reference.
//! - Report each new id so operators can record it in `DeploymentIds`.
//!
//! # Invariants
//! - Every call to a `create_*` function yields a new, distinct id.
//! - `ensure_deployment_ids` never recreates a configured id.

use crate::config::{DeploymentIds, DeploymentTarget};
use crate::model::covalue::{CoId, CoValueKind};
use crate::model::group::{Principal, Role};
use crate::repo::co_store::{CoStore, StoreError};
use crate::service::helpers::public_group;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BootstrapResult<T> = Result<T, BootstrapError>;

/// Errors from bootstrap operations.
#[derive(Debug)]
pub enum BootstrapError {
    /// Configured id does not exist in the store.
    ConfiguredIdMissing { target: DeploymentTarget, id: CoId },
    /// Configured id exists with an unexpected kind.
    ConfiguredIdKindMismatch {
        target: DeploymentTarget,
        id: CoId,
        actual: CoValueKind,
    },
    Store(StoreError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfiguredIdMissing { target, id } => {
                write!(f, "configured {target} `{id}` does not exist")
            }
            Self::ConfiguredIdKindMismatch { target, id, actual } => write!(
                f,
                "configured {target} `{id}` has kind {} but {} was expected",
                actual.as_str(),
                target_kind(*target).as_str()
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for BootstrapError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Result of `ensure_deployment_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Targets created during this run, in creation order.
    pub created: Vec<(DeploymentTarget, CoId)>,
    /// Targets that were already configured and verified.
    pub reused: Vec<(DeploymentTarget, CoId)>,
}

/// Creates the directory of all spaces, write-only for everyone.
pub fn create_all_spaces_list<S: CoStore>(store: &S) -> BootstrapResult<CoId> {
    create_target(store, DeploymentTarget::AllSpacesList)
}

/// Creates the directory of all accounts, write-only for everyone.
pub fn create_all_accounts_list<S: CoStore>(store: &S) -> BootstrapResult<CoId> {
    create_target(store, DeploymentTarget::AllAccountsList)
}

/// Creates the old-space to new-space reference record, writable by everyone.
pub fn create_space_migration_reference<S: CoStore>(store: &S) -> BootstrapResult<CoId> {
    create_target(store, DeploymentTarget::SpaceMigrationReference)
}

/// Creates whichever targets are missing from `ids` and verifies the rest.
///
/// Every configured id is verified before anything is created, and all
/// creations commit in one store transaction, so a failed run writes nothing.
/// `ids` is updated in place only when the run succeeds.
pub fn ensure_deployment_ids<S: CoStore>(
    store: &S,
    ids: &mut DeploymentIds,
) -> BootstrapResult<BootstrapReport> {
    let mut report = BootstrapReport::default();
    let mut missing = Vec::new();
    for target in DeploymentTarget::ALL {
        match ids.get(target) {
            Some(id) => {
                verify_configured(store, target, id)?;
                report.reused.push((target, id.clone()));
            }
            None => missing.push(target),
        }
    }

    report.created = store.transaction(|store| -> BootstrapResult<_> {
        missing
            .iter()
            .map(|target| -> BootstrapResult<(DeploymentTarget, CoId)> {
                Ok((*target, create_target(store, *target)?))
            })
            .collect()
    })?;
    for (target, id) in &report.created {
        ids.set(*target, id.clone());
    }

    info!(
        "event=bootstrap_ensure module=bootstrap status=ok created={} reused={}",
        report.created.len(),
        report.reused.len()
    );
    Ok(report)
}

/// Expected stored kind of a deployment target.
pub fn target_kind(target: DeploymentTarget) -> CoValueKind {
    match target {
        DeploymentTarget::AllSpacesList | DeploymentTarget::AllAccountsList => CoValueKind::IdList,
        DeploymentTarget::SpaceMigrationReference => CoValueKind::StringRecord,
    }
}

fn create_target<S: CoStore>(store: &S, target: DeploymentTarget) -> BootstrapResult<CoId> {
    let created = match target {
        DeploymentTarget::AllSpacesList | DeploymentTarget::AllAccountsList => {
            create_write_only_id_list(store)
        }
        DeploymentTarget::SpaceMigrationReference => public_group(store, Role::Writer)
            .and_then(|group| store.create_record(&group)),
    };

    match created {
        Ok(id) => {
            info!("event=bootstrap_create module=bootstrap status=ok target={target} id={id}");
            Ok(id)
        }
        Err(err) => {
            error!(
                "event=bootstrap_create module=bootstrap status=error target={target} error={err}"
            );
            Err(err.into())
        }
    }
}

fn create_write_only_id_list<S: CoStore>(store: &S) -> Result<CoId, StoreError> {
    let group = store.create_group()?;
    store.add_member(&group, &Principal::Everyone, Role::WriteOnly)?;
    store.create_list(CoValueKind::IdList, &group, &[])
}

fn verify_configured<S: CoStore>(
    store: &S,
    target: DeploymentTarget,
    id: &CoId,
) -> BootstrapResult<()> {
    match store.value_kind(id)? {
        None => Err(BootstrapError::ConfiguredIdMissing {
            target,
            id: id.clone(),
        }),
        Some(actual) if actual != target_kind(target) => {
            Err(BootstrapError::ConfiguredIdKindMismatch {
                target,
                id: id.clone(),
                actual,
            })
        }
        Some(_) => Ok(()),
    }
}

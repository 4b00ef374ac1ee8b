//! Deployment identifier configuration.
//!
//! # Responsibility
//! - Persist the ids of the global singleton values (all-spaces list,
//!   all-accounts list, space migration reference) created by bootstrap.
//! - Hand those ids to services at startup.
//!
//! # Invariants
//! - A missing file loads as an empty configuration.
//! - Every id in a loaded file is a well-formed `CoId`.
//! - Saving replaces the file atomically (temp file + rename).

use crate::model::covalue::CoId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default file name for persisted deployment ids.
pub const DEFAULT_IDS_FILE_NAME: &str = "ids.json";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Global singleton values a deployment depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentTarget {
    AllSpacesList,
    AllAccountsList,
    SpaceMigrationReference,
}

impl DeploymentTarget {
    pub const ALL: [Self; 3] = [
        Self::AllSpacesList,
        Self::AllAccountsList,
        Self::SpaceMigrationReference,
    ];

    /// Operator-facing label, matching the JSON key.
    pub fn label(self) -> &'static str {
        match self {
            Self::AllSpacesList => "allSpacesList",
            Self::AllAccountsList => "allAccountsList",
            Self::SpaceMigrationReference => "spaceMigrationReference",
        }
    }
}

impl Display for DeploymentTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted ids of the deployment's global singleton values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_spaces_list: Option<CoId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_accounts_list: Option<CoId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_migration_reference: Option<CoId>,
}

impl DeploymentIds {
    /// Loads ids from a JSON file. A missing file yields empty ids.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes ids as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut body = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        body.push('\n');

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, body).map_err(io_err)?;
        std::fs::rename(&tmp_path, path).map_err(io_err)?;
        Ok(())
    }

    pub fn get(&self, target: DeploymentTarget) -> Option<&CoId> {
        match target {
            DeploymentTarget::AllSpacesList => self.all_spaces_list.as_ref(),
            DeploymentTarget::AllAccountsList => self.all_accounts_list.as_ref(),
            DeploymentTarget::SpaceMigrationReference => self.space_migration_reference.as_ref(),
        }
    }

    /// Returns the configured id or `MissingId`.
    pub fn require(&self, target: DeploymentTarget) -> ConfigResult<&CoId> {
        self.get(target).ok_or(ConfigError::MissingId(target))
    }

    pub fn set(&mut self, target: DeploymentTarget, id: CoId) {
        let slot = match target {
            DeploymentTarget::AllSpacesList => &mut self.all_spaces_list,
            DeploymentTarget::AllAccountsList => &mut self.all_accounts_list,
            DeploymentTarget::SpaceMigrationReference => &mut self.space_migration_reference,
        };
        *slot = Some(id);
    }

    pub fn is_complete(&self) -> bool {
        DeploymentTarget::ALL
            .iter()
            .all(|target| self.get(*target).is_some())
    }
}

/// Deployment configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Operation needs an id that was never bootstrapped.
    MissingId(DeploymentTarget),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to access `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "invalid deployment ids in `{}`: {source}", path.display())
            }
            Self::MissingId(target) => write!(f, "deployment id `{target}` is not configured"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::MissingId(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DeploymentIds, DeploymentTarget};
    use crate::model::covalue::CoId;

    #[test]
    fn missing_file_loads_empty_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ids = DeploymentIds::load(dir.path().join("absent.json")).expect("load");
        assert_eq!(ids, DeploymentIds::default());
        assert!(!ids.is_complete());
    }

    #[test]
    fn save_then_load_keeps_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("ids.json");

        let mut ids = DeploymentIds::default();
        for target in DeploymentTarget::ALL {
            ids.set(target, CoId::generate());
        }
        ids.save(&path).expect("save");

        let loaded = DeploymentIds::load(&path).expect("load");
        assert_eq!(loaded, ids);
        assert!(loaded.is_complete());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn json_uses_camel_case_labels() {
        let mut ids = DeploymentIds::default();
        ids.set(
            DeploymentTarget::AllSpacesList,
            CoId::parse("co_zSpaces1").expect("id"),
        );
        let json = serde_json::to_string(&ids).expect("serialize");
        assert_eq!(json, r#"{"allSpacesList":"co_zSpaces1"}"#);
    }

    #[test]
    fn malformed_ids_are_rejected_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ids.json");
        std::fs::write(&path, r#"{"allAccountsList":"not-an-id"}"#).expect("write");

        let err = DeploymentIds::load(&path).expect_err("malformed id must fail");
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn require_reports_missing_target() {
        let ids = DeploymentIds::default();
        let err = ids
            .require(DeploymentTarget::SpaceMigrationReference)
            .expect_err("missing id");
        assert!(matches!(
            err,
            ConfigError::MissingId(DeploymentTarget::SpaceMigrationReference)
        ));
        assert!(err.to_string().contains("spaceMigrationReference"));
    }
}

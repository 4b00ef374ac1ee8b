//! Account, profile and root schemas.
//!
//! # Responsibility
//! - Describe the per-account public profile and private root state.
//! - Model the unset-until-migrated account fields and the fully populated
//!   view produced by migration.
//!
//! # Invariants
//! - `RoomyAccount.root` and `RoomyAccount.profile` move from `None` to
//!   `Some` exactly once and never back.
//! - A profile name is never blank.

use crate::model::covalue::CoId;
use crate::model::validation::{require_non_blank, ValidationError};
use serde::{Deserialize, Serialize};

/// Profile name used when an account is created without one.
pub const DEFAULT_PROFILE_NAME: &str = "Anonymous";

/// Properties supplied when an account is first created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreation {
    pub name: Option<String>,
}

impl AccountCreation {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Resolves the initial profile name: the supplied name as given, or
    /// `Anonymous` when none was supplied. Blank names are rejected later by
    /// `ProfileDraft::validate`.
    pub fn profile_name(creation: Option<&Self>) -> String {
        creation
            .and_then(|props| props.name.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string())
    }
}

/// Public profile of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomyProfile {
    pub id: CoId,
    /// Group the profile is shared through.
    pub owner_group: CoId,
    pub name: String,
    pub image_url: Option<String>,
    pub bluesky_handle: Option<String>,
    pub banner_url: Option<String>,
    pub description: Option<String>,
    /// Unix epoch milliseconds.
    pub joined_date: Option<i64>,
    /// `SpaceList` in join order.
    pub joined_spaces: CoId,
    pub roomy_inbox: CoId,
    pub new_joined_spaces_test: CoId,
}

/// Field values for a profile that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDraft {
    pub name: String,
    pub joined_spaces: CoId,
    pub roomy_inbox: CoId,
    pub new_joined_spaces_test: CoId,
}

impl ProfileDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("profile name", &self.name)
    }
}

/// Partial profile update. `None` leaves a field untouched; `Some(None)`
/// clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub image_url: Option<Option<String>>,
    pub bluesky_handle: Option<Option<String>>,
    pub banner_url: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub joined_date: Option<Option<i64>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies the update to a loaded profile.
    pub fn apply_to(&self, profile: &mut RoomyProfile) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            require_non_blank("profile name", name)?;
            profile.name = name.to_string();
        }
        if let Some(value) = &self.image_url {
            profile.image_url = value.clone();
        }
        if let Some(value) = &self.bluesky_handle {
            profile.bluesky_handle = value.clone();
        }
        if let Some(value) = &self.banner_url {
            profile.banner_url = value.clone();
        }
        if let Some(value) = &self.description {
            profile.description = value.clone();
        }
        if let Some(value) = self.joined_date {
            profile.joined_date = value;
        }
        Ok(())
    }
}

/// Private per-account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomyRoot {
    pub id: CoId,
    /// `LastReadList` keyed by room/channel id.
    pub last_read: CoId,
}

/// Account as loaded from storage, before or after migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomyAccount {
    pub id: CoId,
    pub profile: Option<CoId>,
    pub root: Option<CoId>,
}

impl RoomyAccount {
    pub fn is_migrated(&self) -> bool {
        self.profile.is_some() && self.root.is_some()
    }
}

/// Account with both root and profile populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedAccount {
    pub id: CoId,
    pub profile: RoomyProfile,
    pub root: RoomyRoot,
}

//! Collaborative value identity and kinds.
//!
//! # Responsibility
//! - Define the opaque identifier shared by every stored object.
//! - Enumerate the object shapes the store knows how to hold.
//!
//! # Invariants
//! - Every `CoId` starts with `co_z` followed by at least one ASCII
//!   alphanumeric character.
//! - Freshly generated ids never repeat across invocations.

use crate::model::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const CO_ID_PREFIX: &str = "co_z";

static CO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^co_z[0-9A-Za-z]+$").expect("valid covalue id regex"));

/// Identifier of a collaborative value (list, record, map, group or account).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoId(String);

impl CoId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(format!("{CO_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Parses an identifier recorded elsewhere (config files, persisted rows).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if !CO_ID_RE.is_match(trimmed) {
            return Err(ValidationError::MalformedId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CoId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Shape of a stored collaborative value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoValueKind {
    /// Flat list of ids (global directories such as all-spaces).
    IdList,
    /// Joined spaces of one profile, in join order.
    SpaceList,
    /// Inbox list of one profile.
    InboxList,
    /// List of externally defined entities.
    EntityList,
    /// String-to-string record.
    StringRecord,
    /// Room key to last-read timestamp record.
    LastReadList,
    InboxItem,
    Profile,
    Root,
    Account,
}

impl CoValueKind {
    /// Stable string stored in `co_values.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdList => "id_list",
            Self::SpaceList => "space_list",
            Self::InboxList => "inbox_list",
            Self::EntityList => "entity_list",
            Self::StringRecord => "string_record",
            Self::LastReadList => "last_read_list",
            Self::InboxItem => "inbox_item",
            Self::Profile => "profile",
            Self::Root => "root",
            Self::Account => "account",
        }
    }

    /// Parses a stored kind string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id_list" => Some(Self::IdList),
            "space_list" => Some(Self::SpaceList),
            "inbox_list" => Some(Self::InboxList),
            "entity_list" => Some(Self::EntityList),
            "string_record" => Some(Self::StringRecord),
            "last_read_list" => Some(Self::LastReadList),
            "inbox_item" => Some(Self::InboxItem),
            "profile" => Some(Self::Profile),
            "root" => Some(Self::Root),
            "account" => Some(Self::Account),
            _ => None,
        }
    }

    /// Returns whether values of this kind hold ordered items.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::IdList | Self::SpaceList | Self::InboxList | Self::EntityList
        )
    }
}

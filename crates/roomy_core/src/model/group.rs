//! Permission group roles and principals.
//!
//! Groups own collaborative values. The store records which principal holds
//! which role in a group; enforcing those roles belongs to the sync layer.

use crate::model::covalue::CoId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Role granted to a principal inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "reader")]
    Reader,
    #[serde(rename = "writer")]
    Writer,
    /// May append but not read other members' content.
    #[serde(rename = "writeOnly")]
    WriteOnly,
    /// Never granted here. Kept so grants made through the external group
    /// model read back instead of failing to parse.
    #[serde(rename = "admin")]
    Admin,
}

/// Role string for read access.
pub const ROLE_READER: &str = "reader";
/// Role string for read/write access.
pub const ROLE_WRITER: &str = "writer";
/// Role string for append-only access.
pub const ROLE_WRITE_ONLY: &str = "writeOnly";
/// Role string for group administration.
pub const ROLE_ADMIN: &str = "admin";

/// Principal string for the universal principal.
pub const PRINCIPAL_EVERYONE: &str = "everyone";

impl Role {
    /// Stable string id used in storage and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reader => ROLE_READER,
            Self::Writer => ROLE_WRITER,
            Self::WriteOnly => ROLE_WRITE_ONLY,
            Self::Admin => ROLE_ADMIN,
        }
    }

    /// Parses one role. Matching is case-sensitive.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim() {
            ROLE_READER => Ok(Self::Reader),
            ROLE_WRITER => Ok(Self::Writer),
            ROLE_WRITE_ONLY => Ok(Self::WriteOnly),
            ROLE_ADMIN => Ok(Self::Admin),
            other => Err(ValidationError::UnknownRole(other.to_string())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Member of a group: either one account or everyone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    Everyone,
    Account(CoId),
}

impl Principal {
    /// Stable string stored in `co_group_members.principal`.
    pub fn to_storage(&self) -> String {
        match self {
            Self::Everyone => PRINCIPAL_EVERYONE.to_string(),
            Self::Account(id) => id.to_string(),
        }
    }

    /// Parses a stored principal string.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed == PRINCIPAL_EVERYONE {
            return Ok(Self::Everyone);
        }
        CoId::parse(trimmed)
            .map(Self::Account)
            .map_err(|_| ValidationError::UnknownPrincipal(value.to_string()))
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Everyone => f.write_str(PRINCIPAL_EVERYONE),
            Self::Account(id) => write!(f, "{id}"),
        }
    }
}

/// One role grant inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub principal: Principal,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::{Principal, Role};
    use crate::model::covalue::CoId;
    use crate::model::validation::ValidationError;

    #[test]
    fn parses_all_supported_roles() {
        assert_eq!(Role::parse("reader").expect("reader"), Role::Reader);
        assert_eq!(Role::parse("writer").expect("writer"), Role::Writer);
        assert_eq!(Role::parse("writeOnly").expect("writeOnly"), Role::WriteOnly);
        assert_eq!(Role::parse("admin").expect("admin"), Role::Admin);
    }

    #[test]
    fn rejects_unknown_or_recased_roles() {
        let err = Role::parse("writeonly").expect_err("wrong case must fail");
        assert_eq!(err, ValidationError::UnknownRole("writeonly".to_string()));
        assert!(Role::parse("owner").is_err());
    }

    #[test]
    fn role_serializes_with_toolkit_spelling() {
        let json = serde_json::to_string(&Role::WriteOnly).expect("serialize role");
        assert_eq!(json, "\"writeOnly\"");
    }

    #[test]
    fn principal_round_trips_through_storage_string() {
        assert_eq!(
            Principal::parse("everyone").expect("everyone"),
            Principal::Everyone
        );
        let account = CoId::generate();
        let principal = Principal::Account(account.clone());
        assert_eq!(
            Principal::parse(&principal.to_storage()).expect("account principal"),
            principal
        );
        assert!(matches!(
            Principal::parse("nobody"),
            Err(ValidationError::UnknownPrincipal(_))
        ));
    }
}

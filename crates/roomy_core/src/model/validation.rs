//! Schema validation errors shared by all model types.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failures raised before any value reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required string field is empty after trim.
    BlankField(&'static str),
    /// Inbox item type is neither `reply` nor `mention`.
    UnknownInboxItemType(String),
    /// Identifier does not match the `co_z...` shape.
    MalformedId(String),
    /// Role string is not one of the supported roles.
    UnknownRole(String),
    /// Principal string is neither `everyone` nor a valid id.
    UnknownPrincipal(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::UnknownInboxItemType(value) => write!(
                f,
                "unsupported inbox item type `{value}`; expected reply|mention"
            ),
            Self::MalformedId(value) => write!(f, "malformed covalue id `{value}`"),
            Self::UnknownRole(value) => write!(
                f,
                "unsupported role `{value}`; expected reader|writer|writeOnly|admin"
            ),
            Self::UnknownPrincipal(value) => write!(f, "unsupported principal `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Rejects empty or whitespace-only required strings.
pub(crate) fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

//! Inbox item schema.
//!
//! # Invariants
//! - `space_id` and `message_id` are required and non-blank.
//! - `kind` is either `reply` or `mention`; nothing else is representable.
//! - `read = None` means unread.

use crate::model::covalue::CoId;
use crate::model::validation::{require_non_blank, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Why an item landed in an inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxItemType {
    /// Someone replied to one of the account's messages.
    Reply,
    /// Someone mentioned the account.
    Mention,
}

impl InboxItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::Mention => "mention",
        }
    }

    /// Parses an item type. Only the two lowercase spellings are accepted.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "reply" => Ok(Self::Reply),
            "mention" => Ok(Self::Mention),
            other => Err(ValidationError::UnknownInboxItemType(other.to_string())),
        }
    }
}

impl Display for InboxItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InboxItemType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Notification pointing at a message inside a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxItem {
    pub space_id: String,
    /// Channel or thread holding the message, when known.
    pub object_id: Option<String>,
    pub message_id: String,
    pub read: Option<bool>,
    #[serde(rename = "type")]
    pub kind: InboxItemType,
}

impl InboxItem {
    /// Creates an unread item.
    pub fn new(
        space_id: impl Into<String>,
        message_id: impl Into<String>,
        kind: InboxItemType,
    ) -> Self {
        Self {
            space_id: space_id.into(),
            object_id: None,
            message_id: message_id.into(),
            read: None,
            kind,
        }
    }

    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Validates required fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("inbox item space_id", &self.space_id)?;
        require_non_blank("inbox item message_id", &self.message_id)?;
        if let Some(object_id) = self.object_id.as_deref() {
            require_non_blank("inbox item object_id", object_id)?;
        }
        Ok(())
    }

    pub fn is_read(&self) -> bool {
        self.read.unwrap_or(false)
    }
}

/// Inbox item as stored, with its own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredInboxItem {
    pub id: CoId,
    pub item: InboxItem,
}

#[cfg(test)]
mod tests {
    use super::{InboxItem, InboxItemType};
    use crate::model::validation::ValidationError;

    #[test]
    fn parses_only_reply_and_mention() {
        assert_eq!(InboxItemType::parse("reply").expect("reply"), InboxItemType::Reply);
        assert_eq!(
            InboxItemType::parse("mention").expect("mention"),
            InboxItemType::Mention
        );
        for other in ["", "Reply", "MENTION", "like", "reaction"] {
            let err = InboxItemType::parse(other).expect_err("other types must fail");
            assert_eq!(err, ValidationError::UnknownInboxItemType(other.to_string()));
        }
    }

    #[test]
    fn deserializing_unknown_type_fails() {
        let json = r#"{"spaceId":"s","objectId":null,"messageId":"m","read":null,"type":"like"}"#;
        assert!(serde_json::from_str::<InboxItem>(json).is_err());

        let json = r#"{"spaceId":"s","objectId":null,"messageId":"m","read":null,"type":"mention"}"#;
        let item: InboxItem = serde_json::from_str(json).expect("mention item parses");
        assert_eq!(item.kind, InboxItemType::Mention);
        assert!(!item.is_read());
    }

    #[test]
    fn validate_rejects_blank_required_fields() {
        let item = InboxItem::new(" ", "m1", InboxItemType::Reply);
        assert_eq!(
            item.validate(),
            Err(ValidationError::BlankField("inbox item space_id"))
        );

        let item = InboxItem::new("s1", "", InboxItemType::Reply);
        assert_eq!(
            item.validate(),
            Err(ValidationError::BlankField("inbox item message_id"))
        );

        let item = InboxItem::new("s1", "m1", InboxItemType::Mention).with_object_id("c1");
        assert!(item.validate().is_ok());
    }
}

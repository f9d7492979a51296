//! Structured forms of the service's string-encoded records.
//!
//! The service encodes shares as `"user/path"` and chat messages as
//! `"sender:text"`. Both are split at the first separator only, so the path or
//! text half may itself contain the separator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Separator between the sharing user and the shared path.
pub const SHARE_SEPARATOR: char = '/';
/// Separator between a message's sender and its text.
pub const MESSAGE_SEPARATOR: char = ':';

/// A path some other user shared with the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareRecord {
    /// Username of the sharing user.
    pub owner: String,
    /// Path of the shared file inside the owner's tree.
    pub path: String,
}

impl ShareRecord {
    /// Create a record from its parts.
    pub fn new(owner: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            path: path.into(),
        }
    }

    /// Parse a raw `"user/path"` record.
    ///
    /// # Errors
    /// - The separator is missing or the user half is empty
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(SHARE_SEPARATOR) {
            Some((owner, path)) if !owner.is_empty() => Ok(Self::new(owner, path)),
            _ => Err(Error::InvalidRecord(format!(
                "share record '{}' is not of the form user/path",
                raw
            ))),
        }
    }
}

impl fmt::Display for ShareRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, SHARE_SEPARATOR, self.path)
    }
}

impl TryFrom<String> for ShareRecord {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ShareRecord> for String {
    fn from(record: ShareRecord) -> Self {
        record.to_string()
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageRecord {
    /// Username of the author.
    pub sender: String,
    /// Message body; may contain the separator.
    pub text: String,
}

impl MessageRecord {
    /// Create a record from its parts.
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// Parse a raw `"sender:text"` record.
    ///
    /// # Errors
    /// - The separator is missing or the sender half is empty
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(MESSAGE_SEPARATOR) {
            Some((sender, text)) if !sender.is_empty() => Ok(Self::new(sender, text)),
            _ => Err(Error::InvalidRecord(format!(
                "message record '{}' is not of the form sender:text",
                raw
            ))),
        }
    }
}

impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.sender, MESSAGE_SEPARATOR, self.text)
    }
}

impl TryFrom<String> for MessageRecord {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MessageRecord> for String {
    fn from(record: MessageRecord) -> Self {
        record.to_string()
    }
}

//! Data exchanged with the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lockerbox_common::{ChatId, MessageRecord};

/// Identity of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name; immutable.
    pub username: String,
    /// Display name.
    pub name: String,
}

impl User {
    pub fn new(username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
        }
    }
}

/// A file or directory as shown in one directory listing.
///
/// Identity is the name within its listing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Name of the entry.
    pub name: String,
    /// Whether this is a directory.
    #[serde(rename = "directory")]
    pub is_directory: bool,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, sent as unix seconds.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_modified: DateTime<Utc>,
}

impl Entry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            size,
            last_modified,
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>, last_modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            size: 0,
            last_modified,
        }
    }
}

/// Response body of a directory read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Name of the listed directory.
    pub name: String,
    #[serde(rename = "directory")]
    pub is_directory: bool,
    pub size: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_modified: DateTime<Utc>,
    /// Whether the listed directory is the user's root.
    #[serde(default)]
    pub root: bool,
    /// Direct children of the directory.
    #[serde(default)]
    pub children: Vec<Entry>,
}

/// A conversation as shown in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ChatId,
    pub participant_a: String,
    pub participant_b: String,
}

impl ConversationSummary {
    /// The participant that is not `me`.
    pub fn counterpart(&self, me: &str) -> &str {
        if self.participant_a == me {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }
}

/// A conversation together with its messages in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub summary: ConversationSummary,
    pub messages: Vec<MessageRecord>,
}

impl ConversationDetail {
    pub fn id(&self) -> &ChatId {
        &self.summary.id
    }
}

/// Wire form of a conversation read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub user1: String,
    pub user2: String,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
}

impl ChatRecord {
    /// Attach the id the record was read under.
    pub fn into_detail(self, id: ChatId) -> ConversationDetail {
        ConversationDetail {
            summary: ConversationSummary {
                id,
                participant_a: self.user1,
                participant_b: self.user2,
            },
            messages: self.messages,
        }
    }
}

/// Content fetched by a binary download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name: the last segment of the downloaded path.
    pub file_name: String,
    pub content: Vec<u8>,
}

impl Download {
    /// Build a download named after the last segment of `path`.
    pub fn from_path(path: &str, content: Vec<u8>) -> Self {
        let file_name = path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("download")
            .to_string();
        Self { file_name, content }
    }
}

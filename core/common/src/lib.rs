//! Common utilities and types shared across Lockerbox modules.
//!
//! This module provides the foundational types used by the remote API boundary
//! and the client controllers: paths, identifiers, and the structured forms of
//! the service's string-encoded records.

pub mod error;
pub mod records;
pub mod types;

pub use error::{Error, Result};
pub use records::{MessageRecord, ShareRecord};
pub use types::{absolute_path, ChatId, RemotePath, SensitiveString};

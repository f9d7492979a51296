//! Remote API trait definition.

use async_trait::async_trait;

use lockerbox_common::{ChatId, MessageRecord, RemotePath, SensitiveString, ShareRecord};

use crate::model::{ConversationDetail, Download, Listing, User};
use crate::outcome::ApiResult;

/// A change applied to an existing file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// Give the entry a new name inside its current directory.
    Rename(String),
    /// Move the entry into the given absolute destination directory.
    Move(String),
}

/// Interface to the file-storage, sharing, and messaging service.
///
/// Every operation resolves to the result contract: expected failures
/// (authentication required, validation errors, not found, unreachable
/// service) are returned as [`crate::Failure`] values, never raised.
/// Identity travels with the implementation's session state, so none of the
/// operations take a user argument except where another user is addressed.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create an account.
    async fn register(
        &self,
        username: &str,
        password: &SensitiveString,
        name: &str,
    ) -> ApiResult<()>;

    /// Establish a session.
    ///
    /// # Errors
    /// - 401 for unknown user or wrong password
    async fn login(&self, username: &str, password: &SensitiveString) -> ApiResult<()>;

    /// End the current session.
    async fn logout(&self) -> ApiResult<()>;

    /// Read the signed-in user.
    ///
    /// # Errors
    /// - 401 when no session is present
    async fn read_self(&self) -> ApiResult<User>;

    /// Read another user by username.
    async fn read_user(&self, username: &str) -> ApiResult<User>;

    /// Update the signed-in user's display name and/or password.
    ///
    /// Empty values leave the corresponding field unchanged.
    async fn update_user(&self, name: &str, password: &SensitiveString) -> ApiResult<()>;

    /// Delete the signed-in user and end the session.
    async fn delete_user(&self) -> ApiResult<()>;

    /// List ids of the conversations the user takes part in.
    async fn list_chats(&self) -> ApiResult<Vec<ChatId>>;

    /// Read one conversation with its messages.
    async fn read_chat(&self, id: &ChatId) -> ApiResult<ConversationDetail>;

    /// Start a conversation with `to`, sending `message` as the first message.
    ///
    /// # Errors
    /// - 400 "Specified recipient does not exist"
    async fn create_chat(&self, to: &str, message: &str) -> ApiResult<()>;

    /// Delete a conversation.
    async fn delete_chat(&self, id: &ChatId) -> ApiResult<()>;

    /// List the messages of a conversation in order.
    async fn list_messages(&self, id: &ChatId) -> ApiResult<Vec<MessageRecord>>;

    /// Append a message authored by the signed-in user.
    async fn send_message(&self, id: &ChatId, text: &str) -> ApiResult<()>;

    /// Read a directory.
    ///
    /// # Errors
    /// - 404 if the directory does not exist
    async fn read_dir(&self, path: &RemotePath) -> ApiResult<Listing>;

    /// Download a file's content.
    async fn download_file(&self, path: &RemotePath) -> ApiResult<Download>;

    /// Upload `content` as a new file named `file_name` inside `directory`.
    ///
    /// # Errors
    /// - 404 if the directory does not exist
    /// - 409 if the file already exists
    async fn upload_file(
        &self,
        directory: &RemotePath,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<()>;

    /// Create an empty directory at `path`.
    async fn create_directory(&self, path: &RemotePath) -> ApiResult<()>;

    /// Rename or move a file or directory.
    async fn update_file(&self, path: &RemotePath, change: &FileChange) -> ApiResult<()>;

    /// Delete a file or directory.
    async fn delete_file(&self, path: &RemotePath) -> ApiResult<()>;

    /// List paths shared with the signed-in user.
    async fn list_shares(&self) -> ApiResult<Vec<ShareRecord>>;

    /// Share one of the signed-in user's files with `to`.
    async fn create_share(&self, path: &RemotePath, to: &str) -> ApiResult<()>;

    /// Download a file another user shared.
    async fn download_share(&self, share: &ShareRecord) -> ApiResult<Download>;

    /// List the recipients of one of the signed-in user's own shares.
    async fn describe_share(&self, share: &ShareRecord) -> ApiResult<Vec<String>>;

    /// Revoke one of the signed-in user's own shares, either for a single
    /// recipient or, when `recipient` is `None`, entirely.
    async fn delete_share(&self, share: &ShareRecord, recipient: Option<&str>) -> ApiResult<()>;
}

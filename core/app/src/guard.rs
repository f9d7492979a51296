//! Global detection of expired sessions.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use lockerbox_api::{
    ApiResult, ConversationDetail, Download, FileChange, Listing, RemoteApi, User,
};
use lockerbox_common::{ChatId, MessageRecord, RemotePath, SensitiveString, ShareRecord};

use crate::session::SessionState;

/// Remote API decorator that demotes the session on any 401.
///
/// Controllers only ever see the guarded API, so every call site takes part
/// in expiry detection.
pub struct GuardedApi {
    inner: Arc<dyn RemoteApi>,
    session: SessionState,
}

impl GuardedApi {
    pub fn new(inner: Arc<dyn RemoteApi>, session: SessionState) -> Self {
        Self { inner, session }
    }

    fn observe<T>(&self, operation: &str, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(failure) = &result {
            if failure.is_auth_required() {
                debug!("{} answered 401", operation);
                self.session.expire();
            }
        }
        result
    }
}

#[async_trait]
impl RemoteApi for GuardedApi {
    async fn register(
        &self,
        username: &str,
        password: &SensitiveString,
        name: &str,
    ) -> ApiResult<()> {
        let result = self.inner.register(username, password, name).await;
        self.observe("register", result)
    }

    async fn login(&self, username: &str, password: &SensitiveString) -> ApiResult<()> {
        let result = self.inner.login(username, password).await;
        self.observe("login", result)
    }

    async fn logout(&self) -> ApiResult<()> {
        let result = self.inner.logout().await;
        self.observe("logout", result)
    }

    async fn read_self(&self) -> ApiResult<User> {
        let result = self.inner.read_self().await;
        self.observe("read_self", result)
    }

    async fn read_user(&self, username: &str) -> ApiResult<User> {
        let result = self.inner.read_user(username).await;
        self.observe("read_user", result)
    }

    async fn update_user(&self, name: &str, password: &SensitiveString) -> ApiResult<()> {
        let result = self.inner.update_user(name, password).await;
        self.observe("update_user", result)
    }

    async fn delete_user(&self) -> ApiResult<()> {
        let result = self.inner.delete_user().await;
        self.observe("delete_user", result)
    }

    async fn list_chats(&self) -> ApiResult<Vec<ChatId>> {
        let result = self.inner.list_chats().await;
        self.observe("list_chats", result)
    }

    async fn read_chat(&self, id: &ChatId) -> ApiResult<ConversationDetail> {
        let result = self.inner.read_chat(id).await;
        self.observe("read_chat", result)
    }

    async fn create_chat(&self, to: &str, message: &str) -> ApiResult<()> {
        let result = self.inner.create_chat(to, message).await;
        self.observe("create_chat", result)
    }

    async fn delete_chat(&self, id: &ChatId) -> ApiResult<()> {
        let result = self.inner.delete_chat(id).await;
        self.observe("delete_chat", result)
    }

    async fn list_messages(&self, id: &ChatId) -> ApiResult<Vec<MessageRecord>> {
        let result = self.inner.list_messages(id).await;
        self.observe("list_messages", result)
    }

    async fn send_message(&self, id: &ChatId, text: &str) -> ApiResult<()> {
        let result = self.inner.send_message(id, text).await;
        self.observe("send_message", result)
    }

    async fn read_dir(&self, path: &RemotePath) -> ApiResult<Listing> {
        let result = self.inner.read_dir(path).await;
        self.observe("read_dir", result)
    }

    async fn download_file(&self, path: &RemotePath) -> ApiResult<Download> {
        let result = self.inner.download_file(path).await;
        self.observe("download_file", result)
    }

    async fn upload_file(
        &self,
        directory: &RemotePath,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<()> {
        let result = self.inner.upload_file(directory, file_name, content).await;
        self.observe("upload_file", result)
    }

    async fn create_directory(&self, path: &RemotePath) -> ApiResult<()> {
        let result = self.inner.create_directory(path).await;
        self.observe("create_directory", result)
    }

    async fn update_file(&self, path: &RemotePath, change: &FileChange) -> ApiResult<()> {
        let result = self.inner.update_file(path, change).await;
        self.observe("update_file", result)
    }

    async fn delete_file(&self, path: &RemotePath) -> ApiResult<()> {
        let result = self.inner.delete_file(path).await;
        self.observe("delete_file", result)
    }

    async fn list_shares(&self) -> ApiResult<Vec<ShareRecord>> {
        let result = self.inner.list_shares().await;
        self.observe("list_shares", result)
    }

    async fn create_share(&self, path: &RemotePath, to: &str) -> ApiResult<()> {
        let result = self.inner.create_share(path, to).await;
        self.observe("create_share", result)
    }

    async fn download_share(&self, share: &ShareRecord) -> ApiResult<Download> {
        let result = self.inner.download_share(share).await;
        self.observe("download_share", result)
    }

    async fn describe_share(&self, share: &ShareRecord) -> ApiResult<Vec<String>> {
        let result = self.inner.describe_share(share).await;
        self.observe("describe_share", result)
    }

    async fn delete_share(&self, share: &ShareRecord, recipient: Option<&str>) -> ApiResult<()> {
        let result = self.inner.delete_share(share, recipient).await;
        self.observe("delete_share", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use lockerbox_api::MemoryApi;

    async fn signed_in() -> (Arc<MemoryApi>, SessionState, Arc<GuardedApi>) {
        let memory = Arc::new(MemoryApi::new());
        memory.add_user("alice", "Secret-123", "Alice").await;
        memory.login("alice", &"Secret-123".into()).await.unwrap();

        let session = SessionState::new();
        let guarded = Arc::new(GuardedApi::new(memory.clone(), session.clone()));
        let controller = crate::SessionController::new(
            guarded.clone(),
            session.clone(),
            crate::Notifier::channel().0,
        );
        controller.resolve().await;
        (memory, session, guarded)
    }

    #[tokio::test]
    async fn test_401_anywhere_demotes_session() {
        let (memory, session, guarded) = signed_in().await;
        let view = session.view();
        assert!(view.is_authenticated());

        memory.expire_session().await;
        let failure = guarded.list_shares().await.unwrap_err();
        assert!(failure.is_auth_required());
        assert_eq!(view.current(), Session::Anonymous);
    }

    #[tokio::test]
    async fn test_401_leaves_unresolved_session_alone() {
        let memory = Arc::new(MemoryApi::new());
        let session = SessionState::new();
        let guarded = GuardedApi::new(memory, session.clone());

        assert!(guarded.read_self().await.is_err());
        assert_eq!(session.current(), Session::Unresolved);
    }

    #[tokio::test]
    async fn test_other_failures_leave_session() {
        let (_memory, session, guarded) = signed_in().await;

        let missing = RemotePath::parse("/missing").unwrap();
        let failure = guarded.read_dir(&missing).await.unwrap_err();
        assert_eq!(failure.status(), Some(404));
        assert!(session.current().is_authenticated());
    }
}

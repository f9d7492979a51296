//! Shared fixtures for the controller integration tests.
//!
//! [`GatedApi`] wraps a [`MemoryApi`] and lets a test hold individual calls
//! until it releases them, so responses can be completed in any order, or
//! fail a chosen call without reaching the service.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};

use lockerbox_api::{
    ApiResult, ConversationDetail, Download, Failure, FileChange, Listing, MemoryApi, RemoteApi,
    User,
};
use lockerbox_app::{App, NoticeReceiver};
use lockerbox_common::{ChatId, MessageRecord, RemotePath, SensitiveString, ShareRecord};

pub const PASSWORD: &str = "Secret-123";

/// A held call. Dropping the gate without releasing it also lets the call through.
pub struct Gate {
    release: oneshot::Sender<()>,
    reached: Arc<Notify>,
}

impl Gate {
    /// Wait until the held call has been dispatched.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Let the held call complete.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

struct Pending {
    release: oneshot::Receiver<()>,
    reached: Arc<Notify>,
}

/// Remote API double that records every call and can hold chosen ones.
///
/// Calls are keyed as `"<method> <argument>"`, e.g. `"read_dir /a"` or
/// `"list_messages <id>"`; methods without an argument use the bare name.
pub struct GatedApi {
    inner: Arc<MemoryApi>,
    pending: Mutex<HashMap<String, VecDeque<Pending>>>,
    failures: Mutex<HashMap<String, VecDeque<Failure>>>,
    calls: Mutex<Vec<String>>,
}

impl GatedApi {
    pub fn new(inner: Arc<MemoryApi>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            pending: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn inner(&self) -> &Arc<MemoryApi> {
        &self.inner
    }

    /// Hold the next call matching `key`.
    pub fn hold(&self, key: impl Into<String>) -> Gate {
        let (tx, rx) = oneshot::channel();
        let reached = Arc::new(Notify::new());
        self.pending
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .push_back(Pending {
                release: rx,
                reached: reached.clone(),
            });
        Gate {
            release: tx,
            reached,
        }
    }

    /// Answer the next call matching `key` with `failure`.
    ///
    /// A failed call is recorded but never reaches the service.
    pub fn fail(&self, key: impl Into<String>, failure: Failure) {
        self.failures
            .lock()
            .unwrap()
            .entry(key.into())
            .or_default()
            .push_back(failure);
    }

    /// Every call made so far, in dispatch order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls made with exactly `key`.
    pub fn count(&self, key: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == key).count()
    }

    async fn pass(&self, key: String) -> ApiResult<()> {
        self.calls.lock().unwrap().push(key.clone());
        let pending = self
            .pending
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(pending) = pending {
            pending.reached.notify_one();
            let _ = pending.release.await;
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteApi for GatedApi {
    async fn register(
        &self,
        username: &str,
        password: &SensitiveString,
        name: &str,
    ) -> ApiResult<()> {
        self.pass("register".to_string()).await?;
        self.inner.register(username, password, name).await
    }

    async fn login(&self, username: &str, password: &SensitiveString) -> ApiResult<()> {
        self.pass("login".to_string()).await?;
        self.inner.login(username, password).await
    }

    async fn logout(&self) -> ApiResult<()> {
        self.pass("logout".to_string()).await?;
        self.inner.logout().await
    }

    async fn read_self(&self) -> ApiResult<User> {
        self.pass("read_self".to_string()).await?;
        self.inner.read_self().await
    }

    async fn read_user(&self, username: &str) -> ApiResult<User> {
        self.pass(format!("read_user {}", username)).await?;
        self.inner.read_user(username).await
    }

    async fn update_user(&self, name: &str, password: &SensitiveString) -> ApiResult<()> {
        self.pass("update_user".to_string()).await?;
        self.inner.update_user(name, password).await
    }

    async fn delete_user(&self) -> ApiResult<()> {
        self.pass("delete_user".to_string()).await?;
        self.inner.delete_user().await
    }

    async fn list_chats(&self) -> ApiResult<Vec<ChatId>> {
        self.pass("list_chats".to_string()).await?;
        self.inner.list_chats().await
    }

    async fn read_chat(&self, id: &ChatId) -> ApiResult<ConversationDetail> {
        self.pass(format!("read_chat {}", id)).await?;
        self.inner.read_chat(id).await
    }

    async fn create_chat(&self, to: &str, message: &str) -> ApiResult<()> {
        self.pass(format!("create_chat {}", to)).await?;
        self.inner.create_chat(to, message).await
    }

    async fn delete_chat(&self, id: &ChatId) -> ApiResult<()> {
        self.pass(format!("delete_chat {}", id)).await?;
        self.inner.delete_chat(id).await
    }

    async fn list_messages(&self, id: &ChatId) -> ApiResult<Vec<MessageRecord>> {
        self.pass(format!("list_messages {}", id)).await?;
        self.inner.list_messages(id).await
    }

    async fn send_message(&self, id: &ChatId, text: &str) -> ApiResult<()> {
        self.pass(format!("send_message {}", id)).await?;
        self.inner.send_message(id, text).await
    }

    async fn read_dir(&self, path: &RemotePath) -> ApiResult<Listing> {
        self.pass(format!("read_dir {}", path)).await?;
        self.inner.read_dir(path).await
    }

    async fn download_file(&self, path: &RemotePath) -> ApiResult<Download> {
        self.pass(format!("download_file {}", path)).await?;
        self.inner.download_file(path).await
    }

    async fn upload_file(
        &self,
        directory: &RemotePath,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<()> {
        self.pass(format!("upload_file {}", directory)).await?;
        self.inner.upload_file(directory, file_name, content).await
    }

    async fn create_directory(&self, path: &RemotePath) -> ApiResult<()> {
        self.pass(format!("create_directory {}", path)).await?;
        self.inner.create_directory(path).await
    }

    async fn update_file(&self, path: &RemotePath, change: &FileChange) -> ApiResult<()> {
        let key = match change {
            FileChange::Rename(name) => format!("rename {} {}", path, name),
            FileChange::Move(destination) => format!("move {} {}", path, destination),
        };
        self.pass(key).await?;
        self.inner.update_file(path, change).await
    }

    async fn delete_file(&self, path: &RemotePath) -> ApiResult<()> {
        self.pass(format!("delete_file {}", path)).await?;
        self.inner.delete_file(path).await
    }

    async fn list_shares(&self) -> ApiResult<Vec<ShareRecord>> {
        self.pass("list_shares".to_string()).await?;
        self.inner.list_shares().await
    }

    async fn create_share(&self, path: &RemotePath, to: &str) -> ApiResult<()> {
        self.pass(format!("create_share {} {}", path, to)).await?;
        self.inner.create_share(path, to).await
    }

    async fn download_share(&self, share: &ShareRecord) -> ApiResult<Download> {
        self.pass(format!("download_share {}", share)).await?;
        self.inner.download_share(share).await
    }

    async fn describe_share(&self, share: &ShareRecord) -> ApiResult<Vec<String>> {
        self.pass(format!("describe_share {}", share)).await?;
        self.inner.describe_share(share).await
    }

    async fn delete_share(&self, share: &ShareRecord, recipient: Option<&str>) -> ApiResult<()> {
        self.pass(format!("delete_share {}", share)).await?;
        self.inner.delete_share(share, recipient).await
    }
}

/// A service with accounts `alice` and `bob`.
pub async fn service() -> Arc<MemoryApi> {
    let api = Arc::new(MemoryApi::new());
    api.add_user("alice", PASSWORD, "Alice").await;
    api.add_user("bob", PASSWORD, "Bob").await;
    api
}

/// An app signed in as `username` through a gated API.
pub async fn signed_in(
    service: &MemoryApi,
    username: &str,
) -> (Arc<App>, Arc<GatedApi>, NoticeReceiver) {
    let gated = GatedApi::new(Arc::new(service.connect()));
    let (app, notices) = App::new(gated.clone());
    assert!(app
        .session()
        .login(username, &PASSWORD.into())
        .await
        .is_applied());
    (Arc::new(app), gated, notices)
}

/// Drain every notice emitted so far.
pub fn drain(notices: &mut NoticeReceiver) -> Vec<String> {
    let mut drained = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        drained.push(notice.to_string());
    }
    drained
}

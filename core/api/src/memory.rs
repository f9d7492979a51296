//! In-memory implementation of the remote API for testing and offline use.
//!
//! [`MemoryApi`] reproduces the service's rules and reason texts closely
//! enough that controllers behave the same against it as against
//! [`crate::HttpApi`]. Several clients can share one in-memory service via
//! [`MemoryApi::connect`], each with its own session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use lockerbox_common::{ChatId, MessageRecord, RemotePath, SensitiveString, ShareRecord};

use crate::model::{ConversationDetail, ConversationSummary, Download, Entry, Listing, User};
use crate::outcome::{ApiResult, Failure};
use crate::remote::{FileChange, RemoteApi};

/// Reason reported for every call made while offline.
const UNREACHABLE: &str = "failed to send request: service unreachable";

/// A node in a user's file tree.
#[derive(Debug, Clone)]
enum Node {
    File {
        content: Vec<u8>,
        modified: DateTime<Utc>,
    },
    Directory {
        modified: DateTime<Utc>,
    },
}

impl Node {
    fn directory() -> Self {
        Node::Directory {
            modified: Utc::now(),
        }
    }

    fn is_directory(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }

    fn entry(&self, name: &str) -> Entry {
        match self {
            Node::File { content, modified } => Entry::file(name, content.len() as u64, *modified),
            Node::Directory { modified } => Entry::directory(name, *modified),
        }
    }
}

#[derive(Debug)]
struct Account {
    name: String,
    password: String,
    chats: Vec<ChatId>,
    /// Shares received from other users, in arrival order.
    received: Vec<ShareRecord>,
    files: HashMap<RemotePath, Node>,
}

impl Account {
    fn new(name: &str, password: &str) -> Self {
        let mut files = HashMap::new();
        files.insert(RemotePath::root(), Node::directory());
        Self {
            name: name.to_string(),
            password: password.to_string(),
            chats: Vec::new(),
            received: Vec::new(),
            files,
        }
    }

    fn node(&self, path: &RemotePath) -> ApiResult<&Node> {
        self.files
            .get(path)
            .ok_or_else(|| rejected(404, "specified file/directory does not exist"))
    }

    /// Direct children of `path`, sorted by name.
    fn children(&self, path: &RemotePath) -> Vec<Entry> {
        let mut children: Vec<Entry> = self
            .files
            .iter()
            .filter(|(candidate, _)| candidate.parent().as_ref() == Some(path))
            .filter_map(|(candidate, node)| candidate.name().map(|name| node.entry(name)))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Re-key `from` and everything below it to live under `to`.
    fn relocate(&mut self, from: &RemotePath, to: &RemotePath) {
        let depth = from.depth();
        let moved: Vec<RemotePath> = self
            .files
            .keys()
            .filter(|path| path.components().starts_with(from.components()))
            .cloned()
            .collect();

        for old in moved {
            if let Some(node) = self.files.remove(&old) {
                let mut components = to.components().to_vec();
                components.extend(old.components()[depth..].iter().cloned());
                if let Ok(new) = RemotePath::from_components(components) {
                    self.files.insert(new, node);
                }
            }
        }
    }
}

#[derive(Debug)]
struct Chat {
    user1: String,
    user2: String,
    messages: Vec<MessageRecord>,
}

#[derive(Debug)]
struct Share {
    record: ShareRecord,
    to: Vec<String>,
}

#[derive(Debug, Default)]
struct Service {
    accounts: HashMap<String, Account>,
    /// Session token to username.
    sessions: HashMap<String, String>,
    chats: HashMap<ChatId, Chat>,
    shares: Vec<Share>,
}

impl Service {
    fn username_for(&self, token: Option<&str>) -> ApiResult<String> {
        let token = token.ok_or_else(|| rejected(401, "no session present"))?;
        self.sessions
            .get(token)
            .cloned()
            .ok_or_else(|| rejected(401, "invalid session id"))
    }

    fn account(&self, username: &str) -> ApiResult<&Account> {
        self.accounts
            .get(username)
            .ok_or_else(|| rejected(404, "specified user does not exist"))
    }

    fn account_mut(&mut self, username: &str) -> ApiResult<&mut Account> {
        self.accounts
            .get_mut(username)
            .ok_or_else(|| rejected(404, "specified user does not exist"))
    }

    /// Look up a chat the user takes part in.
    fn chat(&self, username: &str, id: &ChatId) -> ApiResult<&Chat> {
        let chat = self
            .chats
            .get(id)
            .ok_or_else(|| rejected(404, "specified chat does not exist"))?;
        if !self.account(username)?.chats.contains(id) {
            return Err(rejected(403, "user not in specified chat"));
        }
        Ok(chat)
    }

    fn share_index(&self, record: &ShareRecord) -> Option<usize> {
        self.shares.iter().position(|share| &share.record == record)
    }
}

fn rejected(status: u16, reason: &str) -> Failure {
    Failure::from_status(status, reason)
}

/// The service's password rules, in the order it checks them.
fn password_problem(password: &str) -> Option<&'static str> {
    if password.chars().count() < 8 {
        Some("field 'password' must be at least 8 characters")
    } else if !password.chars().any(|c| c.is_lowercase()) {
        Some("field 'password' must contain a lowercase character")
    } else if !password.chars().any(|c| c.is_uppercase()) {
        Some("field 'password' must contain a uppercase character")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("field 'password' must contain a numeric character")
    } else if !password.chars().any(|c| c.is_ascii_punctuation()) {
        Some("field 'password' must contain a special character")
    } else {
        None
    }
}

fn record_path(path: &RemotePath) -> String {
    path.components().join("/")
}

/// Whether a share's path lies at or below `prefix` (empty for the root).
fn shared_below(shared: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || shared == prefix
        || shared
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// In-memory service client.
///
/// All data is stored in memory and lost on drop of the last client.
pub struct MemoryApi {
    service: Arc<Mutex<Service>>,
    token: Mutex<Option<String>>,
    offline: AtomicBool,
}

impl MemoryApi {
    /// Create a client of a new, empty service.
    pub fn new() -> Self {
        Self {
            service: Arc::new(Mutex::new(Service::default())),
            token: Mutex::new(None),
            offline: AtomicBool::new(false),
        }
    }

    /// Create another client of the same service, without a session.
    pub fn connect(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            token: Mutex::new(None),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every call of this client fail as if the service were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Invalidate this client's session on the service side.
    pub async fn expire_session(&self) {
        if let Some(token) = self.token.lock().await.as_ref() {
            self.service.lock().await.sessions.remove(token);
        }
    }

    /// Create an account without going through registration rules.
    pub async fn add_user(&self, username: &str, password: &str, name: &str) {
        self.service
            .lock()
            .await
            .accounts
            .insert(username.to_string(), Account::new(name, password));
    }

    /// Place a file in `owner`'s tree, creating missing parent directories.
    pub async fn put_file(&self, owner: &str, path: &RemotePath, content: &[u8]) {
        let mut service = self.service.lock().await;
        if let Some(account) = service.accounts.get_mut(owner) {
            Self::ensure_directories(account, path.parent().as_ref());
            account.files.insert(
                path.clone(),
                Node::File {
                    content: content.to_vec(),
                    modified: Utc::now(),
                },
            );
        }
    }

    /// Place a directory in `owner`'s tree, creating missing parents.
    pub async fn put_directory(&self, owner: &str, path: &RemotePath) {
        let mut service = self.service.lock().await;
        if let Some(account) = service.accounts.get_mut(owner) {
            Self::ensure_directories(account, Some(path));
        }
    }

    fn ensure_directories(account: &mut Account, path: Option<&RemotePath>) {
        if let Some(path) = path {
            for depth in 1..=path.depth() {
                account
                    .files
                    .entry(path.truncated(depth))
                    .or_insert_with(Node::directory);
            }
        }
    }

    fn reachable(&self) -> ApiResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Failure::transport(UNREACHABLE))
        } else {
            Ok(())
        }
    }

    /// Run `f` against the service as the signed-in user.
    async fn as_user<T>(
        &self,
        f: impl FnOnce(&mut Service, &str) -> ApiResult<T> + Send,
    ) -> ApiResult<T> {
        self.reachable()?;
        let token = self.token.lock().await.clone();
        let mut service = self.service.lock().await;
        let username = service.username_for(token.as_deref())?;
        f(&mut service, &username)
    }
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteApi for MemoryApi {
    async fn register(
        &self,
        username: &str,
        password: &SensitiveString,
        name: &str,
    ) -> ApiResult<()> {
        self.reachable()?;
        debug!("memory: register {}", username);

        let password = password.expose();
        if username.is_empty() || password.is_empty() || name.is_empty() {
            return Err(rejected(
                400,
                "fields 'name', 'username', and 'password' are required",
            ));
        }
        if username.chars().count() < 3 {
            return Err(rejected(400, "field 'username' must be at least 3 characters"));
        }
        if username.to_lowercase() != username {
            return Err(rejected(
                400,
                "field 'username' must only contain lowercase characters",
            ));
        }
        if let Some(problem) = password_problem(password) {
            return Err(rejected(400, problem));
        }

        let mut service = self.service.lock().await;
        if service.accounts.contains_key(username) {
            return Err(rejected(409, "specified username is already in use"));
        }
        service
            .accounts
            .insert(username.to_string(), Account::new(name, password));
        Ok(())
    }

    async fn login(&self, username: &str, password: &SensitiveString) -> ApiResult<()> {
        self.reachable()?;
        debug!("memory: login {}", username);

        if username.is_empty() || password.is_empty() {
            return Err(rejected(400, "fields 'username' and 'password' are required"));
        }

        let mut service = self.service.lock().await;
        match service.accounts.get(username) {
            Some(account) if account.password == password.expose() => {}
            _ => return Err(rejected(401, "invalid username or password")),
        }

        let token = Uuid::new_v4().to_string();
        service.sessions.insert(token.clone(), username.to_string());
        drop(service);

        *self.token.lock().await = Some(token);
        Ok(())
    }

    async fn logout(&self) -> ApiResult<()> {
        self.reachable()?;
        let mut token = self.token.lock().await;
        let mut service = self.service.lock().await;
        service.username_for(token.as_deref())?;

        if let Some(token) = token.take() {
            service.sessions.remove(&token);
        }
        Ok(())
    }

    async fn read_self(&self) -> ApiResult<User> {
        self.as_user(|service, me| {
            let account = service.account(me)?;
            Ok(User::new(me, account.name.clone()))
        })
        .await
    }

    async fn read_user(&self, username: &str) -> ApiResult<User> {
        self.as_user(|service, _| {
            let account = service.account(username)?;
            Ok(User::new(username, account.name.clone()))
        })
        .await
    }

    async fn update_user(&self, name: &str, password: &SensitiveString) -> ApiResult<()> {
        self.as_user(|service, me| {
            if !password.is_empty() {
                if let Some(problem) = password_problem(password.expose()) {
                    return Err(rejected(400, problem));
                }
            }

            let account = service.account_mut(me)?;
            if !name.is_empty() {
                account.name = name.to_string();
            }
            if !password.is_empty() {
                account.password = password.expose().to_string();
            }
            Ok(())
        })
        .await
    }

    async fn delete_user(&self) -> ApiResult<()> {
        let result = self
            .as_user(|service, me| {
                service.accounts.remove(me);
                service.sessions.retain(|_, user| user != me);
                service.shares.retain(|share| share.record.owner != me);
                for account in service.accounts.values_mut() {
                    account.received.retain(|record| record.owner != me);
                }
                Ok(())
            })
            .await;

        if result.is_ok() {
            *self.token.lock().await = None;
        }
        result
    }

    async fn list_chats(&self) -> ApiResult<Vec<ChatId>> {
        self.as_user(|service, me| Ok(service.account(me)?.chats.clone()))
            .await
    }

    async fn read_chat(&self, id: &ChatId) -> ApiResult<ConversationDetail> {
        self.as_user(|service, me| {
            let chat = service.chat(me, id)?;
            Ok(ConversationDetail {
                summary: ConversationSummary {
                    id: id.clone(),
                    participant_a: chat.user1.clone(),
                    participant_b: chat.user2.clone(),
                },
                messages: chat.messages.clone(),
            })
        })
        .await
    }

    async fn create_chat(&self, to: &str, message: &str) -> ApiResult<()> {
        self.as_user(|service, me| {
            if to.is_empty() || message.is_empty() {
                return Err(rejected(400, "fields 'name' and 'message' are required"));
            }
            if !service.accounts.contains_key(to) {
                return Err(rejected(400, "specified recipient does not exist"));
            }

            let id = ChatId::new(Uuid::new_v4().to_string()).map_err(Failure::malformed)?;
            service.chats.insert(
                id.clone(),
                Chat {
                    user1: me.to_string(),
                    user2: to.to_string(),
                    messages: vec![MessageRecord::new(me, message)],
                },
            );
            for participant in [me, to] {
                service.account_mut(participant)?.chats.push(id.clone());
            }
            Ok(())
        })
        .await
    }

    async fn delete_chat(&self, id: &ChatId) -> ApiResult<()> {
        self.as_user(|service, me| {
            let chat = service.chat(me, id)?;
            let participants = [chat.user1.clone(), chat.user2.clone()];

            for participant in &participants {
                if let Some(account) = service.accounts.get_mut(participant) {
                    account.chats.retain(|chat| chat != id);
                }
            }
            service.chats.remove(id);
            Ok(())
        })
        .await
    }

    async fn list_messages(&self, id: &ChatId) -> ApiResult<Vec<MessageRecord>> {
        self.as_user(|service, me| Ok(service.chat(me, id)?.messages.clone()))
            .await
    }

    async fn send_message(&self, id: &ChatId, text: &str) -> ApiResult<()> {
        self.as_user(|service, me| {
            if text.is_empty() {
                return Err(rejected(400, "field 'message' are required"));
            }
            service.chat(me, id)?;
            if let Some(chat) = service.chats.get_mut(id) {
                chat.messages.push(MessageRecord::new(me, text));
            }
            Ok(())
        })
        .await
    }

    async fn read_dir(&self, path: &RemotePath) -> ApiResult<Listing> {
        self.as_user(|service, me| {
            let account = service.account(me)?;
            let node = account.node(path)?;
            let entry = node.entry(path.name().unwrap_or(me));

            if !node.is_directory() {
                return Err(Failure::malformed("expected a directory listing"));
            }

            Ok(Listing {
                name: entry.name,
                is_directory: true,
                size: entry.size,
                last_modified: entry.last_modified,
                root: path.is_root(),
                children: account.children(path),
            })
        })
        .await
    }

    async fn download_file(&self, path: &RemotePath) -> ApiResult<Download> {
        self.as_user(|service, me| match service.account(me)?.node(path)? {
            Node::File { content, .. } => Ok(Download::from_path(
                &path.to_string_path(),
                content.clone(),
            )),
            Node::Directory { .. } => Err(Failure::malformed("expected file content")),
        })
        .await
    }

    async fn upload_file(
        &self,
        directory: &RemotePath,
        file_name: &str,
        content: Vec<u8>,
    ) -> ApiResult<()> {
        self.as_user(|service, me| {
            let account = service.account_mut(me)?;
            match account.files.get(directory) {
                None => return Err(rejected(404, "specified directory does not exist")),
                Some(node) if !node.is_directory() => {
                    return Err(rejected(400, "cannot upload to file"))
                }
                Some(_) => {}
            }

            let target = directory
                .join(file_name)
                .map_err(|_| rejected(400, "field 'file' must be a file"))?;
            if account.files.contains_key(&target) {
                return Err(rejected(409, "file already exists"));
            }
            account.files.insert(
                target,
                Node::File {
                    content,
                    modified: Utc::now(),
                },
            );
            Ok(())
        })
        .await
    }

    async fn create_directory(&self, path: &RemotePath) -> ApiResult<()> {
        self.as_user(|service, me| {
            let account = service.account_mut(me)?;
            if account.files.contains_key(path) {
                return Err(rejected(409, "specified directory already exists"));
            }
            match path.parent().and_then(|parent| account.files.get(&parent)) {
                Some(parent) if parent.is_directory() => {}
                _ => return Err(rejected(404, "specified directory does not exist")),
            }
            account.files.insert(path.clone(), Node::directory());
            Ok(())
        })
        .await
    }

    async fn update_file(&self, path: &RemotePath, change: &FileChange) -> ApiResult<()> {
        self.as_user(|service, me| {
            if path.is_root() {
                return Err(rejected(403, "not allowed to move user root"));
            }

            let account = service.account_mut(me)?;
            account.node(path)?;

            let target = match change {
                FileChange::Rename(name) => {
                    let name = name.rsplit('/').find(|s| !s.is_empty()).unwrap_or_default();
                    path.parent()
                        .unwrap_or_default()
                        .join(name)
                        .map_err(|_| rejected(500, "failed to rename file"))?
                }
                FileChange::Move(destination) => {
                    let destination = RemotePath::parse(&destination.replace("../", ""))
                        .map_err(|_| rejected(400, "specified path does not exist"))?;
                    match account.files.get(&destination) {
                        None => return Err(rejected(400, "specified path does not exist")),
                        Some(node) if !node.is_directory() => {
                            return Err(rejected(500, "failed to move file"))
                        }
                        Some(_) => {}
                    }
                    let name = path.name().unwrap_or_default();
                    destination
                        .join(name)
                        .map_err(|_| rejected(500, "failed to move file"))?
                }
            };

            if target.components().starts_with(path.components()) && &target != path {
                return Err(rejected(500, "failed to move file"));
            }
            if account.files.contains_key(&target) && &target != path {
                return Err(rejected(500, "failed to rename file"));
            }

            account.relocate(path, &target);
            Ok(())
        })
        .await
    }

    async fn delete_file(&self, path: &RemotePath) -> ApiResult<()> {
        self.as_user(|service, me| {
            let account = service.account_mut(me)?;
            account.node(path)?;
            account
                .files
                .retain(|candidate, _| !candidate.components().starts_with(path.components()));
            if path.is_root() {
                account.files.insert(RemotePath::root(), Node::directory());
            }

            let prefix = record_path(path);
            let owner = me.to_string();
            let removed: Vec<ShareRecord> = service
                .shares
                .iter()
                .filter(|share| share.record.owner == owner && shared_below(&share.record.path, &prefix))
                .map(|share| share.record.clone())
                .collect();
            service.shares.retain(|share| !removed.contains(&share.record));
            for account in service.accounts.values_mut() {
                account.received.retain(|record| !removed.contains(record));
            }
            Ok(())
        })
        .await
    }

    async fn list_shares(&self) -> ApiResult<Vec<ShareRecord>> {
        self.as_user(|service, me| Ok(service.account(me)?.received.clone()))
            .await
    }

    async fn create_share(&self, path: &RemotePath, to: &str) -> ApiResult<()> {
        self.as_user(|service, me| {
            if path.is_root() || to.is_empty() {
                return Err(rejected(400, "fields 'file' and 'to' must be present"));
            }
            if service.account(me)?.node(path)?.is_directory() {
                return Err(rejected(400, "cannot share directory"));
            }
            service.account(to)?;

            let record = ShareRecord::new(me, record_path(path));
            let index = match service.share_index(&record) {
                Some(index) => index,
                None => {
                    service.shares.push(Share {
                        record: record.clone(),
                        to: Vec::new(),
                    });
                    service.shares.len() - 1
                }
            };

            let share = &mut service.shares[index];
            if share.to.iter().any(|user| user == to) {
                return Err(rejected(400, "already shared with user"));
            }
            share.to.push(to.to_string());
            service.account_mut(to)?.received.push(record);
            Ok(())
        })
        .await
    }

    async fn download_share(&self, share: &ShareRecord) -> ApiResult<Download> {
        self.as_user(|service, me| {
            let path = RemotePath::parse(&share.path)
                .map_err(|_| rejected(404, "specified file/directory does not exist"))?;
            let content = match service.account(&share.owner)?.node(&path)? {
                Node::File { content, .. } => content.clone(),
                Node::Directory { .. } => return Err(rejected(404, "specified share does not exist")),
            };

            let index = service
                .share_index(share)
                .ok_or_else(|| rejected(404, "specified share does not exist"))?;
            if !service.shares[index].to.iter().any(|user| user == me) {
                return Err(rejected(403, "file not shared with requesting user"));
            }
            Ok(Download::from_path(&share.path, content))
        })
        .await
    }

    async fn describe_share(&self, share: &ShareRecord) -> ApiResult<Vec<String>> {
        self.as_user(|service, me| {
            if share.owner != me {
                return Err(rejected(403, "cannot describe file"));
            }
            let index = service
                .share_index(share)
                .ok_or_else(|| rejected(404, "specified share does not exist"))?;
            Ok(service.shares[index].to.clone())
        })
        .await
    }

    async fn delete_share(&self, share: &ShareRecord, recipient: Option<&str>) -> ApiResult<()> {
        self.as_user(|service, me| {
            if share.owner != me {
                return Err(rejected(403, "requesting user does not own link share"));
            }
            let index = service
                .share_index(share)
                .ok_or_else(|| rejected(404, "specified shared link does not exist"))?;

            let revoked: Vec<String> = match recipient {
                Some(user) => {
                    service.shares[index].to.retain(|to| to != user);
                    vec![user.to_string()]
                }
                None => service.shares.remove(index).to,
            };
            for user in revoked {
                if let Some(account) = service.accounts.get_mut(&user) {
                    account.received.retain(|record| record != share);
                }
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "Secret-123";

    async fn signed_in(username: &str) -> MemoryApi {
        let api = MemoryApi::new();
        api.add_user(username, PASSWORD, "Alice").await;
        api.login(username, &PASSWORD.into()).await.unwrap();
        api
    }

    fn path(raw: &str) -> RemotePath {
        RemotePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_requires_session() {
        let api = MemoryApi::new();
        let failure = api.read_self().await.unwrap_err();
        assert!(failure.is_auth_required());
        assert_eq!(failure.reason(), "No session present");
    }

    #[tokio::test]
    async fn test_login_and_read_self() {
        let api = signed_in("alice").await;
        assert_eq!(api.read_self().await.unwrap(), User::new("alice", "Alice"));
    }

    #[tokio::test]
    async fn test_wrong_password_is_401() {
        let api = MemoryApi::new();
        api.add_user("alice", PASSWORD, "Alice").await;
        let failure = api.login("alice", &"nope".into()).await.unwrap_err();
        assert_eq!(failure.to_string(), "(401) Invalid username or password");
    }

    #[tokio::test]
    async fn test_register_enforces_rules() {
        let api = MemoryApi::new();
        let failure = api.register("Bob", &PASSWORD.into(), "Bob").await.unwrap_err();
        assert_eq!(failure.status(), Some(400));

        let failure = api.register("bob", &"short".into(), "Bob").await.unwrap_err();
        assert_eq!(failure.reason(), "Field 'password' must be at least 8 characters");

        api.register("bob", &PASSWORD.into(), "Bob").await.unwrap();
        let failure = api.register("bob", &PASSWORD.into(), "Bob").await.unwrap_err();
        assert_eq!(failure.status(), Some(409));
    }

    #[tokio::test]
    async fn test_expired_session() {
        let api = signed_in("alice").await;
        api.expire_session().await;
        let failure = api.list_chats().await.unwrap_err();
        assert_eq!(failure.reason(), "Invalid session id");
    }

    #[tokio::test]
    async fn test_offline_is_transport_failure() {
        let api = signed_in("alice").await;
        api.set_offline(true);
        assert_eq!(api.read_self().await.unwrap_err().status(), None);
        api.set_offline(false);
        assert!(api.read_self().await.is_ok());
    }

    #[tokio::test]
    async fn test_directory_listing_is_sorted() {
        let api = signed_in("alice").await;
        api.put_file("alice", &path("/docs/b.txt"), b"b").await;
        api.put_file("alice", &path("/docs/a.txt"), b"aa").await;

        let listing = api.read_dir(&path("/docs")).await.unwrap();
        let names: Vec<_> = listing.children.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
        assert_eq!(listing.children[0].size, 2);
        assert!(!listing.root);

        let root = api.read_dir(&RemotePath::root()).await.unwrap();
        assert!(root.root);
        assert!(root.children[0].is_directory);
    }

    #[tokio::test]
    async fn test_missing_directory_is_404() {
        let api = signed_in("alice").await;
        let failure = api.read_dir(&path("/nope")).await.unwrap_err();
        assert_eq!(failure.to_string(), "(404) Specified file/directory does not exist");
    }

    #[tokio::test]
    async fn test_rename_directory_moves_descendants() {
        let api = signed_in("alice").await;
        api.put_file("alice", &path("/docs/inner/a.txt"), b"a").await;

        api.update_file(&path("/docs"), &FileChange::Rename("papers".into()))
            .await
            .unwrap();

        let inner = api.read_dir(&path("/papers/inner")).await.unwrap();
        assert_eq!(inner.children.len(), 1);
        assert_eq!(inner.children[0].name, "a.txt");
        assert!(api.read_dir(&path("/docs")).await.is_err());
    }

    #[tokio::test]
    async fn test_move_requires_existing_destination() {
        let api = signed_in("alice").await;
        api.put_file("alice", &path("/a.txt"), b"a").await;

        let failure = api
            .update_file(&path("/a.txt"), &FileChange::Move("/nowhere".into()))
            .await
            .unwrap_err();
        assert_eq!(failure.to_string(), "(400) Specified path does not exist");

        api.put_directory("alice", &path("/archive")).await;
        api.update_file(&path("/a.txt"), &FileChange::Move("/archive".into()))
            .await
            .unwrap();
        let archive = api.read_dir(&path("/archive")).await.unwrap();
        assert_eq!(archive.children[0].name, "a.txt");
    }

    #[tokio::test]
    async fn test_root_cannot_be_renamed() {
        let api = signed_in("alice").await;
        let failure = api
            .update_file(&RemotePath::root(), &FileChange::Rename("x".into()))
            .await
            .unwrap_err();
        assert_eq!(failure.status(), Some(403));
    }

    #[tokio::test]
    async fn test_upload_and_create_directory() {
        let api = signed_in("alice").await;
        api.upload_file(&RemotePath::root(), "a.txt", b"hi".to_vec())
            .await
            .unwrap();
        let failure = api
            .upload_file(&RemotePath::root(), "a.txt", b"hi".to_vec())
            .await
            .unwrap_err();
        assert_eq!(failure.status(), Some(409));

        api.create_directory(&path("/docs")).await.unwrap();
        let failure = api.create_directory(&path("/docs")).await.unwrap_err();
        assert_eq!(failure.reason(), "Specified directory already exists");

        let download = api.download_file(&path("/a.txt")).await.unwrap();
        assert_eq!(download.file_name, "a.txt");
        assert_eq!(download.content, b"hi");
    }

    #[tokio::test]
    async fn test_chat_lifecycle_between_clients() {
        let alice = signed_in("alice").await;
        alice.add_user("bob", PASSWORD, "Bob").await;
        let bob = alice.connect();
        bob.login("bob", &PASSWORD.into()).await.unwrap();

        let failure = alice.create_chat("carol", "hi").await.unwrap_err();
        assert_eq!(failure.reason(), "Specified recipient does not exist");

        alice.create_chat("bob", "hi: there").await.unwrap();
        let ids = bob.list_chats().await.unwrap();
        assert_eq!(ids.len(), 1);

        bob.send_message(&ids[0], "hello").await.unwrap();
        let messages = alice.list_messages(&ids[0]).await.unwrap();
        assert_eq!(
            messages,
            vec![
                MessageRecord::new("alice", "hi: there"),
                MessageRecord::new("bob", "hello")
            ]
        );

        bob.delete_chat(&ids[0]).await.unwrap();
        assert!(alice.list_chats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_share_lifecycle() {
        let alice = signed_in("alice").await;
        alice.add_user("bob", PASSWORD, "Bob").await;
        alice.put_file("alice", &path("/reports/q3.pdf"), b"pdf").await;
        let bob = alice.connect();
        bob.login("bob", &PASSWORD.into()).await.unwrap();

        let failure = alice.create_share(&path("/reports"), "bob").await.unwrap_err();
        assert_eq!(failure.reason(), "Cannot share directory");

        alice.create_share(&path("/reports/q3.pdf"), "bob").await.unwrap();
        let failure = alice
            .create_share(&path("/reports/q3.pdf"), "bob")
            .await
            .unwrap_err();
        assert_eq!(failure.reason(), "Already shared with user");

        let shares = bob.list_shares().await.unwrap();
        assert_eq!(shares, vec![ShareRecord::new("alice", "reports/q3.pdf")]);
        assert_eq!(bob.download_share(&shares[0]).await.unwrap().content, b"pdf");

        assert_eq!(alice.describe_share(&shares[0]).await.unwrap(), vec!["bob"]);
        assert_eq!(
            bob.describe_share(&shares[0]).await.unwrap_err().status(),
            Some(403)
        );

        alice.delete_share(&shares[0], Some("bob")).await.unwrap();
        assert!(bob.list_shares().await.unwrap().is_empty());
        assert_eq!(
            bob.download_share(&shares[0]).await.unwrap_err().reason(),
            "File not shared with requesting user"
        );
    }

    #[tokio::test]
    async fn test_delete_user_ends_session() {
        let api = signed_in("alice").await;
        api.delete_user().await.unwrap();
        assert!(api.read_self().await.unwrap_err().is_auth_required());
        let failure = api.login("alice", &PASSWORD.into()).await.unwrap_err();
        assert!(failure.is_auth_required());
    }
}

//! Hierarchical file navigator.
//!
//! Holds the current directory and the entries last fetched for it. A fetch
//! captures a [`Selector`] when it is dispatched and its result is applied
//! only if the selector is still current when it completes, so rapid
//! navigation can never leave a stale listing on screen.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use lockerbox_api::{Download, Entry, FileChange, RemoteApi};
use lockerbox_common::{absolute_path, RemotePath, ShareRecord};

use crate::completion::Completion;
use crate::loading::LoadingCounter;
use crate::notice::Notifier;
use crate::session::SessionView;

/// Label of breadcrumb 0, the root.
pub const ROOT_LABEL: &str = "Home";

/// Identifies the directory a fetch was issued for.
///
/// The generation changes on every navigation, so returning to a path does
/// not revive fetches issued for an earlier visit.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    path: RemotePath,
    generation: u64,
}

#[derive(Debug, Default)]
struct NavigatorState {
    path: RemotePath,
    generation: u64,
    entries: Vec<Entry>,
    /// Whether `entries` came from a completed fetch of `path`.
    loaded: bool,
}

impl NavigatorState {
    fn selector(&self) -> Selector {
        Selector {
            path: self.path.clone(),
            generation: self.generation,
        }
    }

    fn navigate(&mut self, path: RemotePath) {
        self.path = path;
        self.generation += 1;
        self.entries.clear();
        self.loaded = false;
    }
}

/// Immutable snapshot of the navigator for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryView {
    pub path: RemotePath,
    pub entries: Vec<Entry>,
    pub loaded: bool,
    pub is_loading: bool,
}

impl DirectoryView {
    /// Whether a completed fetch found no entries ("no files").
    pub fn is_empty(&self) -> bool {
        self.loaded && !self.is_loading && self.entries.is_empty()
    }

    /// Labels of the breadcrumbs; index 0 is always the root.
    pub fn breadcrumbs(&self) -> Vec<String> {
        std::iter::once(ROOT_LABEL.to_string())
            .chain(self.path.components().iter().cloned())
            .collect()
    }

    /// Look up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

/// Keeps a view of one remote directory consistent with the service.
pub struct FileNavigator {
    api: Arc<dyn RemoteApi>,
    session: SessionView,
    notifier: Notifier,
    state: RwLock<NavigatorState>,
    loading: LoadingCounter,
}

impl FileNavigator {
    /// Create a navigator positioned at the root.
    pub fn new(api: Arc<dyn RemoteApi>, session: SessionView, notifier: Notifier) -> Self {
        Self {
            api,
            session,
            notifier,
            state: RwLock::new(NavigatorState::default()),
            loading: LoadingCounter::new(),
        }
    }

    /// Snapshot of the current directory.
    pub async fn snapshot(&self) -> DirectoryView {
        let state = self.state.read().await;
        DirectoryView {
            path: state.path.clone(),
            entries: state.entries.clone(),
            loaded: state.loaded,
            is_loading: self.loading.is_loading(),
        }
    }

    pub async fn path(&self) -> RemotePath {
        self.state.read().await.path.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Fetch the entries of the current directory.
    ///
    /// A failure leaves the previous entries in place. Results for a
    /// directory the user has since left are dropped, failures included.
    pub async fn refresh(&self) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }

        let selector = self.state.read().await.selector();
        let _loading = self.loading.start();
        debug!("Listing {}", selector.path);

        let listing = match self.api.read_dir(&selector.path).await {
            Ok(listing) => listing,
            Err(failure) => {
                if self.state.read().await.selector() != selector {
                    debug!("Dropping failed listing of {}", selector.path);
                    return Completion::Discarded;
                }
                self.notifier
                    .report_unless_auth("Failed to load files", failure.clone());
                return Completion::Failed(failure);
            }
        };

        let mut state = self.state.write().await;
        if state.selector() != selector {
            debug!(
                "Discarding listing of {}; now at {}",
                selector.path, state.path
            );
            return Completion::Discarded;
        }
        state.entries = listing.children;
        state.loaded = true;
        Completion::Applied
    }

    /// Enter the child directory `name` and fetch it.
    pub async fn descend(&self, name: &str) -> Completion {
        {
            let mut state = self.state.write().await;
            match state.path.join(name) {
                Ok(path) => state.navigate(path),
                Err(e) => return Completion::Invalid(e.to_string()),
            }
        }
        self.refresh().await
    }

    /// Enter `name` if the current listing shows it as a directory.
    pub async fn open(&self, name: &str) -> Completion {
        let is_directory = {
            let state = self.state.read().await;
            state
                .entries
                .iter()
                .any(|entry| entry.name == name && entry.is_directory)
        };
        if is_directory {
            self.descend(name).await
        } else {
            Completion::Skipped
        }
    }

    /// Go back to breadcrumb `index` and fetch it.
    ///
    /// Breadcrumb 0 is the root; breadcrumb `i` keeps the first `i` segments.
    pub async fn ascend_to_breadcrumb(&self, index: usize) -> Completion {
        {
            let mut state = self.state.write().await;
            let path = state.path.truncated(index);
            state.navigate(path);
        }
        self.refresh().await
    }

    /// Resolve `name` inside the current directory.
    async fn child(&self, name: &str) -> Result<RemotePath, Completion> {
        self.state
            .read()
            .await
            .path
            .join(name)
            .map_err(|e| Completion::Invalid(e.to_string()))
    }

    /// Report a failed mutation, or refresh after a successful one.
    async fn settle(&self, context: &str, result: lockerbox_api::ApiResult<()>) -> Completion {
        match result {
            Ok(()) => self.refresh().await,
            Err(failure) => {
                self.notifier.report_unless_auth(context, failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Rename the entry `name` to `new_name`.
    pub async fn rename(&self, name: &str, new_name: &str) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        let target = match self.child(name).await {
            Ok(target) => target,
            Err(invalid) => return invalid,
        };
        if let Err(e) = RemotePath::root().join(new_name) {
            return Completion::Invalid(e.to_string());
        }

        debug!("Renaming {} to {}", target, new_name);
        let result = self
            .api
            .update_file(&target, &FileChange::Rename(new_name.to_string()))
            .await;
        self.settle("Failed to rename file", result).await
    }

    /// Move the entry `name` into `destination`.
    ///
    /// A destination without a leading separator is taken as absolute.
    pub async fn move_entry(&self, name: &str, destination: &str) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        let target = match self.child(name).await {
            Ok(target) => target,
            Err(invalid) => return invalid,
        };

        let destination = absolute_path(destination);
        debug!("Moving {} to {}", target, destination);
        let result = self
            .api
            .update_file(&target, &FileChange::Move(destination))
            .await;
        self.settle("Failed to move file", result).await
    }

    /// Delete the entry `name`.
    pub async fn remove(&self, name: &str) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        let target = match self.child(name).await {
            Ok(target) => target,
            Err(invalid) => return invalid,
        };

        debug!("Deleting {}", target);
        let result = self.api.delete_file(&target).await;
        self.settle("Failed to delete file", result).await
    }

    /// Upload `content` as `name` into the current directory.
    pub async fn upload(&self, name: &str, content: Vec<u8>) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        if let Err(e) = RemotePath::root().join(name) {
            return Completion::Invalid(e.to_string());
        }

        let directory = self.path().await;
        let result = self.api.upload_file(&directory, name, content).await;
        self.settle("Failed to upload file", result).await
    }

    /// Create the directory `name` inside the current directory.
    pub async fn create_directory(&self, name: &str) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        let target = match self.child(name).await {
            Ok(target) => target,
            Err(invalid) => return invalid,
        };

        let result = self.api.create_directory(&target).await;
        self.settle("Failed to create directory", result).await
    }

    /// Download the file `name` from the current directory.
    pub async fn download(&self, name: &str) -> Option<Download> {
        if !self.session.is_authenticated() {
            return None;
        }
        let target = self.child(name).await.ok()?;

        match self.api.download_file(&target).await {
            Ok(download) => Some(download),
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to download file", failure);
                None
            }
        }
    }

    /// Share the file `name` with `recipient`. Local state is unchanged.
    pub async fn share(&self, name: &str, recipient: &str) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        let target = match self.child(name).await {
            Ok(target) => target,
            Err(invalid) => return invalid,
        };

        match self.api.create_share(&target, recipient).await {
            Ok(()) => Completion::Applied,
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to share file", failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// The share record of one of the user's own files.
    async fn own_share(&self, name: &str) -> Option<ShareRecord> {
        let owner = self.session.username()?;
        let target = self.child(name).await.ok()?;
        Some(ShareRecord::new(owner, target.components().join("/")))
    }

    /// Users the file `name` is shared with.
    pub async fn share_recipients(&self, name: &str) -> Option<Vec<String>> {
        let share = self.own_share(name).await?;

        match self.api.describe_share(&share).await {
            Ok(recipients) => Some(recipients),
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to describe share", failure);
                None
            }
        }
    }

    /// Stop sharing the file `name` with `recipient`, or with everyone.
    pub async fn unshare(&self, name: &str, recipient: Option<&str>) -> Completion {
        let share = match self.own_share(name).await {
            Some(share) => share,
            None => return Completion::Skipped,
        };

        match self.api.delete_share(&share, recipient).await {
            Ok(()) => Completion::Applied,
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to revoke share", failure.clone());
                Completion::Failed(failure)
            }
        }
    }
}

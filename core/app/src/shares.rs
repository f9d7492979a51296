//! Inbound-share aggregator.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use lockerbox_api::{Download, RemoteApi};
use lockerbox_common::ShareRecord;

use crate::completion::Completion;
use crate::loading::LoadingCounter;
use crate::notice::Notifier;
use crate::session::SessionView;

/// Paths one user shared, in the order the service listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareGroup {
    pub owner: String,
    pub paths: Vec<String>,
}

/// Shares grouped by sharing user, groups in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareGroups {
    groups: Vec<ShareGroup>,
}

impl ShareGroups {
    /// Group `records` in a single pass.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ShareRecord>,
    {
        let mut groups: Vec<ShareGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for ShareRecord { owner, path } in records {
            match index.get(&owner) {
                Some(&i) => groups[i].paths.push(path),
                None => {
                    index.insert(owner.clone(), groups.len());
                    groups.push(ShareGroup {
                        owner,
                        paths: vec![path],
                    });
                }
            }
        }

        Self { groups }
    }

    /// Paths shared by `owner`.
    pub fn get(&self, owner: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|group| group.owner == owner)
            .map(|group| group.paths.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShareGroup> {
        self.groups.iter()
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.owner.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Default)]
struct ShareState {
    groups: ShareGroups,
    generation: u64,
}

/// Keeps the grouped list of files other users shared with this one.
pub struct ShareAggregator {
    api: Arc<dyn RemoteApi>,
    session: SessionView,
    notifier: Notifier,
    state: RwLock<ShareState>,
    loading: LoadingCounter,
}

impl ShareAggregator {
    pub fn new(api: Arc<dyn RemoteApi>, session: SessionView, notifier: Notifier) -> Self {
        Self {
            api,
            session,
            notifier,
            state: RwLock::new(ShareState::default()),
            loading: LoadingCounter::new(),
        }
    }

    /// Snapshot of the grouped shares.
    pub async fn groups(&self) -> ShareGroups {
        self.state.read().await.groups.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// Fetch the share list and regroup it from scratch.
    pub async fn refresh(&self) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }

        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.generation
        };
        let _loading = self.loading.start();

        let records = match self.api.list_shares().await {
            Ok(records) => records,
            Err(failure) => {
                if self.state.read().await.generation != generation {
                    debug!("Dropping failure of superseded refresh {}", generation);
                    return Completion::Discarded;
                }
                self.notifier
                    .report_unless_auth("Failed to load shared files", failure.clone());
                return Completion::Failed(failure);
            }
        };

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("Discarding share list from refresh {}", generation);
            return Completion::Discarded;
        }
        state.groups = ShareGroups::from_records(records);
        Completion::Applied
    }

    /// Download `path` as shared by `owner`.
    pub async fn download(&self, owner: &str, path: &str) -> Option<Download> {
        if !self.session.is_authenticated() {
            return None;
        }

        let share = ShareRecord::new(owner, path);
        match self.api.download_share(&share).await {
            Ok(download) => Some(download),
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to download file", failure);
                None
            }
        }
    }
}

//! Client-side session and resource-sync core for Lockerbox.
//!
//! This module provides the controllers a presentation layer drives:
//! - Session resolution, sign-in and account management
//! - Navigation of the remote file tree
//! - Conversations and message sending
//! - The grouped list of files shared with the user
//!
//! Controllers never panic on remote failures. Each operation returns a
//! [`Completion`], and failures the user should see are sent as [`Notice`]s
//! on the channel returned by [`App::new`].
//!
//! Responses are applied only while the request that produced them is still
//! current; a response for a directory or conversation the user has since
//! left is dropped.

pub mod app;
pub mod chat;
pub mod completion;
pub mod config;
pub mod credentials;
pub mod files;
pub mod guard;
pub mod loading;
pub mod notice;
pub mod session;
pub mod shares;

pub use app::App;
pub use chat::{ChatController, ChatView, ComposeFields, SelectedConversation};
pub use completion::Completion;
pub use config::ClientConfig;
pub use credentials::{check_new_password, CredentialError};
pub use files::{DirectoryView, FileNavigator, ROOT_LABEL};
pub use guard::GuardedApi;
pub use loading::{LoadingCounter, LoadingGuard};
pub use notice::{Notice, NoticeReceiver, Notifier};
pub use session::{Screen, Session, SessionController, SessionState, SessionView};
pub use shares::{ShareAggregator, ShareGroup, ShareGroups};

//! Root wiring of the client.

use std::sync::Arc;
use tracing::info;

use lockerbox_api::{HttpApi, RemoteApi};
use lockerbox_common::Result;

use crate::chat::ChatController;
use crate::completion::Completion;
use crate::config::ClientConfig;
use crate::files::FileNavigator;
use crate::guard::GuardedApi;
use crate::notice::{NoticeReceiver, Notifier};
use crate::session::{Session, SessionController, SessionState, SessionView};
use crate::shares::ShareAggregator;

/// One client: a session and the controllers acting on its behalf.
///
/// Every controller shares the same guarded API, so a 401 seen by any of
/// them ends the session for all.
pub struct App {
    session: SessionController,
    files: FileNavigator,
    chat: ChatController,
    shares: ShareAggregator,
}

impl App {
    /// Wire a client around `api`.
    ///
    /// Returns the receiving end of the notice channel; the presentation layer
    /// drains it.
    pub fn new(api: Arc<dyn RemoteApi>) -> (Self, NoticeReceiver) {
        let (notifier, notices) = Notifier::channel();
        let state = SessionState::new();
        let guarded: Arc<dyn RemoteApi> = Arc::new(GuardedApi::new(api, state.clone()));

        let app = Self {
            files: FileNavigator::new(guarded.clone(), state.view(), notifier.clone()),
            chat: ChatController::new(guarded.clone(), state.view(), notifier.clone()),
            shares: ShareAggregator::new(guarded.clone(), state.view(), notifier.clone()),
            session: SessionController::new(guarded, state, notifier),
        };
        (app, notices)
    }

    /// Wire a client talking HTTP to the configured server.
    ///
    /// # Errors
    /// - The configured server URL is invalid
    /// - The HTTP client cannot be built
    pub fn from_config(config: &ClientConfig) -> Result<(Self, NoticeReceiver)> {
        let base = config.api_base()?;
        info!("Using server {}", base);
        let api = HttpApi::new(base, &config.user_agent, config.timeout())?;
        Ok(Self::new(Arc::new(api)))
    }

    /// Resolve the session, then load the signed-in user's data.
    pub async fn start(&self) -> Session {
        let session = self.session.resolve().await;
        if session.is_authenticated() {
            self.load().await;
        }
        session
    }

    /// Load the directory, conversation and share views concurrently.
    pub async fn load(&self) -> [Completion; 3] {
        let (files, chats, shares) = tokio::join!(
            self.files.refresh(),
            self.chat.load_summaries(),
            self.shares.refresh()
        );
        [files, chats, shares]
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    pub fn files(&self) -> &FileNavigator {
        &self.files
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn shares(&self) -> &ShareAggregator {
        &self.shares
    }
}

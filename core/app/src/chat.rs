//! Chat session controller.
//!
//! Owns the conversation list, a single selected-conversation cursor and the
//! messages of the selected conversation. Message fetches are tagged with
//! the selection they were issued for and dropped when the cursor has moved
//! on by the time they complete.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use lockerbox_api::{ConversationSummary, Failure, RemoteApi};
use lockerbox_common::{ChatId, MessageRecord};

use crate::completion::Completion;
use crate::loading::LoadingCounter;
use crate::notice::Notifier;
use crate::session::SessionView;

/// Reason the service gives when a new conversation names an unknown user.
const UNKNOWN_RECIPIENT: &str = "Specified recipient does not exist";

/// Identifies the selection a message fetch was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectionToken {
    id: ChatId,
    generation: u64,
}

#[derive(Debug, Default)]
struct ChatState {
    summaries: Vec<ConversationSummary>,
    /// Generation of the newest list load; older loads are not applied.
    list_generation: u64,
    selected: Option<ChatId>,
    selection_generation: u64,
    /// Messages of the selected conversation; `None` until fetched.
    messages: Option<Vec<MessageRecord>>,
    compose: ComposeFields,
}

impl ChatState {
    fn selection_token(&self) -> Option<SelectionToken> {
        self.selected.as_ref().map(|id| SelectionToken {
            id: id.clone(),
            generation: self.selection_generation,
        })
    }

    fn set_selection(&mut self, id: Option<ChatId>) {
        self.selected = id;
        self.selection_generation += 1;
        self.messages = None;
    }
}

/// Text fields of the chat screen, owned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeFields {
    /// Message being written to the selected conversation.
    pub message: String,
    /// Recipient of a new conversation.
    pub recipient: String,
    /// First message of a new conversation.
    pub initial_message: String,
}

/// Snapshot of the selected conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedConversation {
    pub id: ChatId,
    /// Summary from the conversation list, if it is listed.
    pub summary: Option<ConversationSummary>,
    pub messages: Option<Vec<MessageRecord>>,
    pub loading: bool,
}

/// Snapshot of the chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatView {
    pub summaries: Vec<ConversationSummary>,
    pub loading: bool,
    pub selected: Option<SelectedConversation>,
    pub compose: ComposeFields,
}

/// Multiplexes the selected-conversation cursor against message fetches.
pub struct ChatController {
    api: Arc<dyn RemoteApi>,
    session: SessionView,
    notifier: Notifier,
    state: RwLock<ChatState>,
    list_loading: LoadingCounter,
    detail_loading: LoadingCounter,
}

impl ChatController {
    pub fn new(api: Arc<dyn RemoteApi>, session: SessionView, notifier: Notifier) -> Self {
        Self {
            api,
            session,
            notifier,
            state: RwLock::new(ChatState::default()),
            list_loading: LoadingCounter::new(),
            detail_loading: LoadingCounter::new(),
        }
    }

    /// The participant of `summary` that is not `me`.
    pub fn counterpart<'a>(summary: &'a ConversationSummary, me: &str) -> &'a str {
        summary.counterpart(me)
    }

    pub async fn snapshot(&self) -> ChatView {
        let state = self.state.read().await;
        ChatView {
            summaries: state.summaries.clone(),
            loading: self.list_loading.is_loading(),
            selected: self.selected_from(&state),
            compose: state.compose.clone(),
        }
    }

    /// Snapshot of the selected conversation.
    pub async fn selected(&self) -> Option<SelectedConversation> {
        let state = self.state.read().await;
        self.selected_from(&state)
    }

    fn selected_from(&self, state: &ChatState) -> Option<SelectedConversation> {
        let id = state.selected.clone()?;
        let summary = state.summaries.iter().find(|s| s.id == id).cloned();
        Some(SelectedConversation {
            id,
            summary,
            messages: state.messages.clone(),
            loading: self.detail_loading.is_loading(),
        })
    }

    pub async fn compose(&self) -> ComposeFields {
        self.state.read().await.compose.clone()
    }

    pub async fn set_message(&self, text: impl Into<String>) {
        self.state.write().await.compose.message = text.into();
    }

    pub async fn set_recipient(&self, recipient: impl Into<String>) {
        self.state.write().await.compose.recipient = recipient.into();
    }

    pub async fn set_initial_message(&self, text: impl Into<String>) {
        self.state.write().await.compose.initial_message = text.into();
    }

    /// Load the conversation list, reading every conversation for its
    /// participants.
    ///
    /// The list is replaced only once every read has finished. A failed read
    /// is reported on its own and leaves that conversation out.
    pub async fn load_summaries(&self) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }

        let generation = {
            let mut state = self.state.write().await;
            state.list_generation += 1;
            state.list_generation
        };
        let _loading = self.list_loading.start();

        let ids = match self.api.list_chats().await {
            Ok(ids) => ids,
            Err(failure) => {
                if self.state.read().await.list_generation != generation {
                    debug!("Dropping failure of superseded list load {}", generation);
                    return Completion::Discarded;
                }
                self.notifier
                    .report_unless_auth("Failed loading chat list", failure.clone());
                return Completion::Failed(failure);
            }
        };

        let reads = ids.iter().map(|id| async move { (id, self.api.read_chat(id).await) });
        let mut summaries = Vec::with_capacity(ids.len());
        let mut failures = Vec::new();
        for (id, result) in join_all(reads).await {
            match result {
                Ok(detail) => summaries.push(detail.summary),
                Err(failure) => failures.push((id, failure)),
            }
        }

        let mut state = self.state.write().await;
        if state.list_generation != generation {
            debug!("Discarding conversation list from load {}", generation);
            return Completion::Discarded;
        }
        for (id, failure) in failures {
            self.notifier
                .report_unless_auth(format!("Failed to load chat data for {}", id), failure);
        }
        state.summaries = summaries;
        let gone = state
            .selected
            .as_ref()
            .is_some_and(|selected| !ids.contains(selected));
        if gone {
            debug!("Selected conversation is gone");
            state.set_selection(None);
        }
        Completion::Applied
    }

    /// Move the cursor to `id` and fetch its messages.
    ///
    /// Selecting the conversation that is already selected does nothing.
    pub async fn select(&self, id: ChatId) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }

        let token = {
            let mut state = self.state.write().await;
            if state.selected.as_ref() == Some(&id) {
                return Completion::Skipped;
            }
            state.set_selection(Some(id.clone()));
            SelectionToken {
                id,
                generation: state.selection_generation,
            }
        };
        self.fetch_messages(token).await
    }

    /// Clear the cursor.
    pub async fn deselect(&self) {
        let mut state = self.state.write().await;
        if state.selected.is_some() {
            state.set_selection(None);
        }
    }

    /// Fetch the selected conversation's messages again.
    pub async fn refresh_selected(&self) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        match self.state.read().await.selection_token() {
            Some(token) => self.fetch_messages(token).await,
            None => Completion::Skipped,
        }
    }

    async fn fetch_messages(&self, token: SelectionToken) -> Completion {
        let _loading = self.detail_loading.start();
        debug!("Fetching messages of {}", token.id);

        let messages = match self.api.list_messages(&token.id).await {
            Ok(messages) => messages,
            Err(failure) => {
                if self.state.read().await.selection_token().as_ref() != Some(&token) {
                    debug!("Dropping failed fetch of {}; selection moved", token.id);
                    return Completion::Discarded;
                }
                self.notifier.report_unless_auth(
                    format!("Failed to load messages for {}", token.id),
                    failure.clone(),
                );
                return Completion::Failed(failure);
            }
        };

        let mut state = self.state.write().await;
        if state.selection_token().as_ref() != Some(&token) {
            debug!("Discarding messages of {}; selection moved", token.id);
            return Completion::Discarded;
        }
        state.messages = Some(messages);
        Completion::Applied
    }

    /// Start a conversation from the compose fields, then reload the list.
    pub async fn create_conversation(&self) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }
        let ComposeFields {
            recipient,
            initial_message,
            ..
        } = self.compose().await;

        match self.api.create_chat(&recipient, &initial_message).await {
            Ok(()) => {
                {
                    let mut state = self.state.write().await;
                    state.compose.recipient.clear();
                    state.compose.initial_message.clear();
                }
                self.load_summaries().await
            }
            Err(failure) => {
                if failure.status() == Some(400) && failure.reason() == UNKNOWN_RECIPIENT {
                    self.notifier.report(
                        "Failed to create new chat",
                        Failure::from_status(400, "specified user does not exist"),
                    );
                } else {
                    self.notifier
                        .report_unless_auth("Failed to create new chat", failure.clone());
                }
                Completion::Failed(failure)
            }
        }
    }

    /// Delete a conversation, then reload the list.
    pub async fn delete_conversation(&self, id: &ChatId) -> Completion {
        if !self.session.is_authenticated() {
            return Completion::Skipped;
        }

        match self.api.delete_chat(id).await {
            Ok(()) => {
                {
                    let mut state = self.state.write().await;
                    if state.selected.as_ref() == Some(id) {
                        state.set_selection(None);
                    }
                }
                self.load_summaries().await
            }
            Err(failure) => {
                self.notifier
                    .report_unless_auth(format!("Failed to delete chat {}", id), failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Send the compose message to the selected conversation.
    ///
    /// On success the message is appended locally without re-reading the
    /// conversation and the compose field is cleared. On failure both are
    /// left as they were.
    ///
    /// When the messages are still being fetched there is nothing to append
    /// to; the pending fetch is superseded by a new one, which includes the
    /// sent message.
    pub async fn send_message(&self) -> Completion {
        let sender = match self.session.username() {
            Some(sender) => sender,
            None => return Completion::Skipped,
        };
        let (token, text) = {
            let state = self.state.read().await;
            match state.selection_token() {
                Some(token) => (token, state.compose.message.clone()),
                None => return Completion::Skipped,
            }
        };
        if text.is_empty() {
            return Completion::Invalid("Message cannot be empty".to_string());
        }

        if let Err(failure) = self.api.send_message(&token.id, &text).await {
            self.notifier.report_unless_auth(
                format!("Failed to send message to {}", token.id),
                failure.clone(),
            );
            return Completion::Failed(failure);
        }

        let mut state = self.state.write().await;
        if state.compose.message == text {
            state.compose.message.clear();
        }
        if state.selection_token().as_ref() != Some(&token) {
            debug!("Sent to {} after the selection moved", token.id);
            return Completion::Discarded;
        }
        if let Some(messages) = state.messages.as_mut() {
            messages.push(MessageRecord::new(sender, text));
            return Completion::Applied;
        }

        debug!("Sent to {} before its messages arrived; fetching again", token.id);
        state.selection_generation += 1;
        let refetch = SelectionToken {
            id: token.id,
            generation: state.selection_generation,
        };
        drop(state);
        self.fetch_messages(refetch).await
    }
}

//! Session state and the controller that drives it.
//!
//! The session is the single process-wide fact of whether the client is
//! signed in, and as whom. It lives in a [`watch`] channel: the
//! [`SessionState`] writer is held by the session controller and the
//! [`crate::GuardedApi`], every other component gets a read-only
//! [`SessionView`].

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use lockerbox_api::{RemoteApi, User};
use lockerbox_common::SensitiveString;

use crate::completion::Completion;
use crate::credentials::check_new_password;
use crate::notice::Notifier;

/// The client's belief about its authentication identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Not yet resolved.
    Unresolved,
    Anonymous,
    Authenticated(User),
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Screens of the client, for session gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Home,
    SignIn,
    SignUp,
    Files,
    Chat,
    Shared,
    Account,
    /// Shown while the session is unresolved.
    Loading,
}

impl Screen {
    /// Screens that need a signed-in user.
    pub fn is_protected(self) -> bool {
        matches!(
            self,
            Screen::Files | Screen::Chat | Screen::Shared | Screen::Account
        )
    }
}

/// Read-only access to the session.
#[derive(Debug, Clone)]
pub struct SessionView {
    rx: watch::Receiver<Session>,
}

impl SessionView {
    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    /// Username of the signed-in user.
    pub fn username(&self) -> Option<String> {
        self.rx.borrow().user().map(|user| user.username.clone())
    }

    /// The screen actually reachable when `requested` is asked for.
    pub fn route(&self, requested: Screen) -> Screen {
        match &*self.rx.borrow() {
            Session::Unresolved => Screen::Loading,
            Session::Anonymous if requested.is_protected() => Screen::SignIn,
            Session::Authenticated(_) if matches!(requested, Screen::SignIn | Screen::SignUp) => {
                Screen::Home
            }
            _ => requested,
        }
    }

    /// Wait for the next session change and return it.
    ///
    /// Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.current())
    }
}

/// Writer side of the session.
///
/// Only the transitions below change the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<Session>>,
}

impl SessionState {
    /// Create an unresolved session.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::Unresolved);
        Self { tx: Arc::new(tx) }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            rx: self.tx.subscribe(),
        }
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    fn authenticate(&self, user: User) {
        info!("Signed in as {}", user.username);
        self.tx.send_replace(Session::Authenticated(user));
    }

    fn sign_out(&self) {
        info!("Signed out");
        self.tx.send_replace(Session::Anonymous);
    }

    /// Demote an authenticated session after the service rejected it.
    ///
    /// Other states are left alone; an unresolved session is settled by
    /// `SessionController::resolve`.
    pub fn expire(&self) {
        let expired = self.tx.send_if_modified(|session| {
            if session.is_authenticated() {
                *session = Session::Anonymous;
                true
            } else {
                false
            }
        });
        if expired {
            info!("Session expired");
        }
    }

    /// Replace the display name of the signed-in user.
    fn update_name(&self, name: &str) {
        self.tx.send_if_modified(|session| match session {
            Session::Authenticated(user) => {
                user.name = name.to_string();
                true
            }
            _ => false,
        });
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the session through its transitions and owns account operations.
pub struct SessionController {
    api: Arc<dyn RemoteApi>,
    state: SessionState,
    notifier: Notifier,
}

impl SessionController {
    pub fn new(api: Arc<dyn RemoteApi>, state: SessionState, notifier: Notifier) -> Self {
        Self {
            api,
            state,
            notifier,
        }
    }

    pub fn view(&self) -> SessionView {
        self.state.view()
    }

    pub fn current(&self) -> Session {
        self.state.current()
    }

    /// Resolve the session by reading the signed-in user.
    ///
    /// Any failure resolves to anonymous; failures other than 401 are also
    /// reported.
    pub async fn resolve(&self) -> Session {
        match self.api.read_self().await {
            Ok(user) => self.state.authenticate(user),
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to read user data", failure);
                self.state.sign_out();
            }
        }
        self.current()
    }

    /// Sign in, then read the signed-in user.
    ///
    /// The session only becomes authenticated when both steps succeed.
    pub async fn login(&self, username: &str, password: &SensitiveString) -> Completion {
        if let Err(failure) = self.api.login(username, password).await {
            self.notifier.report("Failed to log in", failure.clone());
            return Completion::Failed(failure);
        }

        match self.api.read_self().await {
            Ok(user) => {
                self.state.authenticate(user);
                Completion::Applied
            }
            Err(failure) => {
                self.notifier
                    .report("Failed to read user data", failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Sign out. A 401 means the session was already gone.
    pub async fn logout(&self) -> Completion {
        match self.api.logout().await {
            Ok(()) => {
                self.state.sign_out();
                Completion::Applied
            }
            Err(failure) if failure.is_auth_required() => {
                debug!("Logout found no session");
                self.state.sign_out();
                Completion::Applied
            }
            Err(failure) => {
                self.notifier.report("Failed to log out", failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Replace the signed-in user's display name; no-op without a session.
    pub fn update_name(&self, name: &str) {
        self.state.update_name(name);
    }

    /// Create an account. The session is unchanged.
    pub async fn register(
        &self,
        username: &str,
        password: &SensitiveString,
        confirm: &SensitiveString,
        name: &str,
    ) -> Completion {
        if let Err(e) = check_new_password(password, confirm) {
            return Completion::Invalid(e.to_string());
        }

        match self.api.register(username, password, name).await {
            Ok(()) => {
                info!("Registered {}", username);
                Completion::Applied
            }
            Err(failure) => {
                self.notifier.report("Failed to sign up", failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Update the display name and, when either password field is filled,
    /// the password.
    pub async fn update_account(
        &self,
        name: &str,
        password: &SensitiveString,
        confirm: &SensitiveString,
    ) -> Completion {
        if !self.state.current().is_authenticated() {
            return Completion::Skipped;
        }
        if !password.is_empty() || !confirm.is_empty() {
            if let Err(e) = check_new_password(password, confirm) {
                return Completion::Invalid(e.to_string());
            }
        }

        match self.api.update_user(name, password).await {
            Ok(()) => {
                if !name.is_empty() {
                    self.update_name(name);
                }
                Completion::Applied
            }
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to update user", failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Delete the signed-in account and sign out.
    pub async fn delete_account(&self) -> Completion {
        if !self.state.current().is_authenticated() {
            return Completion::Skipped;
        }

        match self.api.delete_user().await {
            Ok(()) => {
                self.state.sign_out();
                Completion::Applied
            }
            Err(failure) => {
                self.notifier
                    .report_unless_auth("Failed to delete account", failure.clone());
                Completion::Failed(failure)
            }
        }
    }

    /// Read another user by username.
    pub async fn lookup_user(&self, username: &str) -> Option<User> {
        match self.api.read_user(username).await {
            Ok(user) => Some(user),
            Err(failure) => {
                self.notifier
                    .report_unless_auth(format!("Failed to read user {}", username), failure);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockerbox_api::MemoryApi;

    const PASSWORD: &str = "Secret-123";

    async fn controller() -> (SessionController, Arc<MemoryApi>, crate::NoticeReceiver) {
        let api = Arc::new(MemoryApi::new());
        api.add_user("alice", PASSWORD, "Alice").await;
        let (notifier, rx) = Notifier::channel();
        let controller = SessionController::new(api.clone(), SessionState::new(), notifier);
        (controller, api, rx)
    }

    #[test]
    fn test_route_gating() {
        let state = SessionState::new();
        let view = state.view();
        assert_eq!(view.route(Screen::Files), Screen::Loading);

        state.sign_out();
        assert_eq!(view.route(Screen::Files), Screen::SignIn);
        assert_eq!(view.route(Screen::SignUp), Screen::SignUp);
        assert_eq!(view.route(Screen::Home), Screen::Home);

        state.authenticate(User::new("alice", "Alice"));
        assert_eq!(view.route(Screen::SignIn), Screen::Home);
        assert_eq!(view.route(Screen::Chat), Screen::Chat);
    }

    #[test]
    fn test_expire_only_demotes_authenticated() {
        let state = SessionState::new();
        state.expire();
        assert_eq!(state.current(), Session::Unresolved);

        state.authenticate(User::new("alice", "Alice"));
        state.expire();
        assert_eq!(state.current(), Session::Anonymous);
    }

    #[test]
    fn test_update_name_requires_session() {
        let state = SessionState::new();
        state.sign_out();
        state.update_name("Bob");
        assert_eq!(state.current(), Session::Anonymous);

        state.authenticate(User::new("alice", "Alice"));
        state.update_name("Ally");
        assert_eq!(state.current().user().unwrap().name, "Ally");
    }

    #[tokio::test]
    async fn test_resolve_without_session_is_anonymous_and_silent() {
        let (controller, _api, mut rx) = controller().await;
        assert_eq!(controller.resolve().await, Session::Anonymous);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_unreachable_fails_open() {
        let (controller, api, mut rx) = controller().await;
        api.set_offline(true);
        assert_eq!(controller.resolve().await, Session::Anonymous);
        assert_eq!(rx.try_recv().unwrap().context, "Failed to read user data");
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let (controller, _api, _rx) = controller().await;
        controller.resolve().await;

        let completion = controller.login("alice", &PASSWORD.into()).await;
        assert!(completion.is_applied());
        assert_eq!(
            controller.current(),
            Session::Authenticated(User::new("alice", "Alice"))
        );

        assert!(controller.logout().await.is_applied());
        assert_eq!(controller.current(), Session::Anonymous);
    }

    #[tokio::test]
    async fn test_wrong_password_stays_anonymous_with_reason() {
        let (controller, _api, mut rx) = controller().await;
        controller.resolve().await;

        let completion = controller.login("alice", &"wrong".into()).await;
        assert_eq!(
            completion.failure().map(|f| f.reason()),
            Some("Invalid username or password")
        );
        assert_eq!(controller.current(), Session::Anonymous);
        assert_eq!(rx.try_recv().unwrap().context, "Failed to log in");
    }

    #[tokio::test]
    async fn test_logout_after_expiry_signs_out() {
        let (controller, api, _rx) = controller().await;
        controller.login("alice", &PASSWORD.into()).await;
        api.expire_session().await;

        assert!(controller.logout().await.is_applied());
        assert_eq!(controller.current(), Session::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_transport_failure_keeps_session() {
        let (controller, api, mut rx) = controller().await;
        controller.login("alice", &PASSWORD.into()).await;
        api.set_offline(true);

        assert!(controller.logout().await.failure().is_some());
        assert!(controller.current().is_authenticated());
        assert_eq!(rx.try_recv().unwrap().context, "Failed to log out");
    }

    #[tokio::test]
    async fn test_register_checks_confirmation_first() {
        let (controller, _api, _rx) = controller().await;
        let completion = controller
            .register("bob", &PASSWORD.into(), &"Other-123".into(), "Bob")
            .await;
        assert_eq!(completion, Completion::Invalid("Passwords do not match".to_string()));

        let completion = controller
            .register("bob", &PASSWORD.into(), &PASSWORD.into(), "Bob")
            .await;
        assert!(completion.is_applied());
        assert!(controller.login("bob", &PASSWORD.into()).await.is_applied());
    }

    #[tokio::test]
    async fn test_update_account_renames_locally() {
        let (controller, _api, _rx) = controller().await;
        controller.login("alice", &PASSWORD.into()).await;

        let empty = SensitiveString::default();
        let completion = controller.update_account("Ally", &empty, &empty).await;
        assert!(completion.is_applied());
        assert_eq!(controller.current().user().unwrap().name, "Ally");
    }

    #[tokio::test]
    async fn test_delete_account_signs_out() {
        let (controller, _api, _rx) = controller().await;
        controller.login("alice", &PASSWORD.into()).await;

        assert!(controller.delete_account().await.is_applied());
        assert_eq!(controller.current(), Session::Anonymous);
        assert_eq!(controller.delete_account().await, Completion::Skipped);
    }

    #[tokio::test]
    async fn test_lookup_user() {
        let (controller, api, mut rx) = controller().await;
        api.add_user("bob", PASSWORD, "Bob").await;
        controller.login("alice", &PASSWORD.into()).await;

        assert_eq!(controller.lookup_user("bob").await, Some(User::new("bob", "Bob")));
        assert_eq!(controller.lookup_user("carol").await, None);
        assert_eq!(rx.try_recv().unwrap().failure.status(), Some(404));
    }
}

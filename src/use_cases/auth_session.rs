use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::entities::{Credentials, Registration, Session, User};
use crate::domain::errors::ActionError;
use crate::domain::ports::{AuthApi, KeyValueStorage, Notifier};

// Durable storage keys for the mirrored session.
pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

// Snapshot of authentication state published to dependents.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    // True until the stored session has been restored (or found absent).
    pub loading: bool,
    pub session: Option<Session>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            loading: true,
            session: None,
        }
    }
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }
}

// Holds the current session, mirrors it to durable storage and keeps the
// outgoing authorization header in step with it.
pub struct AuthSessionStore<A, S, N> {
    api: A,
    storage: S,
    notifier: N,
    state: watch::Sender<AuthState>,
    initialized: AtomicBool,
}

impl<A, S, N> AuthSessionStore<A, S, N>
where
    A: AuthApi,
    S: KeyValueStorage,
    N: Notifier,
{
    pub fn new(api: A, storage: S, notifier: N) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            api,
            storage,
            notifier,
            state,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    // Restores the stored session. Runs once; later calls are no-ops.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }

        let restored = self.restore_session();
        if let Some(session) = &restored {
            self.api.set_bearer_token(Some(&session.token));
            debug!(user_id = session.user.id, "stored session restored.");
        }

        self.state.send_modify(|state| {
            state.session = restored;
            state.loading = false;
        });
    }

    #[tracing::instrument(name = "login", skip_all, fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ActionError> {
        let session = match self.api.sign_in(credentials).await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "login failed.");
                let message = err.upstream_message().unwrap_or("Login failed").to_string();
                self.notifier.error(&message);
                return Err(ActionError::Rejected(message));
            }
        };

        self.persist(&session);
        self.api.set_bearer_token(Some(&session.token));
        info!(user_id = session.user.id, "login succeeded.");
        self.state.send_modify(|state| state.session = Some(session));

        self.notifier.success("Login successful!");
        Ok(())
    }

    // Creates the account only; the caller still has to log in.
    #[tracing::instrument(name = "register", skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<(), ActionError> {
        if let Err(err) = self.api.sign_up(registration).await {
            warn!(error = %err, "registration failed.");
            let message = err
                .upstream_message()
                .unwrap_or("Registration failed")
                .to_string();
            self.notifier.error(&message);
            return Err(ActionError::Rejected(message));
        }

        info!("registration succeeded.");
        self.notifier.success("Registration successful! Please login.");
        Ok(())
    }

    pub fn logout(&self) {
        self.forget();
        self.api.set_bearer_token(None);
        self.state.send_modify(|state| state.session = None);
        info!("logged out.");
        self.notifier.success("Logged out successfully");
    }

    fn restore_session(&self) -> Option<Session> {
        let token = self.read(TOKEN_KEY)?;
        let raw_user = self.read(USER_KEY)?;

        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => Some(Session { token, user }),
            Err(err) => {
                // Corrupt mirror: drop it without bothering the user.
                debug!(error = %err, "discarding malformed stored session.");
                self.forget();
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|value| !value.is_empty()),
            Err(err) => {
                warn!(key, error = %err, "failed to read stored session entry.");
                None
            }
        }
    }

    // Best-effort: the in-memory session stays authoritative if the mirror fails.
    // The mirror holds both entries or neither.
    fn persist(&self, session: &Session) {
        let raw_user = match serde_json::to_string(&session.user) {
            Ok(raw_user) => raw_user,
            Err(err) => {
                warn!(error = %err, "failed to serialize session user.");
                return;
            }
        };
        if let Err(err) = self.storage.set(TOKEN_KEY, &session.token) {
            warn!(error = %err, "failed to persist session token.");
            return;
        }
        if let Err(err) = self.storage.set(USER_KEY, &raw_user) {
            warn!(error = %err, "failed to persist session user.");
            if let Err(err) = self.storage.remove(TOKEN_KEY) {
                warn!(error = %err, "failed to roll back session token.");
            }
        }
    }

    fn forget(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, error = %err, "failed to remove stored session entry.");
            }
        }
    }
}

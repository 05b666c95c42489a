//! Session store: the bearer token and the user it belongs to.
//!
//! Every protected view gates on [`SessionState`]. The token is persisted
//! through a [`TokenStorage`] so a restart restores the session without
//! asking for credentials again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use groupwatch_shared::{ApiError, LoginRequest, RegisterRequest, User};
use tokio::sync::watch;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::forms;
use crate::storage::TokenStorage;
use crate::ws::TokenSource;

/// Who is logged in.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// A stored token is being checked against the backend.
    Resolving,
    Authenticated(User),
    Anonymous,
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

struct Inner {
    config: ClientConfig,
    storage: Arc<dyn TokenStorage>,
    token: Mutex<Option<String>>,
    state: watch::Sender<SessionState>,
}

/// Shared handle to the session. Clones see the same state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Load any stored token. With one present the session starts out
    /// [`SessionState::Resolving`] until [`Session::restore`] runs.
    pub fn new(config: ClientConfig, storage: Arc<dyn TokenStorage>) -> Self {
        let token = storage.load_token().filter(|t| !t.is_empty());
        let initial = if token.is_some() {
            SessionState::Resolving
        } else {
            SessionState::Anonymous
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                config,
                storage,
                token: Mutex::new(token),
                state,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn token(&self) -> Option<String> {
        self.lock_token().clone()
    }

    /// Token lookup for the realtime channel.
    pub fn token_source(&self) -> TokenSource {
        let session = self.clone();
        Arc::new(move || session.token())
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(|u| u.is_admin)
    }

    /// Create an API client configured for the current session
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.inner.config).with_token(self.token())
    }

    /// Resolve a stored token into a user. Any failure drops the token and
    /// leaves the session anonymous without surfacing an error.
    pub async fn restore(&self) -> Option<User> {
        let Some(token) = self.token() else {
            self.inner.state.send_replace(SessionState::Anonymous);
            return None;
        };

        self.inner.state.send_replace(SessionState::Resolving);
        let client = ApiClient::new(&self.inner.config).with_token(Some(token.clone()));
        match client.me().await {
            Ok(user) => {
                if self.token().as_deref() != Some(token.as_str()) {
                    // Logged out or replaced while resolving.
                    return self.user();
                }
                tracing::info!(user_id = user.id, "session restored");
                self.inner
                    .state
                    .send_replace(SessionState::Authenticated(user.clone()));
                Some(user)
            }
            Err(e) => {
                tracing::info!(error = %e, "stored session rejected, signing out");
                if self.token().as_deref() == Some(token.as_str()) {
                    self.clear();
                }
                None
            }
        }
    }

    /// Exchange credentials for a token, then load the profile. State only
    /// changes once both succeed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        forms::validate_login(email, password)?;

        let anonymous = ApiClient::new(&self.inner.config);
        let token = anonymous
            .login(&LoginRequest {
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;

        let user = anonymous
            .with_token(Some(token.access_token.clone()))
            .me()
            .await?;

        if !self.inner.storage.save_token(&token.access_token) {
            tracing::warn!("failed to persist session token");
        }
        *self.lock_token() = Some(token.access_token);
        self.inner
            .state
            .send_replace(SessionState::Authenticated(user.clone()));
        tracing::info!(user_id = user.id, "logged in");
        Ok(user)
    }

    /// Create an account, then log in with the same credentials.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        forms::validate_registration(username, email, password)?;

        let created = ApiClient::new(&self.inner.config)
            .register(&RegisterRequest {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password: password.to_string(),
            })
            .await?;
        tracing::info!(user_id = created.id, "account registered");

        self.login(email, password).await
    }

    /// Local logout; the backend is not contacted.
    pub fn logout(&self) {
        tracing::info!("logged out");
        self.clear();
    }

    /// Drop a session the backend no longer accepts.
    pub fn expire(&self) {
        if self.token().is_some() {
            tracing::warn!("session expired");
        }
        self.clear();
    }

    /// Pass a result through, expiring the session on a 401.
    pub fn check<T>(&self, result: Result<T, ApiError>) -> Result<T, ClientError> {
        match result {
            Err(e) if e.is_unauthorized() => {
                self.expire();
                Err(ClientError::Api(e))
            }
            other => other.map_err(ClientError::from),
        }
    }

    fn clear(&self) {
        *self.lock_token() = None;
        self.inner.storage.remove_token();
        self.inner.state.send_replace(SessionState::Anonymous);
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<String>> {
        self.inner.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

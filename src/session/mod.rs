//! Session manager: the single owner of the current identity and of the
//! persisted token. It resolves the stored token once on start and then only
//! changes state through `login`, `admin_login` and `logout`.
//!
//! Every transition is published as one whole [`SessionState`] on a `watch`
//! channel, so subscribers never see a token committed without its identity.
//! Failures at the operation boundary are logged and normalized; tokens and
//! passwords are never logged.

mod resolve;
mod state;

pub use resolve::{Resolution, resolve};
pub use state::SessionState;

use crate::{
    client::{AuthBackend, LoginResponse},
    error::AuthError,
    identity::{Identity, IdentityPayload},
    store::TokenStore,
};
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct SessionManager<B, S> {
    backend: B,
    store: S,
    state: watch::Sender<SessionState>,
}

impl<B: AuthBackend, S: TokenStore> SessionManager<B, S> {
    /// Creates a manager in the starting state (`loading`, no identity).
    /// Call [`SessionManager::initialize`] to resolve the stored token.
    pub fn new(backend: B, store: S) -> Self {
        let (state, _) = watch::channel(SessionState::starting());
        Self {
            backend,
            store,
            state,
        }
    }

    /// Resolves the stored token into an identity. Runs once; later calls
    /// return without touching state.
    pub async fn initialize(&self) {
        if !self.state.borrow().loading {
            debug!("session already resolved");
            return;
        }

        let token = match self.store.get() {
            Ok(token) => token,
            Err(err) => {
                error!("failed to read stored token: {err}");
                None
            }
        };

        let Some(token) = token else {
            debug!("no stored token");
            self.finish_loading(None);
            return;
        };

        let identity = match resolve(&self.backend, &token).await {
            Resolution::Invalid => {
                warn!("stored token was rejected, signing out");
                if let Err(err) = self.store.clear() {
                    error!("failed to discard stored token: {err}");
                }
                None
            }
            resolution => resolution.into_identity(),
        };

        if let Some(identity) = &identity {
            info!(role = %identity.role, "session restored");
        }
        self.finish_loading(identity);
    }

    /// Authenticates a regular account, persists the returned token and commits
    /// the identity.
    ///
    /// # Errors
    /// Returns [`AuthError::AuthenticationFailed`] if the backend rejects the
    /// credentials, cannot be reached, or answers without a token and identity.
    /// Returns [`AuthError::Storage`] if the token cannot be persisted. State is
    /// unchanged on error.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Identity, AuthError> {
        let response = self
            .backend
            .authenticate_user(email, password)
            .await
            .map_err(|err| {
                warn!("login failed: {err}");
                AuthError::rejected(&err)
            })?;

        let (token, payload) = split_login_response(response)?;
        let identity = Identity::try_from(payload).map_err(|err| {
            warn!("login returned an invalid identity: {err}");
            AuthError::AuthenticationFailed {
                reason: err.to_string(),
            }
        })?;

        self.commit_login(&token, identity)
    }

    /// Authenticates an admin account. The committed identity always carries
    /// the admin role and the `adminId` from the response.
    ///
    /// # Errors
    /// Same contract as [`SessionManager::login`]; the reason carries the
    /// backend's `message` when it sent one.
    pub async fn admin_login(
        &self,
        admin_id: &str,
        password: &SecretString,
    ) -> Result<Identity, AuthError> {
        let response = self
            .backend
            .authenticate_admin(admin_id, password)
            .await
            .map_err(|err| {
                warn!("admin login failed: {err}");
                AuthError::rejected(&err)
            })?;

        let (token, payload) = split_login_response(response)?;
        let identity = payload.into_admin().map_err(|err| {
            warn!("admin login returned an invalid identity: {err}");
            AuthError::AuthenticationFailed {
                reason: err.to_string(),
            }
        })?;

        self.commit_login(&token, identity)
    }

    /// Discards the stored token and clears the identity. No network call.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] if the token could not be removed; the
    /// in-memory identity is cleared regardless.
    pub fn logout(&self) -> Result<(), AuthError> {
        let cleared = self.store.clear();
        self.set_identity(None);
        info!("signed out");

        cleared.map_err(|err| {
            error!("failed to discard stored token: {err}");
            err.into()
        })
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Receives every state published after this call.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn commit_login(&self, token: &SecretString, identity: Identity) -> Result<Identity, AuthError> {
        self.store.set(token).map_err(|err| {
            error!("failed to persist token: {err}");
            AuthError::from(err)
        })?;
        self.set_identity(Some(identity.clone()));
        info!(role = %identity.role, "signed in");
        Ok(identity)
    }

    fn set_identity(&self, identity: Option<Identity>) {
        self.state.send_modify(|state| state.identity = identity);
    }

    fn finish_loading(&self, identity: Option<Identity>) {
        self.state.send_replace(SessionState {
            identity,
            loading: false,
        });
    }
}

fn split_login_response(
    response: LoginResponse,
) -> Result<(SecretString, IdentityPayload), AuthError> {
    let token = response.token.filter(|token| !token.trim().is_empty());

    match (token, response.user) {
        (Some(token), Some(user)) => Ok((SecretString::from(token), user)),
        _ => {
            warn!("login response is missing the token or the user");
            Err(AuthError::AuthenticationFailed {
                reason: "incomplete login response".to_string(),
            })
        }
    }
}

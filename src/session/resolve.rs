//! Two-step startup resolution of a stored token.

use crate::{client::AuthBackend, identity::Identity};
use secrecy::SecretString;
use tracing::debug;

/// Outcome of resolving a stored token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    User(Identity),
    Admin(Identity),
    /// Neither endpoint accepted the token.
    Invalid,
}

impl Resolution {
    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::User(identity) | Self::Admin(identity) => Some(identity),
            Self::Invalid => None,
        }
    }
}

/// Probes the user endpoint, then the admin endpoint, and keeps the first
/// success. The admin probe is skipped when the user probe succeeds.
pub async fn resolve<B: AuthBackend>(backend: &B, token: &SecretString) -> Resolution {
    match backend.resolve_user(token).await {
        Ok(payload) => match Identity::try_from(payload) {
            Ok(identity) if !identity.is_admin() => return Resolution::User(identity),
            Ok(_) => debug!("user endpoint returned an admin identity, checking for admin"),
            Err(err) => debug!("user endpoint returned an invalid identity: {err}"),
        },
        Err(err) => debug!("fetching regular user failed, checking for admin: {err}"),
    }

    match backend.resolve_admin(token).await {
        Ok(payload) => match payload.into_admin() {
            Ok(identity) => Resolution::Admin(identity),
            Err(err) => {
                debug!("admin endpoint returned an invalid identity: {err}");
                Resolution::Invalid
            }
        },
        Err(err) => {
            debug!("fetching admin failed: {err}");
            Resolution::Invalid
        }
    }
}

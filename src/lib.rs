//! # doit-session (client session & authentication state)
//!
//! `doit-session` owns the client side of a DoIt login: it keeps the bearer
//! token that proves a prior authentication, turns that token back into an
//! identity on every start, and exposes the login, admin login and logout
//! transitions.
//!
//! ## Startup Resolution
//!
//! A stored token does not say whether it belongs to a regular account or to an
//! admin. On start the manager probes the backend in a fixed order:
//!
//! 1. **User probe:** `GET /api/auth/user` with `Authorization: Bearer <token>`.
//! 2. **Admin probe:** only when the user probe fails, `GET /api/auth/admin` with
//!    the same token.
//! 3. **Eviction:** when both probes fail the token is removed and the session
//!    ends up signed out. Nothing is reported as an error.
//!
//! ## Session State
//!
//! [`session::SessionManager`] is the only writer of [`session::SessionState`].
//! Readers take snapshots or subscribe to a `tokio::sync::watch` channel; each
//! transition publishes a complete new state, so a half-applied login is never
//! observable.
//!
//! ## Persistence
//!
//! The token is stored under a single fixed key through the
//! [`store::TokenStore`] capability. [`store::FileTokenStore`] keeps it in a
//! JSON file and replaces the file atomically on every write.

pub mod cli;
pub mod client;
pub mod error;
pub mod identity;
pub mod session;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

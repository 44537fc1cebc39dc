//! Runs one session action the way a page load would: the stored token is
//! resolved first, then the requested transition is applied. Logout skips
//! resolution and never touches the network.

use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::{
    client::{AuthBackend, HttpBackend},
    error::AuthError,
    identity::{Identity, Role},
    session::SessionManager,
    store::{FileTokenStore, TokenStore},
};
use anyhow::{Context, Result, anyhow};

/// Handle a session action against the configured backend and token file.
///
/// # Errors
/// Returns an error if the backend URL is invalid, credentials are rejected,
/// or the token file cannot be written.
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let backend =
        HttpBackend::new(&globals.api_base_url).context("invalid DOIT_API_BASE_URL")?;
    let store = FileTokenStore::new(&globals.token_store);
    let manager = SessionManager::new(backend, store);

    let output = run(&manager, action).await?;
    println!("{output}");

    Ok(())
}

/// Executes `action` and returns the text to show the user.
///
/// # Errors
/// See [`handle`].
pub async fn run<B: AuthBackend, S: TokenStore>(
    manager: &SessionManager<B, S>,
    action: Action,
) -> Result<String> {
    match action {
        Action::Logout => {
            manager
                .logout()
                .context("failed to discard the stored session")?;
            Ok("Signed out".to_string())
        }
        Action::Whoami { json } => {
            manager.initialize().await;
            match manager.identity() {
                Some(identity) if json => Ok(serde_json::to_string_pretty(&identity)?),
                Some(identity) => Ok(render(&identity)),
                None => Ok("not signed in".to_string()),
            }
        }
        Action::Login { email, password } => {
            manager.initialize().await;
            match manager.login(&email, &password).await {
                Ok(identity) => Ok(format!("Signed in as {}", render(&identity))),
                Err(AuthError::AuthenticationFailed { .. }) => Err(anyhow!("Invalid credentials")),
                Err(err) => Err(anyhow::Error::new(err).context("Login failed")),
            }
        }
        Action::AdminLogin { admin_id, password } => {
            manager.initialize().await;
            match manager.admin_login(&admin_id, &password).await {
                Ok(identity) => Ok(format!("Signed in as {}", render(&identity))),
                Err(AuthError::AuthenticationFailed { .. }) => {
                    Err(anyhow!("Invalid admin credentials!"))
                }
                Err(err) => {
                    Err(anyhow::Error::new(err).context("Something went wrong. Please try again."))
                }
            }
        }
    }
}

/// One-line description of an identity, e.g. `Ann <ann@doit.dev> (admin A1)`.
#[must_use]
pub fn render(identity: &Identity) -> String {
    let mut line = identity.display_name.clone();
    if let Some(email) = &identity.email {
        line.push_str(&format!(" <{email}>"));
    }
    match &identity.role {
        Role::Admin { admin_id } => line.push_str(&format!(" (admin {admin_id})")),
        role => line.push_str(&format!(" ({role})")),
    }
    line
}

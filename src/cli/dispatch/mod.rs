//! Maps validated CLI matches to an [`Action`] and the shared [`GlobalArgs`].

use crate::cli::{
    actions::Action,
    commands::{
        ARG_ADMIN_ID, ARG_API_BASE_URL, ARG_EMAIL, ARG_JSON, ARG_PASSWORD, ARG_TOKEN_STORE,
        CMD_ADMIN_LOGIN, CMD_LOGIN, CMD_LOGOUT, CMD_WHOAMI,
    },
    globals::GlobalArgs,
};
use crate::store::FileTokenStore;
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::path::PathBuf;

fn required_string(matches: &clap::ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing required argument: --{id}"))
}

fn password(matches: &clap::ArgMatches) -> Result<SecretString> {
    matches
        .get_one::<String>(ARG_PASSWORD)
        .filter(|value| !value.is_empty())
        .map(|value| SecretString::from(value.clone()))
        .ok_or_else(|| anyhow!("missing required argument: --{ARG_PASSWORD}"))
}

/// # Errors
/// Returns an error if required arguments are missing or no token store path
/// can be determined.
pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let (name, sub_m) = matches
        .subcommand()
        .context("missing subcommand")?;

    let action = match name {
        CMD_WHOAMI => Action::Whoami {
            json: sub_m.get_flag(ARG_JSON),
        },
        CMD_LOGIN => Action::Login {
            email: required_string(sub_m, ARG_EMAIL)?,
            password: password(sub_m)?,
        },
        CMD_ADMIN_LOGIN => Action::AdminLogin {
            admin_id: required_string(sub_m, ARG_ADMIN_ID)?,
            password: password(sub_m)?,
        },
        CMD_LOGOUT => Action::Logout,
        other => return Err(anyhow!("unknown subcommand: {other}")),
    };

    let api_base_url = required_string(matches, ARG_API_BASE_URL)?;
    let token_store = match matches.get_one::<PathBuf>(ARG_TOKEN_STORE) {
        Some(path) => path.clone(),
        None => FileTokenStore::default_path()
            .context("cannot determine the token store path, set --token-store")?,
    };

    Ok((action, GlobalArgs::new(api_base_url, token_store)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn login_action_from_args() {
        temp_env::with_vars(
            [
                ("DOIT_API_BASE_URL", None::<&str>),
                ("DOIT_PASSWORD", None::<&str>),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec![
                    "doit-session",
                    "--api-base-url",
                    "https://api.doit.dev",
                    "--token-store",
                    "/tmp/doit-session.json",
                    "login",
                    "--email",
                    "a@b.com",
                    "--password",
                    "pw",
                ]);
                let (action, globals) = handler(&matches).expect("valid login args");

                match action {
                    Action::Login { email, password } => {
                        assert_eq!(email, "a@b.com");
                        assert_eq!(password.expose_secret(), "pw");
                    }
                    other => panic!("unexpected action: {other:?}"),
                }
                assert_eq!(globals.api_base_url, "https://api.doit.dev");
                assert_eq!(globals.token_store, PathBuf::from("/tmp/doit-session.json"));
            },
        );
    }

    #[test]
    fn api_base_url_required() {
        temp_env::with_vars([("DOIT_API_BASE_URL", None::<&str>)], || {
            let matches =
                crate::cli::commands::new().get_matches_from(vec!["doit-session", "whoami"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(
                    err.to_string()
                        .contains("missing required argument: --api-base-url")
                );
            }
        });
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn token_store_defaults_to_config_dir() {
        temp_env::with_vars(
            [
                ("DOIT_API_BASE_URL", Some("https://api.doit.dev")),
                ("DOIT_TOKEN_STORE", None),
                ("XDG_CONFIG_HOME", Some("/tmp/xdg")),
            ],
            || {
                let matches =
                    crate::cli::commands::new().get_matches_from(vec!["doit-session", "logout"]);
                let (action, globals) = handler(&matches).expect("valid logout args");
                assert!(matches!(action, Action::Logout));
                assert_eq!(
                    globals.token_store,
                    PathBuf::from("/tmp/xdg/doit/session.json")
                );
            },
        );
    }
}

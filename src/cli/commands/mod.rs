pub mod logging;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

pub const ARG_API_BASE_URL: &str = "api-base-url";
pub const ARG_TOKEN_STORE: &str = "token-store";
pub const ARG_EMAIL: &str = "email";
pub const ARG_ADMIN_ID: &str = "admin-id";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_JSON: &str = "json";

pub const CMD_WHOAMI: &str = "whoami";
pub const CMD_LOGIN: &str = "login";
pub const CMD_ADMIN_LOGIN: &str = "admin-login";
pub const CMD_LOGOUT: &str = "logout";

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .long("password")
        .help("Account password")
        .env("DOIT_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("doit-session")
        .about("DoIt session and authentication client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_BASE_URL)
                .short('u')
                .long("api-base-url")
                .help("DoIt API base URL, example: https://api.doit.dev")
                .env("DOIT_API_BASE_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_STORE)
                .long("token-store")
                .help("Path of the session file (default: <config dir>/doit/session.json)")
                .env("DOIT_TOKEN_STORE")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new(CMD_WHOAMI)
                .about("Resolve the stored session and print the signed-in identity")
                .arg(
                    Arg::new(ARG_JSON)
                        .long("json")
                        .help("Print the identity as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in with email and password")
                .arg(
                    Arg::new(ARG_EMAIL)
                        .short('e')
                        .long("email")
                        .help("Account email")
                        .env("DOIT_EMAIL")
                        .required(true),
                )
                .arg(password_arg()),
        )
        .subcommand(
            Command::new(CMD_ADMIN_LOGIN)
                .about("Sign in as an administrator")
                .arg(
                    Arg::new(ARG_ADMIN_ID)
                        .long("admin-id")
                        .help("Administrator id")
                        .env("DOIT_ADMIN_ID")
                        .required(true),
                )
                .arg(password_arg()),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("Discard the stored session"));

    logging::with_args(command)
}

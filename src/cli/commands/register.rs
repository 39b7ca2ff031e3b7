use super::CMD_REGISTER;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_NAME: &str = "name";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_CONFIRM_PASSWORD: &str = "confirm-password";

#[must_use]
pub fn command() -> Command {
    Command::new(CMD_REGISTER)
        .about("Create an account on a running server and sign in")
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the atrium API")
                .env("ATRIUM_API_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_NAME)
                .long(ARG_NAME)
                .help("Display name")
                .required(true),
        )
        .arg(
            Arg::new(ARG_EMAIL)
                .long(ARG_EMAIL)
                .help("Email address used to sign in")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password")
                .env("ATRIUM_REGISTER_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_CONFIRM_PASSWORD)
                .long(ARG_CONFIRM_PASSWORD)
                .help("Password confirmation (defaults to --password)")
                .env("ATRIUM_REGISTER_CONFIRM_PASSWORD")
                .hide_env_values(true),
        )
}

#[derive(Debug)]
pub struct Options {
    pub api_url: Url,
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing or the API URL is invalid.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .context("missing required argument: --api-url")?;
        let api_url = Url::parse(api_url).with_context(|| format!("Invalid API URL: {api_url}"))?;

        let password = matches
            .get_one::<String>(ARG_PASSWORD)
            .cloned()
            .context("missing required argument: --password")?;
        let confirm_password = matches
            .get_one::<String>(ARG_CONFIRM_PASSWORD)
            .cloned()
            .unwrap_or_else(|| password.clone());

        Ok(Self {
            api_url,
            name: matches
                .get_one::<String>(ARG_NAME)
                .cloned()
                .context("missing required argument: --name")?,
            email: matches
                .get_one::<String>(ARG_EMAIL)
                .cloned()
                .context("missing required argument: --email")?,
            password: SecretString::from(password),
            confirm_password: SecretString::from(confirm_password),
        })
    }
}

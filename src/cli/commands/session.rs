use crate::auth::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use anyhow::{ensure, Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_SITE_URL: &str = "site-url";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_PASSWORD_COST: &str = "password-cost";

/// HS256 secrets shorter than this (in bytes) are refused.
pub const MIN_SESSION_SECRET_LENGTH: usize = 32;

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SITE_URL)
                .long(ARG_SITE_URL)
                .help("Public site URL; sets the CORS origin and the Secure cookie flag")
                .env("ATRIUM_SITE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to sign session tokens")
                .env("ATRIUM_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token and cookie lifetime in seconds")
                .env("ATRIUM_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_PASSWORD_COST)
                .long(ARG_PASSWORD_COST)
                .help("bcrypt work factor for new passwords")
                .env("ATRIUM_PASSWORD_COST")
                .default_value("12")
                .value_parser(
                    clap::value_parser!(u32).range(i64::from(MIN_COST)..=i64::from(MAX_COST)),
                ),
        )
}

#[derive(Debug)]
pub struct Options {
    pub site_url: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub password_cost: u32,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let site_url = matches
            .get_one::<String>(ARG_SITE_URL)
            .cloned()
            .context("missing required argument: --site-url")?;
        let session_secret = matches
            .get_one::<String>(ARG_SESSION_SECRET)
            .cloned()
            .context("missing required argument: --session-secret")?;
        ensure!(
            session_secret.len() >= MIN_SESSION_SECRET_LENGTH,
            "--session-secret must be at least {MIN_SESSION_SECRET_LENGTH} bytes"
        );
        let session_secret = SecretString::from(session_secret);

        Ok(Self {
            site_url,
            session_secret,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(crate::auth::session::DEFAULT_SESSION_TTL_SECONDS),
            password_cost: matches
                .get_one::<u32>(ARG_PASSWORD_COST)
                .copied()
                .unwrap_or(DEFAULT_COST),
        })
    }
}

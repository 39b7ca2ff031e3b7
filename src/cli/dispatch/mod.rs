use crate::cli::{
    actions::{register, server, Action},
    commands::{self, content, session},
};
use anyhow::{anyhow, Context, Result};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::CMD_SERVER, sub)) => {
            let port = sub.get_one::<u16>("port").copied().unwrap_or(8080);
            let session = session::Options::parse(sub).context("invalid session settings")?;
            let content = content::Options::parse(sub).context("invalid content settings")?;

            Ok(Action::Server(server::Args {
                port,
                session,
                content,
            }))
        }
        Some((commands::CMD_REGISTER, sub)) => {
            Ok(Action::Register(register::Args::parse(sub)?))
        }
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

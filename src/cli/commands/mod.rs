pub mod content;
pub mod logging;
pub mod register;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const CMD_SERVER: &str = "server";
pub const CMD_REGISTER: &str = "register";

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

    let command = Command::new("atrium")
        .about("Content-managed site backend with credential sessions")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(server())
        .subcommand(register::command());

    logging::with_args(command)
}

fn server() -> Command {
    let command = Command::new(CMD_SERVER).about("Run the HTTP API").arg(
        Arg::new("port")
            .short('p')
            .long("port")
            .help("Port to listen on")
            .default_value("8080")
            .env("ATRIUM_PORT")
            .value_parser(clap::value_parser!(u16)),
    );

    let command = session::with_args(command);
    content::with_args(command)
}

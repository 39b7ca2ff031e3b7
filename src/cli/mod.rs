//! Command-line interface: argument parsing, telemetry setup and actions.

pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod start;
pub mod telemetry;

pub use start::start;

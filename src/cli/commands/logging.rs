use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("ATRIUM_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(level: &str) -> Result<u8, String> {
        let command = Command::new("test").arg(
            Arg::new("level")
                .long("level")
                .value_parser(validator_log_level()),
        );
        command
            .try_get_matches_from(vec!["test", "--level", level])
            .map_err(|err| err.to_string())
            .and_then(|matches| {
                matches
                    .get_one::<u8>("level")
                    .copied()
                    .ok_or_else(|| "missing".to_string())
            })
    }

    #[test]
    fn log_level_names_and_numbers() {
        assert_eq!(parse("error"), Ok(0));
        assert_eq!(parse("DEBUG"), Ok(3));
        assert_eq!(parse("trace"), Ok(4));
        assert_eq!(parse("5"), Ok(5));
        assert!(parse("6").is_err());
        assert!(parse("loud").is_err());
    }

    #[test]
    fn verbosity_counts_flags() {
        temp_env::with_var_unset("ATRIUM_LOG_LEVEL", || {
            let matches = with_args(Command::new("test")).get_matches_from(vec!["test", "-vvv"]);
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
        });
    }
}

use crate::content::{ContentConfig, DEFAULT_API_VERSION, DEFAULT_DATASET};
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PROJECT_ID: &str = "content-project-id";
pub const ARG_DATASET: &str = "content-dataset";
pub const ARG_API_VERSION: &str = "content-api-version";
pub const ARG_TOKEN: &str = "content-token";
pub const ARG_API_URL: &str = "content-api-url";
pub const ARG_CDN_URL: &str = "content-cdn-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROJECT_ID)
                .long(ARG_PROJECT_ID)
                .help("Content store project id")
                .env("ATRIUM_CONTENT_PROJECT_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DATASET)
                .long(ARG_DATASET)
                .help("Content store dataset")
                .env("ATRIUM_CONTENT_DATASET")
                .default_value(DEFAULT_DATASET),
        )
        .arg(
            Arg::new(ARG_API_VERSION)
                .long(ARG_API_VERSION)
                .help("Content API version date")
                .env("ATRIUM_CONTENT_API_VERSION")
                .default_value(DEFAULT_API_VERSION),
        )
        .arg(
            Arg::new(ARG_TOKEN)
                .long(ARG_TOKEN)
                .help("Content API token; required to create users")
                .env("ATRIUM_CONTENT_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Override the origin API base URL")
                .env("ATRIUM_CONTENT_API_URL"),
        )
        .arg(
            Arg::new(ARG_CDN_URL)
                .long(ARG_CDN_URL)
                .help("Override the edge-cached API base URL")
                .env("ATRIUM_CONTENT_CDN_URL"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub token: Option<SecretString>,
    pub api_url: Option<String>,
    pub cdn_url: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if the project id is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let project_id = matches
            .get_one::<String>(ARG_PROJECT_ID)
            .cloned()
            .context("missing required argument: --content-project-id")?;

        Ok(Self {
            project_id,
            dataset: matches
                .get_one::<String>(ARG_DATASET)
                .cloned()
                .unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            api_version: matches
                .get_one::<String>(ARG_API_VERSION)
                .cloned()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            token: matches
                .get_one::<String>(ARG_TOKEN)
                .cloned()
                .map(SecretString::from),
            api_url: matches.get_one::<String>(ARG_API_URL).cloned(),
            cdn_url: matches.get_one::<String>(ARG_CDN_URL).cloned(),
        })
    }

    #[must_use]
    pub fn into_config(self) -> ContentConfig {
        let mut config = ContentConfig::new(self.project_id)
            .with_dataset(self.dataset)
            .with_api_version(self.api_version)
            .with_token(self.token);
        if let Some(api_url) = self.api_url {
            config = config.with_api_url(api_url);
        }
        if let Some(cdn_url) = self.cdn_url {
            config = config.with_cdn_url(cdn_url);
        }
        config
    }
}

use crate::{
    api::{self, AuthConfig, AuthState},
    auth::ContentCredentialStore,
    cli::commands::{content, session},
    content::ContentClient,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub session: session::Options,
    pub content: content::Options,
}

/// Build the content client and session issuer, then serve the API.
/// # Errors
/// Returns an error if the content client cannot be built or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    let Args {
        port,
        session,
        content,
    } = args;

    let client = ContentClient::new(content.into_config())
        .context("Failed to build content store client")?;
    info!(
        project_id = client.config().project_id(),
        dataset = client.config().dataset(),
        "content store configured"
    );

    let store = Arc::new(ContentCredentialStore::new(client.clone()));
    let config = AuthConfig::new(session.site_url)
        .with_session_ttl_seconds(session.session_ttl_seconds)
        .with_password_cost(session.password_cost);
    let auth_state = Arc::new(AuthState::new(config, store, &session.session_secret));

    api::new(port, auth_state, client).await
}

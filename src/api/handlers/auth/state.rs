//! Auth state and configuration shared by the handlers.

use crate::auth::{
    password::DEFAULT_COST, session::DEFAULT_SESSION_TTL_SECONDS, CredentialStore, SessionIssuer,
};
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    site_url: String,
    session_ttl_seconds: u64,
    password_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(site_url: String) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            password_cost: DEFAULT_COST,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn password_cost(&self) -> u32 {
        self.password_cost
    }

    /// Cookies are only marked `Secure` when the site is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    issuer: SessionIssuer,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, store: Arc<dyn CredentialStore>, secret: &SecretString) -> Self {
        let issuer =
            SessionIssuer::new(store, secret).with_ttl_seconds(config.session_ttl_seconds());
        Self { config, issuer }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.issuer.store()
    }
}

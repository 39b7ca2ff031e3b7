//! Credential authorization and signed session tokens.

use super::{
    password,
    store::{CredentialStore, User},
};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

/// Thirty days.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Authorization failures. Messages are safe to show to the person signing in.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please enter an email and password")]
    MissingCredentials,
    #[error("No user found with this email")]
    UserNotFound,
    #[error("This account has no password set")]
    NoPasswordSet,
    #[error("Incorrect password")]
    InvalidPassword,
    #[error("Authentication is temporarily unavailable")]
    AuthUnavailable,
}

/// Attributes carried by an authorized session.
#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: String,
}

impl From<User> for SessionClaims {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.image,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    id: String,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    picture: Option<String>,
    iat: u64,
    exp: u64,
}

/// The user attached to a verified token.
#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: String,
    pub role: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    /// Unix seconds at which the token stops being accepted.
    #[serde(skip)]
    pub expires_at: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(SessionUser),
}

impl Session {
    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }
}

pub struct SessionIssuer {
    store: Arc<dyn CredentialStore>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            store,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Check an email/password pair against the credential store.
    ///
    /// # Errors
    /// Returns the [`AuthError`] kind for the first failed step. Store and
    /// runtime failures are logged and reported as [`AuthError::AuthUnavailable`].
    #[instrument(skip(self, password))]
    pub async fn authorize(&self, email: &str, password: &str) -> Result<SessionClaims, AuthError> {
        // Registration stores the trimmed address, so look up the same form.
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let user = match self.store.lookup_user_by_email(email).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AuthError::UserNotFound),
            Err(err) => {
                error!("Failed to look up user: {err}");
                return Err(AuthError::AuthUnavailable);
            }
        };

        let Some(digest) = user.password_hash.clone().filter(|hash| !hash.is_empty()) else {
            return Err(AuthError::NoPasswordSet);
        };

        // bcrypt is deliberately slow; keep it off the async workers.
        let plaintext = password.to_string();
        let matches = tokio::task::spawn_blocking(move || password::compare(&plaintext, &digest))
            .await
            .map_err(|err| {
                error!("Password verification task failed: {err}");
                AuthError::AuthUnavailable
            })?;

        if !matches {
            return Err(AuthError::InvalidPassword);
        }

        debug!(user_id = %user.id, "credentials accepted");
        Ok(SessionClaims::from(user))
    }

    /// Sign a token valid for the configured TTL starting now.
    ///
    /// # Errors
    /// Returns [`AuthError::AuthUnavailable`] if signing fails.
    pub fn issue_token(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        self.issue_token_at(claims, get_current_timestamp())
    }

    fn issue_token_at(&self, claims: &SessionClaims, issued_at: u64) -> Result<String, AuthError> {
        let token_claims = TokenClaims {
            sub: claims.id.clone(),
            id: claims.id.clone(),
            role: claims.role.clone(),
            email: Some(claims.email.clone()),
            name: claims.name.clone(),
            picture: claims.image.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl_seconds),
        };

        encode(&Header::new(Algorithm::HS256), &token_claims, &self.encoding).map_err(|err| {
            error!("Failed to sign session token: {err}");
            AuthError::AuthUnavailable
        })
    }

    /// Verify `token`; anything that does not verify is an anonymous session.
    #[must_use]
    pub fn read_session(&self, token: &str) -> Session {
        match decode::<TokenClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => {
                let claims = data.claims;
                Session::Authenticated(SessionUser {
                    id: claims.id,
                    role: claims.role,
                    email: claims.email,
                    name: claims.name,
                    image: claims.picture,
                    expires_at: claims.exp,
                })
            }
            Err(err) => {
                debug!("Rejected session token: {err}");
                Session::Anonymous
            }
        }
    }
}

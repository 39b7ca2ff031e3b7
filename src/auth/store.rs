//! User records kept in the content store.
//!
//! Lookups always go to the origin API with caching disabled, so a freshly
//! created account or a changed password is visible on the very next sign-in.

use crate::content::{ContentClient, ContentError, FetchOptions, QueryParams};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{collections::HashMap, fmt};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const USER_TYPE: &str = "user";
/// Role assigned to self-registered accounts.
pub const DEFAULT_ROLE: &str = "user";

const USER_BY_EMAIL_QUERY: &str = r#"*[_type == $type && email == $email][0]{ _id, email, name, passwordHash, role, "image": image.asset->url }"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store unavailable: {0}")]
    Unavailable(#[from] ContentError),
    #[error("content store rejected the write: {0}")]
    Rejected(String),
}

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "passwordHash", default, skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "***"))
            .field("role", &self.role)
            .field("image", &self.image)
            .finish()
    }
}

/// Outward representation of a user; never carries the password digest.
#[derive(ToSchema, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub image: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            image: user.image.clone(),
        }
    }
}

#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"***")
            .finish()
    }
}

/// Persistence boundary for user credentials.
///
/// Implementations do not enforce email uniqueness; callers that need it check
/// with [`CredentialStore::lookup_user_by_email`] first.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Exact, case-sensitive match on `email`; absence is `Ok(None)`.
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}

#[derive(Clone, Debug)]
pub struct ContentCredentialStore {
    client: ContentClient,
}

impl ContentCredentialStore {
    #[must_use]
    pub fn new(client: ContentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialStore for ContentCredentialStore {
    #[instrument(skip(self))]
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let params = QueryParams::from([
            ("type".to_string(), json!(USER_TYPE)),
            ("email".to_string(), json!(email)),
        ]);
        let user: Option<User> = self
            .client
            .fetch(USER_BY_EMAIL_QUERY, &params, &FetchOptions::no_store())
            .await?;

        debug!(found = user.is_some(), "user lookup");
        Ok(user)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let id = Uuid::new_v4().to_string();
        let document = json!({
            "_id": id,
            "_type": USER_TYPE,
            "email": user.email,
            "name": user.name,
            "passwordHash": user.password_hash,
            "role": DEFAULT_ROLE,
        });

        let body = match self.client.mutate(json!([{ "create": document }])).await {
            Ok(body) => body,
            Err(ContentError::Status { status, message }) if (400..500).contains(&status) => {
                return Err(StoreError::Rejected(message));
            }
            Err(err) => return Err(err.into()),
        };

        let created_id = body
            .get("results")
            .and_then(|results| results.get(0))
            .and_then(|result| result.get("id"))
            .and_then(Value::as_str)
            .unwrap_or(id.as_str())
            .to_string();

        Ok(User {
            id: created_id,
            email: user.email,
            name: Some(user.name),
            password_hash: Some(user.password_hash),
            role: DEFAULT_ROLE.to_string(),
            image: None,
        })
    }
}

/// Process-local store, keyed by email. Rejects duplicate emails.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        if let Ok(mut users) = self.users.try_write() {
            users.insert(user.email.clone(), user);
        }
        self
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn lookup_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StoreError::Rejected("duplicate email".to_string()));
        }

        let created = User {
            id: Uuid::new_v4().to_string(),
            email: user.email.clone(),
            name: Some(user.name),
            password_hash: Some(user.password_hash),
            role: DEFAULT_ROLE.to_string(),
            image: None,
        };
        users.insert(user.email, created.clone());
        Ok(created)
    }
}

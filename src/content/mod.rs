//! Read access to the headless content store.
//!
//! Every query goes through [`ContentClient::fetch`], which consults the
//! [`QueryCache`] before issuing a round trip. Cache behaviour is chosen per call
//! through [`FetchOptions`]: how long a result may be reused, which tags it is
//! labelled with for explicit invalidation, whether the edge-cached endpoint may
//! serve it, and which content perspective to read.
//!
//! Failures surface as [`ContentError`]; this layer never retries.

pub mod cache;
pub mod dictionary;

pub use cache::QueryCache;
pub use dictionary::{get_dictionary, Dictionary, DictionaryScope};

use cache::CacheKey;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info_span, instrument, Instrument};

/// Default revalidation horizon for cached query results.
pub const DEFAULT_REVALIDATE_SECONDS: u64 = 300;
pub const DEFAULT_API_VERSION: &str = "2024-01-01";
pub const DEFAULT_DATASET: &str = "production";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Named query parameters, bound as `$name` inside the query.
pub type QueryParams = BTreeMap<String, Value>;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("content store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("content store response has no result")]
    MissingResult,
    #[error("content store response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("content store token is required for writes")]
    MissingToken,
    #[error("invalid locale: {0}")]
    InvalidLocale(String),
}

/// Lifecycle view of the content to read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    #[default]
    Published,
    Drafts,
}

impl Perspective {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Drafts => "drafts",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    tags: BTreeSet<String>,
    revalidate: Duration,
    use_cdn: bool,
    perspective: Perspective,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            tags: BTreeSet::new(),
            revalidate: Duration::from_secs(DEFAULT_REVALIDATE_SECONDS),
            use_cdn: true,
            perspective: Perspective::Published,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always hit the origin and never keep the result.
    #[must_use]
    pub fn no_store() -> Self {
        Self::default()
            .with_revalidate(Duration::ZERO)
            .with_use_cdn(false)
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_revalidate(mut self, revalidate: Duration) -> Self {
        self.revalidate = revalidate;
        self
    }

    #[must_use]
    pub fn with_use_cdn(mut self, use_cdn: bool) -> Self {
        self.use_cdn = use_cdn;
        self
    }

    #[must_use]
    pub fn with_perspective(mut self, perspective: Perspective) -> Self {
        self.perspective = perspective;
        self
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[must_use]
    pub fn revalidate(&self) -> Duration {
        self.revalidate
    }

    #[must_use]
    pub fn use_cdn(&self) -> bool {
        self.use_cdn
    }

    #[must_use]
    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    /// Drafts are never served from the edge cache.
    fn reads_from_cdn(&self) -> bool {
        self.use_cdn && self.perspective == Perspective::Published
    }
}

#[derive(Clone, Debug)]
pub struct ContentConfig {
    project_id: String,
    dataset: String,
    api_version: String,
    token: Option<SecretString>,
    api_url: String,
    cdn_url: String,
}

impl ContentConfig {
    #[must_use]
    pub fn new(project_id: String) -> Self {
        let api_url = format!("https://{project_id}.api.sanity.io");
        let cdn_url = format!("https://{project_id}.apicdn.sanity.io");
        Self {
            project_id,
            dataset: DEFAULT_DATASET.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            api_url,
            cdn_url,
        }
    }

    #[must_use]
    pub fn with_dataset(mut self, dataset: String) -> Self {
        self.dataset = dataset;
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: String) -> Self {
        self.api_version = api_version.trim_start_matches('v').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_cdn_url(mut self, cdn_url: String) -> Self {
        self.cdn_url = cdn_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    fn query_url(&self, options: &FetchOptions) -> String {
        let base = if options.reads_from_cdn() {
            &self.cdn_url
        } else {
            &self.api_url
        };
        format!("{base}/v{}/data/query/{}", self.api_version, self.dataset)
    }

    fn mutate_url(&self) -> String {
        format!(
            "{}/v{}/data/mutate/{}",
            self.api_url, self.api_version, self.dataset
        )
    }
}

/// Cloneable handle to the content store; clones share one cache.
#[derive(Clone, Debug)]
pub struct ContentClient {
    http: Client,
    config: Arc<ContentConfig>,
    cache: Arc<QueryCache>,
}

impl ContentClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ContentConfig) -> Result<Self, ContentError> {
        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
            cache: Arc::new(QueryCache::new()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Run a read-only query, reusing a cached result while it is fresh.
    ///
    /// # Errors
    /// Returns [`ContentError`] when the store cannot be reached, answers with a
    /// non-success status, or the result does not decode into `T`.
    #[instrument(skip(self, params, options))]
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &QueryParams,
        options: &FetchOptions,
    ) -> Result<T, ContentError> {
        let key = CacheKey::new(query, params, options);

        if let Some(value) = self.cache.get(&key).await {
            debug!("content cache hit");
            return Ok(serde_json::from_value(value)?);
        }

        let value = self.query_store(query, params, options).await?;
        self.cache
            .insert(key, value.clone(), options.revalidate(), options.tags())
            .await;

        Ok(serde_json::from_value(value)?)
    }

    /// Evict every cached result labelled with `tag`.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let evicted = self.cache.invalidate_tag(tag).await;
        debug!(tag, evicted, "content cache tag invalidated");
        evicted
    }

    /// Apply a batch of mutations against the origin API.
    ///
    /// # Errors
    /// Returns [`ContentError::MissingToken`] when no write token is configured,
    /// or any transport/status error from the store.
    #[instrument(skip(self, mutations))]
    pub async fn mutate(&self, mutations: Value) -> Result<Value, ContentError> {
        let token = self
            .config
            .token
            .as_ref()
            .ok_or(ContentError::MissingToken)?;

        let url = self.config.mutate_url();
        let span = info_span!("content.mutate", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .query(&[("returnIds", "true"), ("returnDocuments", "true")])
            .bearer_auth(token.expose_secret())
            .json(&json!({ "mutations": mutations }))
            .send()
            .instrument(span)
            .await?;

        read_body(response).await
    }

    async fn query_store(
        &self,
        query: &str,
        params: &QueryParams,
        options: &FetchOptions,
    ) -> Result<Value, ContentError> {
        let url = self.config.query_url(options);

        let mut pairs = vec![
            ("query".to_string(), query.to_string()),
            (
                "perspective".to_string(),
                options.perspective().as_str().to_string(),
            ),
        ];
        for (name, value) in params {
            pairs.push((format!("${name}"), value.to_string()));
        }

        let mut request = self.http.get(&url).query(&pairs);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let span = info_span!(
            "content.query",
            http.method = "GET",
            url = %url,
            cdn = options.reads_from_cdn()
        );
        let response = request.send().instrument(span).await?;
        let mut body = read_body(response).await?;

        match body.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(ContentError::MissingResult),
        }
    }
}

async fn read_body(response: reqwest::Response) -> Result<Value, ContentError> {
    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        return Err(ContentError::Status {
            status: status.as_u16(),
            message: store_error_message(&body).to_string(),
        });
    }

    Ok(response.json().await?)
}

fn store_error_message(body: &Value) -> &str {
    body.get("error")
        .and_then(|error| {
            error
                .get("description")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
        })
        .or_else(|| body.get("message").and_then(Value::as_str))
        .unwrap_or("")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use std::net::TcpListener;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const QUERY_PATH: &str = "/v2024-01-01/data/query/production";
    pub(crate) const MUTATE_PATH: &str = "/v2024-01-01/data/mutate/production";

    pub(crate) fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    pub(crate) fn mock_client(server: &MockServer, token: Option<&str>) -> Result<ContentClient> {
        let config = ContentConfig::new("test".to_string())
            .with_api_url(server.uri())
            .with_cdn_url(format!("{}/cdn", server.uri()))
            .with_token(token.map(|token| SecretString::from(token.to_string())));
        Ok(ContentClient::new(config)?)
    }

    fn email_params(email: &str) -> QueryParams {
        QueryParams::from([("email".to_string(), json!(email))])
    }

    #[test]
    fn fetch_options_defaults() {
        let options = FetchOptions::new();
        assert!(options.tags().is_empty());
        assert_eq!(options.revalidate(), Duration::from_secs(300));
        assert!(options.use_cdn());
        assert_eq!(options.perspective(), Perspective::Published);
    }

    #[test]
    fn drafts_never_read_from_cdn() {
        let config = ContentConfig::new("abc123".to_string());
        let drafts = FetchOptions::new().with_perspective(Perspective::Drafts);
        assert_eq!(
            config.query_url(&drafts),
            "https://abc123.api.sanity.io/v2024-01-01/data/query/production"
        );
        assert_eq!(
            config.query_url(&FetchOptions::new()),
            "https://abc123.apicdn.sanity.io/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn api_version_accepts_leading_v() {
        let config = ContentConfig::new("abc123".to_string())
            .with_api_version("v2025-02-19".to_string())
            .with_dataset("staging".to_string());
        assert_eq!(
            config.mutate_url(),
            "https://abc123.api.sanity.io/v2025-02-19/data/mutate/staging"
        );
    }

    #[test]
    fn store_error_message_variants() {
        assert_eq!(
            store_error_message(&json!({"error": {"description": "bad query"}})),
            "bad query"
        );
        assert_eq!(store_error_message(&json!({"error": "nope"})), "nope");
        assert_eq!(store_error_message(&json!({"message": "denied"})), "denied");
        assert_eq!(store_error_message(&Value::Null), "");
    }

    #[tokio::test]
    async fn identical_fetches_share_one_round_trip() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/cdn{QUERY_PATH}")))
            .and(query_param("$email", "\"ada@example.com\""))
            .and(query_param("perspective", "published"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"result": {"name": "Ada"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server, None)?;
        let query = r#"*[_type == "user" && email == $email][0]{name}"#;
        let params = email_params("ada@example.com");
        let options = FetchOptions::new();

        let first: Value = client.fetch(query, &params, &options).await?;
        let second: Value = client.fetch(query, &params, &options).await?;
        assert_eq!(first, json!({"name": "Ada"}));
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn different_params_are_separate_entries() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/cdn{QUERY_PATH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let client = mock_client(&server, None)?;
        let options = FetchOptions::new();
        let _: u32 = client
            .fetch("count(*)", &email_params("a@example.com"), &options)
            .await?;
        let _: u32 = client
            .fetch("count(*)", &email_params("b@example.com"), &options)
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn tag_invalidation_forces_refetch() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/cdn{QUERY_PATH}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "hero"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = mock_client(&server, None)?;
        let options = FetchOptions::new().with_tag("homePage");
        let query = r#"*[_type == "homePage"][0].title"#;

        let _: String = client.fetch(query, &QueryParams::new(), &options).await?;
        assert_eq!(client.invalidate_tag("homePage").await, 1);
        let _: String = client.fetch(query, &QueryParams::new(), &options).await?;
        Ok(())
    }

    #[tokio::test]
    async fn zero_revalidate_is_never_cached() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(QUERY_PATH))
            .and(header("authorization", "Bearer read-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
            .expect(2)
            .mount(&server)
            .await;

        let client = mock_client(&server, Some("read-token"))?;
        let options = FetchOptions::no_store();
        let first: Option<Value> = client.fetch("*[0]", &QueryParams::new(), &options).await?;
        let second: Option<Value> = client.fetch("*[0]", &QueryParams::new(), &options).await?;
        assert!(first.is_none());
        assert!(second.is_none());
        assert!(client.cache().is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn error_status_maps_to_content_error() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/cdn{QUERY_PATH}")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"description": "expected '}' following object body", "type": "queryParseError"}
            })))
            .mount(&server)
            .await;

        let client = mock_client(&server, None)?;
        let result: Result<Value, ContentError> = client
            .fetch("*[0]{", &QueryParams::new(), &FetchOptions::new())
            .await;

        match result {
            Err(ContentError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert!(message.contains("following object body"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(client.cache().is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn mutate_requires_token() -> Result<()> {
        let config = ContentConfig::new("test".to_string());
        let client = ContentClient::new(config)?;
        let result = client.mutate(json!([])).await;
        assert!(matches!(result, Err(ContentError::MissingToken)));
        Ok(())
    }

    #[tokio::test]
    async fn mutate_posts_to_origin() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MUTATE_PATH))
            .and(query_param("returnDocuments", "true"))
            .and(header("authorization", "Bearer write-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "transactionId": "tx1",
                "results": [{"id": "doc1", "operation": "create"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = mock_client(&server, Some("write-token"))?;
        let body = client
            .mutate(json!([{"create": {"_type": "note"}}]))
            .await?;
        assert_eq!(body["transactionId"], "tx1");
        Ok(())
    }
}

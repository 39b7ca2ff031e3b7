//! Localized keyword dictionaries.
//!
//! The content store keeps a single `dictionaries` document whose entries carry a
//! `keyword` plus one field per locale. A [`Dictionary`] flattens that document
//! into `keyword -> text` for one locale, falling back to [`DEFAULT_LOCALE`] per
//! entry when the requested locale has no override.
//!
//! [`DictionaryScope`] caches dictionaries for the lifetime of one request.

use super::{ContentClient, ContentError, FetchOptions, QueryParams};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

pub const DEFAULT_LOCALE: &str = "en";
pub const DICTIONARY_TYPE: &str = "dictionaries";
/// Cache tag shared by every dictionary query.
pub const DICTIONARY_TAG: &str = "dictionaries";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Dictionary {
    pub locale: String,
    pub common: BTreeMap<String, String>,
}

impl Dictionary {
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.common.get(keyword).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    k: Option<String>,
    v: Option<String>,
    fallback: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Wire {
    #[serde(default)]
    common: Option<Vec<Row>>,
}

/// Locales are interpolated as field names, so only `xx` or `xx_YY` is accepted.
#[must_use]
pub fn valid_locale(locale: &str) -> bool {
    Regex::new(r"^[a-z]{2}(_[A-Z]{2})?$").is_ok_and(|re| re.is_match(locale))
}

#[must_use]
pub fn messages_query(locale: &str) -> String {
    format!(
        r#"*[_type == $type][0]{{ "common": entries[]{{ "k": keyword, "v": {locale}, "fallback": {DEFAULT_LOCALE} }} }}"#
    )
}

/// Fetch and flatten the dictionary for `locale`.
///
/// # Errors
/// Returns [`ContentError::InvalidLocale`] for malformed locales, otherwise any
/// error from the content store.
#[instrument(skip(client))]
pub async fn get_dictionary(client: &ContentClient, locale: &str) -> Result<Dictionary, ContentError> {
    if !valid_locale(locale) {
        return Err(ContentError::InvalidLocale(locale.to_string()));
    }

    let params = QueryParams::from([("type".to_string(), json!(DICTIONARY_TYPE))]);
    let options = FetchOptions::new().with_tag(DICTIONARY_TAG);
    let wire: Option<Wire> = client
        .fetch(&messages_query(locale), &params, &options)
        .await?;

    Ok(flatten(locale, wire.unwrap_or_default()))
}

fn flatten(locale: &str, wire: Wire) -> Dictionary {
    let common = wire
        .common
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            let keyword = row.k.filter(|k| !k.is_empty())?;
            let value = row
                .v
                .filter(|v| !v.is_empty())
                .or_else(|| row.fallback.filter(|v| !v.is_empty()))?;
            Some((keyword, value))
        })
        .collect();

    Dictionary {
        locale: locale.to_string(),
        common,
    }
}

/// Request-scoped dictionary cache.
///
/// One scope is created per incoming request; repeated lookups of the same locale
/// within it resolve to a single fetch, including concurrent ones.
#[derive(Clone, Debug, Default)]
pub struct DictionaryScope {
    entries: Arc<Mutex<HashMap<String, Arc<OnceCell<Arc<Dictionary>>>>>>,
}

impl DictionaryScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Propagates [`get_dictionary`] errors; a failed lookup is retried by the next call.
    pub async fn get(
        &self,
        client: &ContentClient,
        locale: &str,
    ) -> Result<Arc<Dictionary>, ContentError> {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(locale.to_string()).or_default().clone()
        };

        if let Some(dictionary) = cell.get() {
            debug!(locale, "dictionary scope hit");
            return Ok(dictionary.clone());
        }

        let dictionary = cell
            .get_or_try_init(|| async { get_dictionary(client, locale).await.map(Arc::new) })
            .await?;
        Ok(dictionary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tests::{can_bind_localhost, mock_client, QUERY_PATH};
    use anyhow::Result;
    use serde_json::Value;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dictionary_body() -> Value {
        json!({
            "result": {
                "common": [
                    {"k": "welcome", "v": "Bienvenue", "fallback": "Welcome"},
                    {"k": "signIn", "v": null, "fallback": "Sign in"},
                    {"k": "empty", "v": "", "fallback": "Fallback"},
                    {"k": "missing", "v": null, "fallback": null},
                    {"k": null, "v": "orphan", "fallback": "orphan"}
                ]
            }
        })
    }

    async fn mount_dictionary(server: &MockServer, expected: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/cdn{QUERY_PATH}")))
            .and(query_param("$type", "\"dictionaries\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(dictionary_body()))
            .expect(expected)
            .mount(server)
            .await;
    }

    #[test]
    fn valid_locale_formats() {
        assert!(valid_locale("en"));
        assert!(valid_locale("fr"));
        assert!(valid_locale("pt_BR"));
        assert!(!valid_locale("EN"));
        assert!(!valid_locale("fr-FR"));
        assert!(!valid_locale("en, \"x\": *"));
        assert!(!valid_locale(""));
    }

    #[test]
    fn messages_query_projects_locale_and_fallback() {
        let query = messages_query("fr");
        assert!(query.contains(r#""v": fr"#));
        assert!(query.contains(r#""fallback": en"#));
        assert!(query.starts_with("*[_type == $type][0]"));
    }

    #[test]
    fn flatten_prefers_locale_then_default() -> Result<()> {
        let wire: Wire = serde_json::from_value(dictionary_body()["result"].clone())?;
        let dictionary = flatten("fr", wire);

        assert_eq!(dictionary.get("welcome"), Some("Bienvenue"));
        assert_eq!(dictionary.get("signIn"), Some("Sign in"));
        assert_eq!(dictionary.get("empty"), Some("Fallback"));
        assert_eq!(dictionary.get("missing"), None);
        assert_eq!(dictionary.common.len(), 3);
        assert!(dictionary.common.values().all(|v| !v.is_empty()));
        Ok(())
    }

    #[test]
    fn flatten_handles_missing_document() {
        let dictionary = flatten("fr", Wire::default());
        assert_eq!(dictionary.locale, "fr");
        assert!(dictionary.common.is_empty());
    }

    #[tokio::test]
    async fn get_dictionary_rejects_bad_locale() -> Result<()> {
        let client = ContentClient::new(crate::content::ContentConfig::new("test".to_string()))?;
        let result = get_dictionary(&client, "fr} , *[0]{").await;
        assert!(matches!(result, Err(ContentError::InvalidLocale(_))));
        Ok(())
    }

    #[tokio::test]
    async fn get_dictionary_returns_french_with_default_fallback() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_dictionary(&server, 1).await;

        let client = mock_client(&server, None)?;
        let dictionary = get_dictionary(&client, "fr").await?;
        assert_eq!(dictionary.get("welcome"), Some("Bienvenue"));
        assert_eq!(dictionary.get("signIn"), Some("Sign in"));
        Ok(())
    }

    #[tokio::test]
    async fn scope_fetches_each_locale_once() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_dictionary(&server, 1).await;

        let client = mock_client(&server, None)?;
        let scope = DictionaryScope::new();

        let first = scope.get(&client, "fr").await?;
        // Even with the shared cache emptied the scope keeps its copy.
        client.invalidate_tag(DICTIONARY_TAG).await;
        let second = scope.get(&client, "fr").await?;

        assert!(Arc::ptr_eq(&first, &second));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_scope_lookups_share_one_fetch() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_dictionary(&server, 1).await;

        let client = mock_client(&server, None)?;
        let scope = DictionaryScope::new();

        let (first, second) = tokio::join!(scope.get(&client, "fr"), scope.get(&client, "fr"));
        assert_eq!(first?, second?);
        Ok(())
    }

    #[tokio::test]
    async fn new_scope_refetches_after_invalidation() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_dictionary(&server, 2).await;

        let client = mock_client(&server, None)?;
        DictionaryScope::new().get(&client, "fr").await?;
        client.invalidate_tag(DICTIONARY_TAG).await;
        DictionaryScope::new().get(&client, "fr").await?;
        Ok(())
    }
}

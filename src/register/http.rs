use super::{ApiError, RegistrationApi};
use crate::{auth::PublicUser, APP_USER_AGENT};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info_span, Instrument};
use url::Url;

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// [`RegistrationApi`] backed by a running atrium server.
#[derive(Clone, Debug)]
pub struct HttpRegistrationApi {
    http: Client,
    base_url: Url,
}

impl HttpRegistrationApi {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: Url) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

#[async_trait]
impl RegistrationApi for HttpRegistrationApi {
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ApiError> {
        let url = self.endpoint("/api/register");
        let span = info_span!("register.request", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .instrument(span)
            .await?;

        let response = check(response).await?;
        Ok(response.json().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let url = self.endpoint("/api/auth/callback/credentials");
        let span = info_span!("register.sign_in", http.method = "POST", url = %url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .instrument(span)
            .await?;

        check(response).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    Err(ApiError::Rejected {
        status: status.as_u16(),
        message: body
            .get("error")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tests::can_bind_localhost;
    use anyhow::Result;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> Result<HttpRegistrationApi> {
        Ok(HttpRegistrationApi::new(Url::parse(&server.uri())?)?)
    }

    #[test]
    fn endpoint_joins_without_double_slash() -> Result<()> {
        let api = HttpRegistrationApi::new(Url::parse("http://localhost:8080/")?)?;
        assert_eq!(
            api.endpoint("/api/register"),
            "http://localhost:8080/api/register"
        );
        Ok(())
    }

    #[tokio::test]
    async fn register_posts_form_fields() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/register"))
            .and(body_json(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "abcdef"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "user-1",
                "email": "ada@example.com",
                "name": "Ada",
                "role": "user",
                "image": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = api(&server)?
            .register("Ada", "ada@example.com", "abcdef")
            .await?;
        assert_eq!(user.id, "user-1");
        assert_eq!(user.role, "user");
        Ok(())
    }

    #[tokio::test]
    async fn register_rejection_carries_server_message() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"error": "User already exists"})),
            )
            .mount(&server)
            .await;

        let result = api(&server)?
            .register("Ada", "ada@example.com", "abcdef")
            .await;
        match result {
            Err(err @ ApiError::Rejected { status: 409, .. }) => {
                assert_eq!(err.user_message(), "User already exists");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn register_rejection_without_body_uses_default() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/register"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = api(&server)?
            .register("Ada", "ada@example.com", "abcdef")
            .await;
        let message = result.err().map(|err| err.user_message());
        assert_eq!(message.as_deref(), Some(crate::register::REGISTRATION_FAILED));
        Ok(())
    }

    #[tokio::test]
    async fn sign_in_maps_unauthorized() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/auth/callback/credentials"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Incorrect password"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = api(&server)?
            .sign_in("ada@example.com", "abcdef")
            .await;
        assert!(matches!(result, Err(ApiError::Rejected { status: 401, .. })));
        Ok(())
    }
}

use crate::{
    api::handlers::{health, root},
    content::{ContentClient, DictionaryScope},
};
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware::{self, Next},
    response::Response,
    routing::{get, options},
    Extension, Router,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, error, info, info_span, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub(crate) mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use handlers::auth::{AuthConfig, AuthState};
pub use openapi::openapi;

const CACHE_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented routes, docs UI, extensions and
/// request layers. CORS is added by [`new`].
pub fn app(auth_state: Arc<AuthState>, client: ContentClient) -> Router {
    let (router, openapi) = router().split_for_parts();
    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(middleware::from_fn(dictionary_scope))
                .layer(Extension(auth_state))
                .layer(Extension(client)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, auth_state: Arc<AuthState>, client: ContentClient) -> Result<()> {
    let frontend_origin = frontend_origin(auth_state.config().site_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    spawn_cache_sweeper(client.clone());

    let app = app(auth_state, client).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// Stale entries are never served, this only bounds memory.
fn spawn_cache_sweeper(client: ContentClient) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(CACHE_SWEEP_INTERVAL_SECONDS));
        loop {
            interval.tick().await;
            let purged = client.cache().purge_stale().await;
            if purged > 0 {
                debug!(purged, "purged stale content cache entries");
            }
        }
    });
}

/// Give every request its own dictionary scope.
async fn dictionary_scope(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(DictionaryScope::new());
    next.run(request).await
}

fn make_span(request: &axum::http::Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(site_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(site_url).with_context(|| format!("Invalid site URL: {site_url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Site URL must include a valid host: {site_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build site origin header")
}

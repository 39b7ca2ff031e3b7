use axum::response::IntoResponse;

// axum handler for the root path
pub async fn root() -> impl IntoResponse {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

use crate::{
    api::handlers::{
        auth::{current_session, AuthState},
        error_response, ErrorBody,
    },
    auth::Session,
    content::ContentClient,
};
use axum::{extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Role allowed to evict cached content.
pub const ADMIN_ROLE: &str = "admin";

#[derive(ToSchema, Deserialize, Debug)]
pub struct RevalidateRequest {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct RevalidateResponse {
    revalidated: Vec<String>,
    evicted: usize,
}

#[utoipa::path(
    post,
    path = "/api/revalidate",
    request_body = RevalidateRequest,
    responses(
        (status = 200, description = "Tagged cache entries evicted", body = RevalidateResponse),
        (status = 400, description = "No tags given", body = ErrorBody),
        (status = 401, description = "No active session", body = ErrorBody),
        (status = 403, description = "Session lacks the admin role", body = ErrorBody)
    ),
    tag = "content"
)]
#[instrument(skip(headers, auth_state, client, payload))]
pub async fn revalidate(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Extension(client): Extension<ContentClient>,
    payload: Option<Json<RevalidateRequest>>,
) -> impl IntoResponse {
    let user = match current_session(&headers, &auth_state) {
        Session::Authenticated(user) => user,
        Session::Anonymous => {
            return error_response(StatusCode::UNAUTHORIZED, "Not signed in");
        }
    };

    if user.role != ADMIN_ROLE {
        return error_response(StatusCode::FORBIDDEN, "Admin role required");
    }

    let mut tags = payload.map(|Json(request)| request.tags).unwrap_or_default();
    tags.retain(|tag| !tag.trim().is_empty());
    tags.sort();
    tags.dedup();

    if tags.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No tags given");
    }

    let mut evicted = 0;
    for tag in &tags {
        evicted += client.invalidate_tag(tag).await;
    }
    info!(user_id = %user.id, ?tags, evicted, "content cache revalidated");

    Json(RevalidateResponse {
        revalidated: tags,
        evicted,
    })
    .into_response()
}

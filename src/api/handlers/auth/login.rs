use super::{session::session_cookie, state::AuthState};
use crate::{
    api::handlers::{error_response, ErrorBody},
    auth::{AuthError, SessionClaims},
};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct CredentialsResponse {
    pub user: SessionClaims,
    /// Unix seconds at which the issued session expires.
    pub expires: u64,
}

const fn auth_error_status(err: AuthError) -> StatusCode {
    match err {
        AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
        AuthError::UserNotFound | AuthError::NoPasswordSet | AuthError::InvalidPassword => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::AuthUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/callback/credentials",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials accepted, session cookie set", body = CredentialsResponse),
        (status = 400, description = "Email or password missing", body = ErrorBody),
        (status = 401, description = "Credentials rejected", body = ErrorBody),
        (status = 503, description = "Credential store unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn credentials(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<CredentialsRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return error_response(
            StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials.to_string(),
        );
    };

    let claims = match auth_state
        .issuer()
        .authorize(&request.email, &request.password)
        .await
    {
        Ok(claims) => claims,
        Err(err) => return error_response(auth_error_status(err), err.to_string()),
    };

    let token = match auth_state.issuer().issue_token(&claims) {
        Ok(token) => token,
        Err(err) => return error_response(auth_error_status(err), err.to_string()),
    };

    let mut headers = HeaderMap::new();
    match session_cookie(auth_state.config(), &token) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                AuthError::AuthUnavailable.to_string(),
            );
        }
    }

    info!(user_id = %claims.id, "session issued");

    let expires = auth_state
        .issuer()
        .read_session(&token)
        .user()
        .map_or(0, |user| user.expires_at);

    (
        StatusCode::OK,
        headers,
        Json(CredentialsResponse {
            user: claims,
            expires,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(
            auth_error_status(AuthError::MissingCredentials),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            auth_error_status(AuthError::UserNotFound),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_error_status(AuthError::NoPasswordSet),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_error_status(AuthError::InvalidPassword),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            auth_error_status(AuthError::AuthUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

use crate::{
    api::handlers::{
        auth::AuthState, error_response, valid_email, valid_password, ErrorBody,
        MIN_PASSWORD_LENGTH,
    },
    auth::{password, NewUser, PublicUser, StoreError},
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct UserRegister {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = UserRegister,
    responses(
        (status = 201, description = "Registration successful", body = PublicUser, content_type = "application/json"),
        (status = 400, description = "Invalid name, email or password", body = ErrorBody),
        (status = 409, description = "User with the specified email already exists", body = ErrorBody),
        (status = 500, description = "User could not be created", body = ErrorBody),
    ),
    tag = "register"
)]
#[instrument(skip(auth_state, payload))]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserRegister>>,
) -> impl IntoResponse {
    let Some(Json(user)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    let name = user.name.trim().to_string();
    let email = user.email.trim().to_string();

    if name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Name is required");
    }

    if !valid_email(&email) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email");
    }

    if !valid_password(&user.password) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }

    // Not atomic with the create below; two concurrent requests can both pass.
    match auth_state.store().lookup_user_by_email(&email).await {
        Ok(Some(_)) => {
            debug!("User already exists");
            return error_response(StatusCode::CONFLICT, "User already exists");
        }
        Ok(None) => (),
        Err(err) => {
            error!("Error checking if user exists: {err}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error checking if user exists",
            );
        }
    }

    let cost = auth_state.config().password_cost();
    let plaintext = user.password;
    let password_hash =
        match tokio::task::spawn_blocking(move || password::hash_with_cost(&plaintext, cost)).await
        {
            Ok(Ok(hash)) => hash,
            Ok(Err(err)) => {
                error!("Error hashing password: {err}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error hashing password");
            }
            Err(err) => {
                error!("Password hashing task failed: {err}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error hashing password");
            }
        };

    let new_user = NewUser {
        email,
        name,
        password_hash,
    };

    match auth_state.store().create_user(new_user).await {
        Ok(created) => {
            info!(user_id = %created.id, "user registered");
            (StatusCode::CREATED, Json(PublicUser::from(&created))).into_response()
        }
        // A duplicate that raced past the pre-check is rejected by the store.
        Err(StoreError::Rejected(reason)) => {
            debug!("User creation rejected: {reason}");
            error_response(StatusCode::CONFLICT, "User already exists")
        }
        Err(err) => {
            error!("Error creating user: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error creating user")
        }
    }
}

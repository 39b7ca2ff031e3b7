use crate::{
    api::handlers::{error_response, ErrorBody},
    content::{ContentClient, ContentError, DictionaryScope},
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize)]
pub struct DictionaryResponse {
    locale: String,
    common: BTreeMap<String, String>,
}

#[utoipa::path(
    get,
    path = "/api/dictionary/{locale}",
    params(
        ("locale" = String, Path, description = "Locale code such as `en` or `pt_BR`")
    ),
    responses(
        (status = 200, description = "Keyword dictionary for the locale", body = DictionaryResponse),
        (status = 400, description = "Malformed locale", body = ErrorBody),
        (status = 502, description = "Content store unavailable", body = ErrorBody)
    ),
    tag = "content"
)]
#[instrument(skip(client, scope))]
pub async fn dictionary(
    Path(locale): Path<String>,
    Extension(client): Extension<ContentClient>,
    Extension(scope): Extension<DictionaryScope>,
) -> impl IntoResponse {
    match scope.get(&client, &locale).await {
        Ok(dictionary) => Json(DictionaryResponse {
            locale: dictionary.locale.clone(),
            common: dictionary.common.clone(),
        })
        .into_response(),
        Err(ContentError::InvalidLocale(locale)) => {
            error_response(StatusCode::BAD_REQUEST, format!("Invalid locale: {locale}"))
        }
        Err(err) => {
            error!("Failed to load dictionary: {err}");
            error_response(StatusCode::BAD_GATEWAY, "Content store unavailable")
        }
    }
}

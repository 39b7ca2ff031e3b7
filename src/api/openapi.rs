use super::handlers::{auth, dictionary, health, revalidate, user_register};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and documented. Routes added outside (`/`, `OPTIONS /health`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(user_register::register))
        .routes(routes!(auth::login::credentials))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::signout))
        .routes(routes!(dictionary::dictionary))
        .routes(routes!(revalidate::revalidate));

    router.get_openapi_mut().tags = Some(vec![
        tag("health", "Service liveness and build metadata"),
        tag("register", "Account registration"),
        tag("auth", "Credential sign-in and sessions"),
        tag("content", "Localized content and cache revalidation"),
    ]);

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => (
            optional_str(name),
            optional_str(rest.trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Atrium"));
            assert_eq!(contact.email.as_deref(), Some("team@atrium.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some_and(|license| license.name == "BSD-3-Clause"));
    }

    #[test]
    fn openapi_documents_every_endpoint() {
        let spec = openapi();
        for path in [
            "/health",
            "/api/register",
            "/api/auth/callback/credentials",
            "/api/auth/session",
            "/api/auth/signout",
            "/api/dictionary/{locale}",
            "/api/revalidate",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = spec.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "content"));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Ada <ada@example.com>"),
            (Some("Ada"), Some("ada@example.com"))
        );
        assert_eq!(parse_author("Ada"), (Some("Ada"), None));
        assert_eq!(parse_author("<ada@example.com>"), (None, Some("ada@example.com")));
        assert_eq!(parse_author(""), (None, None));
    }
}

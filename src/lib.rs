//! # Atrium (Site Sessions & Content Access)
//!
//! `atrium` is the server-side core of a content-managed site. It issues
//! credential-based sessions and mediates every read from the headless content
//! store through a cache.
//!
//! ## Sessions
//!
//! Users sign in with email and password. Passwords are stored as bcrypt digests in
//! the content store; a successful authorization mints a signed JWT carrying the
//! user id and role. Sessions are fully stateless: there is no server-side session
//! table, so a token stays valid until it expires.
//!
//! ## Content
//!
//! Queries against the content store are cached per `(query, params, perspective,
//! cdn)` with a revalidation horizon and can be evicted by tag. Localized
//! dictionaries are additionally cached per request, so a page render never asks
//! the store twice for the same locale.
//!
//! ## Registration
//!
//! [`register`] holds the client-side orchestration: local validation, account
//! creation, then an immediate sign-in with the same credentials.

pub mod api;
pub mod auth;
pub mod cli;
pub mod content;
pub mod register;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

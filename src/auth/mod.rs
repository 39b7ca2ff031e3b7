//! Credential authentication and stateless sessions.
//!
//! - [`store`] reads and writes user records in the content store.
//! - [`password`] hashes and verifies bcrypt digests.
//! - [`session`] authorizes credentials and signs/reads session tokens.
//!
//! ## Session Tokens
//!
//! Tokens are HS256 JWTs signed with the process-wide session secret. They carry
//! the user id and role plus the display attributes shown by the site header.
//! There is no server-side session table: a token remains valid until `exp`,
//! and signing out only clears the client cookie.

pub mod password;
pub mod session;
pub mod store;

pub use session::{AuthError, Session, SessionClaims, SessionIssuer, SessionUser};
pub use store::{
    ContentCredentialStore, CredentialStore, MemoryCredentialStore, NewUser, PublicUser,
    StoreError, User,
};

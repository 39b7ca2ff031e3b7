//! Credential sign-in and session endpoints.
//!
//! Flow Overview: `POST /api/auth/callback/credentials` authorizes an
//! email/password pair, signs a session token and sets it as an `HttpOnly`
//! cookie. `GET /api/auth/session` reads the token back from the cookie (or a
//! bearer header) and `POST /api/auth/signout` clears the cookie. Tokens are not
//! tracked server-side.

pub mod login;
pub mod session;
mod state;

pub use session::{current_session, extract_session_token};
pub use state::{AuthConfig, AuthState};

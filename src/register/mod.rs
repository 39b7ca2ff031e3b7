//! Client side of account registration.
//!
//! Validates the form locally, creates the account through the API, then signs
//! straight in. If the account is created but the sign-in fails, the person is
//! told to sign in manually and sent to the login page after a short pause.
//!
//! Flow Overview: Idle -> Submitting -> Redirecting (success) or Failure
//! (message shown, form usable again).

mod http;

pub use crate::auth::password::MIN_PASSWORD_LENGTH;
pub use http::HttpRegistrationApi;

use crate::auth::PublicUser;
use async_trait::async_trait;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTRATION_FAILED: &str = "Registration failed";
pub const SIGN_IN_FAILED: &str = "Account created but login failed. Please sign in manually.";
/// Pause before sending the person to the login page after a failed sign-in.
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(2000);

#[derive(Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,
}

impl RegistrationForm {
    /// Local checks, in order: confirmation first, then length.
    ///
    /// # Errors
    /// Returns the first failed [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {status}")]
    Rejected { status: u16, message: Option<String> },
}

impl ApiError {
    /// Text shown to the person filling the form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            _ => REGISTRATION_FAILED.to_string(),
        }
    }
}

/// Remote side of the flow.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    async fn register(&self, name: &str, email: &str, password: &str)
        -> Result<PublicUser, ApiError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError>;
}

/// Where the flow sends the person once it is done.
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);

    fn refresh(&self);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Submitting,
    /// A message is on screen; the form can be submitted again.
    Failure(String),
    Redirecting { to: String },
}

impl FlowState {
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

pub struct RegistrationFlow {
    api: Arc<dyn RegistrationApi>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<FlowState>,
}

impl fmt::Debug for RegistrationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationFlow")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl RegistrationFlow {
    #[must_use]
    pub fn new(api: Arc<dyn RegistrationApi>, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(FlowState::Idle);
        Self {
            api,
            navigator,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state.borrow().clone()
    }

    /// Observe every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    /// Run one submission and return the state it ends in.
    ///
    /// A submission while another is in flight is ignored.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn submit(&self, form: &RegistrationForm) -> FlowState {
        let next = match form.validate() {
            Ok(()) => FlowState::Submitting,
            Err(err) => FlowState::Failure(err.to_string()),
        };

        // Check and transition in one step so two callers cannot both start.
        let accepted = self.state.send_if_modified(|state| {
            if state.is_submitting() {
                false
            } else {
                *state = next.clone();
                true
            }
        });
        if !accepted {
            debug!("submission already in flight");
            return FlowState::Submitting;
        }
        if !next.is_submitting() {
            return next;
        }

        if let Err(err) = self
            .api
            .register(&form.name, &form.email, &form.password)
            .await
        {
            warn!("Registration failed: {err}");
            return self.set(FlowState::Failure(err.user_message()));
        }

        if let Err(err) = self.api.sign_in(&form.email, &form.password).await {
            warn!("Sign-in after registration failed: {err}");
            self.set(FlowState::Failure(SIGN_IN_FAILED.to_string()));
            tokio::time::sleep(LOGIN_REDIRECT_DELAY).await;
            self.navigator.push(LOGIN_PATH);
            return self.set(FlowState::Redirecting {
                to: LOGIN_PATH.to_string(),
            });
        }

        self.navigator.push(DASHBOARD_PATH);
        self.navigator.refresh();
        self.set(FlowState::Redirecting {
            to: DASHBOARD_PATH.to_string(),
        })
    }

    fn set(&self, state: FlowState) -> FlowState {
        self.state.send_replace(state.clone());
        state
    }
}

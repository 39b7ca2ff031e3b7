use crate::{
    cli::commands::register::Options,
    register::{FlowState, HttpRegistrationApi, Navigator, RegistrationFlow, RegistrationForm},
};
use anyhow::{anyhow, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;
use url::Url;

pub type Args = Options;

/// Prints where a browser would be sent next.
#[derive(Debug)]
struct ConsoleNavigator {
    base_url: Url,
}

impl Navigator for ConsoleNavigator {
    fn push(&self, path: &str) {
        let target = self
            .base_url
            .join(path)
            .map_or_else(|_| path.to_string(), String::from);
        info!(target = %target, "navigate");
        println!("-> {target}");
    }

    fn refresh(&self) {
        info!("refresh");
    }
}

/// Register an account against a running server and sign straight in.
/// # Errors
/// Returns an error if validation, registration or the follow-up sign-in fails.
pub async fn execute(args: Args) -> Result<()> {
    let api = Arc::new(HttpRegistrationApi::new(args.api_url.clone())?);
    let navigator = Arc::new(ConsoleNavigator {
        base_url: args.api_url.clone(),
    });
    let flow = RegistrationFlow::new(api, navigator);

    let form = RegistrationForm {
        name: args.name,
        email: args.email,
        password: args.password.expose_secret().to_string(),
        confirm_password: args.confirm_password.expose_secret().to_string(),
    };

    finish(flow.submit(&form).await)
}

fn finish(state: FlowState) -> Result<()> {
    match state {
        FlowState::Redirecting { to } if to == crate::register::DASHBOARD_PATH => {
            println!("Registered and signed in");
            Ok(())
        }
        FlowState::Redirecting { .. } => Err(anyhow!(crate::register::SIGN_IN_FAILED)),
        FlowState::Failure(message) => Err(anyhow!(message)),
        FlowState::Idle | FlowState::Submitting => Err(anyhow!("Registration did not complete")),
    }
}

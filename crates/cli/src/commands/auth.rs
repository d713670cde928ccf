//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! swan-cli auth register -e asha@example.com -p secret -n "Asha"
//! swan-cli auth login -e asha@example.com -p secret
//! swan-cli auth status
//! swan-cli auth logout
//! ```

use clap::Subcommand;
use secrecy::{ExposeSecret, SecretString};
use swan_botanical_session::{AuthState, LoginOutcome, SessionProvider};
use thiserror::Error;

/// Errors that can occur during auth commands.
#[derive(Debug, Error)]
pub enum AuthCommandError {
    /// The API refused the credentials.
    #[error("{0}")]
    Rejected(String),

    /// The session was replaced while the request was in flight.
    #[error("Login was superseded by another session change")]
    Superseded,
}

#[derive(Subcommand)]
pub enum AuthAction {
    /// Show the current session
    Status,
    /// Log in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,
    },
    /// End the session
    Logout,
}

pub async fn run(provider: &SessionProvider, action: AuthAction) -> Result<(), AuthCommandError> {
    let auth = provider.auth();

    let outcome = match action {
        AuthAction::Status => None,
        AuthAction::Login { email, password } => {
            let password = SecretString::from(password);
            Some(auth.login(&email, password.expose_secret()).await)
        }
        AuthAction::Register {
            email,
            password,
            name,
        } => {
            let password = SecretString::from(password);
            Some(auth.register(&email, password.expose_secret(), &name).await)
        }
        AuthAction::Logout => {
            auth.logout();
            None
        }
    };

    match outcome {
        Some(LoginOutcome::Rejected(message)) => return Err(AuthCommandError::Rejected(message)),
        Some(LoginOutcome::Superseded) => return Err(AuthCommandError::Superseded),
        Some(LoginOutcome::Authenticated(_)) | None => {}
    }

    print_status(&auth.state());
    Ok(())
}

fn print_status(state: &AuthState) {
    match state.identity() {
        Some(identity) => println!(
            "Logged in as {} <{}>",
            identity.display_name(),
            identity.email
        ),
        None => println!("Not logged in"),
    }
    if let Some(error) = state.error() {
        println!("Last error: {error}");
    }
}

//! Barber command - email/password accounts on the auth provider

use std::sync::Arc;

use anyhow::Result;
use barberbook_core::services::LoggingService;
use clap::Subcommand;

use super::{get_context, password_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum BarberCommands {
    /// Create a barber account and sign in
    Signup {
        email: String,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in
    Login {
        email: String,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in barber
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update display name and/or photo URL
    Profile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        photo_url: Option<String>,
    },
    /// Send a password reset email
    ResetPassword { email: String },
}

pub fn run(command: BarberCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let session = ctx.barber_session()?;
    session.sync_auth_state();

    match command {
        BarberCommands::Signup { email, password } => {
            let password = password_or_prompt(password, "Password")?;
            let user = session.sign_up(&email, &password)?;
            output::success(&format!(
                "Barber account created for {}",
                user.email.as_deref().unwrap_or(&user.uid)
            ));
        }
        BarberCommands::Login { email, password } => {
            let password = password_or_prompt(password, "Password")?;
            let user = session.sign_in(&email, &password)?;
            output::success(&format!("Signed in as {}", user.email.as_deref().unwrap_or(&user.uid)));
        }
        BarberCommands::Logout => {
            session.sign_out()?;
            output::success("Signed out");
        }
        BarberCommands::Whoami { json } => match session.current_user() {
            Some(user) if json => output::json(&user)?,
            Some(user) => {
                output::info(&format!("Provider: {}", session.provider_name()));
                output::print_auth_user(&user);
            }
            None if json => println!("null"),
            None => output::warning("Not signed in. Use 'bb barber login' to sign in."),
        },
        BarberCommands::Profile {
            display_name,
            photo_url,
        } => {
            if !session.is_authenticated() {
                output::warning("Not signed in.");
                return Ok(());
            }
            session.update_profile(display_name.as_deref(), photo_url.as_deref())?;
            output::success("Profile updated");
            if let Some(user) = session.current_user() {
                output::print_auth_user(&user);
            }
        }
        BarberCommands::ResetPassword { email } => {
            session.reset_password(&email)?;
            output::success(&format!("Password reset email sent to {}", email.trim()));
        }
    }

    Ok(())
}

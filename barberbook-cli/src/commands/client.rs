//! Client command - phone/password client accounts

use std::sync::Arc;

use anyhow::Result;
use barberbook_core::services::LoggingService;
use barberbook_core::{NewUser, UserProfilePatch};
use clap::Subcommand;

use super::{get_context, password_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Create a client account and sign in
    Signup {
        /// Full name
        #[arg(long)]
        name: String,
        /// Phone number
        #[arg(long)]
        phone: String,
        /// Optional email address
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in with phone number or email
    Login {
        /// Phone number or email
        identifier: String,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show the signed-in client
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, conflicts_with = "clear_email")]
        email: Option<String>,
        /// Remove the email address
        #[arg(long)]
        clear_email: bool,
    },
    /// Change password
    Password {
        /// Current password (prompted if omitted)
        #[arg(long)]
        old: Option<String>,
        /// New password (prompted if omitted)
        #[arg(long)]
        new: Option<String>,
    },
    /// Reload the signed-in client from the database
    Refresh,
}

pub fn run(command: ClientCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let session = &ctx.client_session;

    match command {
        ClientCommands::Signup {
            name,
            phone,
            email,
            password,
        } => {
            let password = password_or_prompt(password, "Password")?;
            let mut input = NewUser::new(name, phone, password);
            if let Some(email) = email {
                input = input.with_email(email);
            }
            let user = session.sign_up(input)?;
            output::success(&format!("Welcome, {}!", user.name));
        }
        ClientCommands::Login { identifier, password } => {
            let password = password_or_prompt(password, "Password")?;
            let user = session.sign_in(&identifier, &password)?;
            output::success(&format!("Signed in as {}", user.name));
        }
        ClientCommands::Logout => {
            session.sign_out()?;
            output::success("Signed out");
        }
        ClientCommands::Whoami { json } => match session.current_user() {
            Some(user) if json => output::json(&user)?,
            Some(user) => output::print_user(&user),
            None if json => println!("null"),
            None => output::warning("Not signed in. Use 'bb client login' to sign in."),
        },
        ClientCommands::Profile {
            name,
            phone,
            email,
            clear_email,
        } => {
            let mut patch = UserProfilePatch::default();
            if let Some(name) = name {
                patch = patch.with_name(name);
            }
            if let Some(phone) = phone {
                patch = patch.with_phone(phone);
            }
            if let Some(email) = email {
                patch = patch.with_email(email);
            }
            if clear_email {
                patch = patch.clear_email();
            }

            let user = session.update_profile(patch)?;
            output::success("Profile updated");
            output::print_user(&user);
        }
        ClientCommands::Password { old, new } => {
            let old = password_or_prompt(old, "Current password")?;
            let new = password_or_prompt(new, "New password")?;
            session.change_password(&old, &new)?;
            output::success("Password changed");
        }
        ClientCommands::Refresh => match session.refresh_user()? {
            Some(user) => output::print_user(&user),
            None => output::warning("Not signed in."),
        },
    }

    Ok(())
}

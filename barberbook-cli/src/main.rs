//! Barberbook CLI - barber and client bookings in your terminal

use std::process::ExitCode;

use anyhow::Result;
use barberbook_core::services::LogEvent;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{barber, booking, client, demo, get_logger, log_event, logs, status};

/// Barberbook - barber and client bookings in your terminal
#[derive(Parser)]
#[command(name = "bb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Client accounts (phone + password)
    Client {
        #[command(subcommand)]
        command: client::ClientCommands,
    },

    /// Barber accounts (email + password on the auth provider)
    Barber {
        #[command(subcommand)]
        command: barber::BarberCommands,
    },

    /// Create and manage bookings
    Booking {
        #[command(subcommand)]
        command: booking::BookingCommands,
    },

    /// Show sessions and booking summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Client { .. } => "client",
            Commands::Barber { .. } => "barber",
            Commands::Booking { .. } => "booking",
            Commands::Status { .. } => "status",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Core errors print without their category prefix
            match e.downcast_ref::<barberbook_core::Error>() {
                Some(core) if core.is_user_facing() => output::error(&core.message()),
                _ => output::error(&format!("{:#}", e)),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let logger = get_logger();
    let name = cli.command.name();
    log_event(&logger, LogEvent::new("command_executed").with_command(name));

    let result = match cli.command {
        Commands::Client { command } => client::run(command, &logger),
        Commands::Barber { command } => barber::run(command, &logger),
        Commands::Booking { command } => booking::run(command, &logger),
        Commands::Status { json } => status::run(json, &logger),
        Commands::Demo { command } => demo::run(command),
        Commands::Logs { command } => logs::run(command),
    };

    if let Err(e) = &result {
        // CLI-level messages can echo user input; core messages are fixed text
        let message = match e.downcast_ref::<barberbook_core::Error>() {
            Some(core) if core.is_user_facing() => core.message(),
            _ => "command failed".to_string(),
        };
        log_event(
            &logger,
            LogEvent::new("command_failed")
                .with_command(name)
                .with_error(message)
                .with_error_details(error_kind(e)),
        );
    }

    result
}

/// Coarse error category for the log
fn error_kind(e: &anyhow::Error) -> &'static str {
    use barberbook_core::Error;
    match e.downcast_ref::<Error>() {
        Some(Error::Validation(_)) => "validation",
        Some(Error::Conflict(_)) => "conflict",
        Some(Error::Auth(_)) => "auth",
        Some(Error::NotFound(_)) => "not_found",
        Some(Error::Database(_)) => "database",
        Some(Error::Storage(_)) => "storage",
        Some(Error::Provider(_)) => "provider",
        Some(Error::Config(_)) => "config",
        Some(_) => "internal",
        None => "cli",
    }
}

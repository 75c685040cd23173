//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_app_dir;
use barberbook_core::services::{DemoService, DEMO_BARBER_EMAIL, DEMO_CLIENT_PHONE, DEMO_PASSWORD};

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off {
        /// Also delete the demo database and demo accounts
        #[arg(long)]
        clean: bool,
    },
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let app_dir = get_app_dir()?;
    std::fs::create_dir_all(&app_dir)?;
    let demo_service = DemoService::new(&app_dir);

    match command {
        Some(DemoCommands::On) => {
            demo_service.enable()?;
            println!("{}", "Demo mode enabled".green());
            println!("Demo data has been populated. Sign in with:");
            println!("  bb client login {} --password {}", DEMO_CLIENT_PHONE, DEMO_PASSWORD);
            println!("  bb barber login {} --password {}", DEMO_BARBER_EMAIL, DEMO_PASSWORD);
            Ok(())
        }
        Some(DemoCommands::Off { clean }) => {
            demo_service.disable(clean)?;
            println!("{}", "Demo mode disabled".yellow());
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if demo_service.is_enabled()? {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}

//! Booking command - appointments for the signed-in client

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use barberbook_core::domain::booking::sort_by_date_desc;
use barberbook_core::services::{BookingService, LoggingService};
use barberbook_core::{BarberbookContext, Booking, BookingFilter, BookingPatch, BookingStatus, NewBooking, Patch};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;

use super::{confirm, get_context};
use crate::output;

#[derive(Subcommand)]
pub enum BookingCommands {
    /// Book an appointment
    New {
        /// Local date and time, e.g. "2026-11-02 14:30"
        date: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List bookings, most recent first
    List {
        /// Filter by status (all, pending, cancelled, completed)
        #[arg(long, default_value = "all")]
        status: String,
        /// Every client's bookings instead of the signed-in client's
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one booking
    Show {
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Cancel an upcoming pending booking
    Cancel {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Mark a booking as completed
    Complete { id: String },
    /// Set or clear booking notes
    Notes {
        id: String,
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        clear: bool,
    },
    /// Delete a cancelled or completed booking
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

/// Parse a local date/time, or an RFC 3339 timestamp
fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input.trim(), fmt).ok())
        .ok_or_else(|| anyhow!("Invalid date '{}'. Use \"YYYY-MM-DD HH:MM\"", input))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("'{}' does not exist in the local time zone", input))
}

fn signed_in_client_id(ctx: &BarberbookContext) -> Result<String> {
    ctx.client_session
        .current_user()
        .map(|u| u.id)
        .ok_or_else(|| anyhow!("Not signed in. Use 'bb client login' first."))
}

pub fn run(command: BookingCommands, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;
    let bookings = &ctx.booking_service;

    match command {
        BookingCommands::New { date, notes } => {
            let user_id = signed_in_client_id(&ctx)?;
            let mut input = NewBooking::new(user_id, parse_date(&date)?);
            if let Some(notes) = notes {
                input = input.with_notes(notes);
            }
            let booking = bookings.create_booking(input)?;
            output::success(&format!(
                "Booked for {} ({})",
                output::format_datetime(&booking.booking_date),
                booking.id
            ));
        }
        BookingCommands::List { status, all, json } => {
            let filter: BookingFilter = status.parse()?;
            let list = if all {
                let mut list: Vec<Booking> = bookings
                    .get_all_bookings()?
                    .into_iter()
                    .filter(|b| filter.matches(b))
                    .collect();
                sort_by_date_desc(&mut list);
                list
            } else {
                bookings.list_bookings_for_user(&signed_in_client_id(&ctx)?, filter)?
            };

            if json {
                return output::json(&list);
            }
            if list.is_empty() {
                println!("No bookings found.");
                return Ok(());
            }

            let summary = BookingService::summarize(&list, Utc::now());
            output::print_bookings(&list);
            println!(
                "{} total, {} upcoming, {} pending",
                summary.total,
                summary.upcoming.to_string().cyan(),
                summary.pending.to_string().yellow()
            );
        }
        BookingCommands::Show { id, json } => {
            let booking = bookings.get_booking(&id)?;
            if json {
                return output::json(&booking);
            }
            output::print_booking(&booking);
        }
        BookingCommands::Cancel { id, force } => {
            let booking = bookings.get_booking(&id)?;
            if !booking.can_cancel(Utc::now()) {
                bail!("Only upcoming pending bookings can be cancelled");
            }
            let prompt = format!(
                "Cancel the booking on {}?",
                output::format_datetime(&booking.booking_date)
            );
            if !confirm(&prompt, force)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            bookings.update_booking(&id, BookingPatch::status(BookingStatus::Cancelled))?;
            output::success("Booking cancelled");
        }
        BookingCommands::Complete { id } => {
            let booking = bookings.update_booking(&id, BookingPatch::status(BookingStatus::Completed))?;
            output::success("Booking completed");
            output::print_booking(&booking);
        }
        BookingCommands::Notes { id, text, clear } => {
            let patch = match (text, clear) {
                (Some(text), _) => BookingPatch::notes(text),
                (None, true) => BookingPatch {
                    notes: Patch::Clear,
                    ..Default::default()
                },
                (None, false) => bail!("Provide the notes text or --clear"),
            };
            let booking = bookings.update_booking(&id, patch)?;
            output::success("Notes updated");
            output::print_booking(&booking);
        }
        BookingCommands::Delete { id, force } => {
            let booking = bookings.get_booking(&id)?;
            if !booking.can_delete() {
                bail!("Only cancelled or completed bookings can be deleted");
            }
            if !confirm("Delete this booking permanently?", force)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            bookings.delete_booking(&id)?;
            output::success("Booking deleted");
        }
    }

    Ok(())
}

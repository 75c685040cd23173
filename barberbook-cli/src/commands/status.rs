//! Status command - sessions and booking summary

use std::sync::Arc;

use anyhow::Result;
use barberbook_core::services::{BookingService, LoggingService};
use barberbook_core::BookingFilter;
use chrono::Utc;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use serde_json::json;

use super::get_context;
use crate::output;

pub fn run(json: bool, logger: &Option<Arc<LoggingService>>) -> Result<()> {
    let ctx = get_context(logger)?;

    let client = ctx.client_session.current_user();
    let barber = ctx.barber_session().ok().map(|session| {
        session.sync_auth_state();
        (session.provider_name().to_string(), session.current_user())
    });

    let bookings = match &client {
        Some(user) => ctx.booking_service.list_bookings_for_user(&user.id, BookingFilter::All)?,
        None => ctx.booking_service.get_all_bookings()?,
    };
    let summary = BookingService::summarize(&bookings, Utc::now());
    let most_recent = match &client {
        Some(user) => ctx.booking_service.most_recent_booking(&user.id)?,
        None => None,
    };

    if json {
        let status = json!({
            "demoMode": ctx.config.demo_mode,
            "client": client,
            "barberProvider": barber.as_ref().map(|(name, _)| name),
            "barber": barber.as_ref().and_then(|(_, user)| user.as_ref()),
            "bookings": summary,
            "mostRecentBooking": most_recent,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Barberbook Status".bold());
    if ctx.config.demo_mode {
        println!("{}", "Demo mode is ON".yellow());
    }
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let client_label = client
        .as_ref()
        .map(|u| format!("{} ({})", u.name, u.phone))
        .unwrap_or_else(|| "not signed in".to_string());
    table.add_row(vec!["Client".to_string(), client_label]);

    let barber_label = match &barber {
        Some((_, Some(user))) => user.email.clone().unwrap_or_else(|| user.uid.clone()),
        Some((provider, None)) => format!("not signed in ({})", provider),
        None => "no auth provider configured".to_string(),
    };
    table.add_row(vec!["Barber".to_string(), barber_label]);

    println!("{}", table);
    println!();

    let scope = if client.is_some() { "Your bookings" } else { "All bookings" };
    println!("{}", scope.bold());

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Total", &summary.total.to_string()]);
    table.add_row(vec!["Upcoming", &summary.upcoming.to_string()]);
    table.add_row(vec!["Pending", &summary.pending.to_string()]);
    table.add_row(vec!["Completed", &summary.completed.to_string()]);
    table.add_row(vec!["Cancelled", &summary.cancelled.to_string()]);
    println!("{}", table);

    if let Some(booking) = &most_recent {
        println!();
        println!("{}", "Most recent booking".bold());
        output::print_booking(booking);
    }

    Ok(())
}

//! Output formatting utilities

use barberbook_core::{AuthUser, Booking, BookingStatus, User};
use chrono::{DateTime, Local, Utc};
use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print any serializable value as pretty JSON
pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a timestamp in local time
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_status(status: BookingStatus) -> ColoredString {
    match status {
        BookingStatus::Pending => status.as_str().yellow(),
        BookingStatus::Completed => status.as_str().green(),
        BookingStatus::Cancelled => status.as_str().red(),
    }
}

pub fn print_user(user: &User) {
    let mut table = create_table();
    table.add_row(vec!["ID", &user.id]);
    table.add_row(vec!["Name", &user.name]);
    table.add_row(vec!["Phone", &user.phone]);
    table.add_row(vec!["Email", user.email.as_deref().unwrap_or("-")]);
    if let Some(created) = &user.created_at {
        table.add_row(vec!["Member since".to_string(), format_datetime(created)]);
    }
    println!("{}", table);
}

pub fn print_auth_user(user: &AuthUser) {
    let mut table = create_table();
    table.add_row(vec!["UID", &user.uid]);
    table.add_row(vec!["Email", user.email.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Name", user.display_name.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Photo", user.photo_url.as_deref().unwrap_or("-")]);
    table.add_row(vec!["Verified", if user.email_verified { "yes" } else { "no" }]);
    println!("{}", table);
}

pub fn print_booking(booking: &Booking) {
    let mut table = create_table();
    table.add_row(vec!["ID".to_string(), booking.id.clone()]);
    table.add_row(vec!["Date".to_string(), format_datetime(&booking.booking_date)]);
    table.add_row(vec!["Status".to_string(), format_status(booking.status).to_string()]);
    table.add_row(vec!["Notes".to_string(), booking.notes.clone().unwrap_or_else(|| "-".to_string())]);
    if let Some(created) = &booking.created_at {
        table.add_row(vec!["Booked".to_string(), format_datetime(created)]);
    }
    println!("{}", table);
}

pub fn print_bookings(bookings: &[Booking]) {
    let mut table = create_table();
    table.set_header(vec!["ID", "Date", "Status", "Notes"]);
    for booking in bookings {
        table.add_row(vec![
            booking.id.clone(),
            format_datetime(&booking.booking_date),
            format_status(booking.status).to_string(),
            booking.notes.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
}

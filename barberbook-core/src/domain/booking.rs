//! Booking domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patch::Patch;
use super::result::Error;

/// Lifecycle status of a booking
///
/// Transitions are not enforced here: any status may be written at any time.
/// The gating the screens apply lives in [`Booking::can_cancel`] and
/// [`Booking::can_delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Cancelled and completed bookings only offer deletion
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl Default for BookingStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(Error::validation(format!("Unknown booking status: {}", other))),
        }
    }
}

/// A scheduled appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub booking_date: DateTime<Utc>,
    pub status: BookingStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Assigned by the store; absent on the value returned from creation
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.booking_date > now
    }

    /// Only pending bookings that have not happened yet can be cancelled
    pub fn can_cancel(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.is_upcoming(now)
    }

    pub fn can_delete(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Booking creation input
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: String,
    pub booking_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewBooking {
    pub fn new(user_id: impl Into<String>, booking_date: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            booking_date,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Partial booking update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingPatch {
    pub status: Option<BookingStatus>,
    pub notes: Patch<String>,
}

impl BookingPatch {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
            notes: Patch::Unset,
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            status: None,
            notes: Patch::Set(notes.into()),
        }
    }
}

/// Status filter used by booking lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingFilter {
    #[default]
    All,
    Status(BookingStatus),
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => booking.status == *status,
        }
    }
}

impl FromStr for BookingFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Status)
        }
    }
}

/// Most recent booking date first
pub fn sort_by_date_desc(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
}

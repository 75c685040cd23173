//! Booking service - appointment CRUD
//!
//! The service does not enforce status transitions. Screens and the CLI use
//! the predicates on [`Booking`] to decide which actions to offer.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::domain::booking::sort_by_date_desc;
use crate::domain::result::{Error, Result};
use crate::domain::{Booking, BookingFilter, BookingPatch, BookingStatus, NewBooking, Patch};
use crate::ports::BookingRepository;

/// Counts shown above a booking list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub total: usize,
    pub pending: usize,
    pub cancelled: usize,
    pub completed: usize,
    /// Bookings dated after `now`, whatever their status
    pub upcoming: usize,
}

pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
}

impl BookingService {
    pub fn new(bookings: Arc<dyn BookingRepository>) -> Self {
        Self { bookings }
    }

    /// Create a pending booking
    ///
    /// The returned booking has no `created_at`; the store assigns it and
    /// callers re-fetch to see it.
    pub fn create_booking(&self, input: NewBooking) -> Result<Booking> {
        if input.user_id.trim().is_empty() {
            return Err(Error::validation("User ID is required"));
        }

        let booking = NewBooking {
            user_id: input.user_id.trim().to_string(),
            // The store keeps microseconds
            booking_date: input.booking_date.trunc_subsecs(6),
            notes: input.notes.filter(|n| !n.trim().is_empty()),
        };

        let id = self.bookings.insert_booking(&booking, BookingStatus::Pending)?;

        Ok(Booking {
            id,
            user_id: booking.user_id,
            booking_date: booking.booking_date,
            status: BookingStatus::Pending,
            notes: booking.notes,
            created_at: None,
        })
    }

    pub fn get_booking(&self, id: &str) -> Result<Booking> {
        self.bookings
            .get_booking(id)?
            .ok_or_else(|| Error::not_found("Booking not found"))
    }

    pub fn get_bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        self.bookings.get_bookings_by_user(user_id)
    }

    pub fn get_all_bookings(&self) -> Result<Vec<Booking>> {
        self.bookings.get_all_bookings()
    }

    /// A user's bookings matching `filter`, newest booking date first
    pub fn list_bookings_for_user(&self, user_id: &str, filter: BookingFilter) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .get_bookings_by_user(user_id)?
            .into_iter()
            .filter(|b| filter.matches(b))
            .collect();
        sort_by_date_desc(&mut bookings);
        Ok(bookings)
    }

    /// The booking with the latest booking date, the client dashboard's headline card
    pub fn most_recent_booking(&self, user_id: &str) -> Result<Option<Booking>> {
        Ok(self
            .list_bookings_for_user(user_id, BookingFilter::All)?
            .into_iter()
            .next())
    }

    /// Write the supplied fields and return the stored booking
    pub fn update_booking(&self, id: &str, patch: BookingPatch) -> Result<Booking> {
        let patch = BookingPatch {
            status: patch.status,
            notes: match patch.notes {
                Patch::Set(notes) if notes.trim().is_empty() => Patch::Clear,
                other => other,
            },
        };

        if !self.bookings.update_booking(id, &patch)? {
            return Err(Error::not_found("Booking not found"));
        }
        self.get_booking(id)
    }

    /// Hard delete; a missing booking is not an error
    pub fn delete_booking(&self, id: &str) -> Result<()> {
        self.bookings.delete_booking(id)
    }

    pub fn summarize(bookings: &[Booking], now: DateTime<Utc>) -> BookingSummary {
        let mut summary = BookingSummary {
            total: bookings.len(),
            ..Default::default()
        };
        for booking in bookings {
            match booking.status {
                BookingStatus::Pending => summary.pending += 1,
                BookingStatus::Cancelled => summary.cancelled += 1,
                BookingStatus::Completed => summary.completed += 1,
            }
            if booking.is_upcoming(now) {
                summary.upcoming += 1;
            }
        }
        summary
    }
}

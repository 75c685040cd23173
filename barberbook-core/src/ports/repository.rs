//! Repository ports - document store abstraction
//!
//! The store owns ID generation and creation timestamps. Uniqueness of
//! phone and email is the store's job too: the write and the check happen
//! atomically on the store side, so callers never check-then-act.

use crate::domain::result::Result;
use crate::domain::{Booking, BookingPatch, BookingStatus, NewBooking, NewUserRecord, UserChanges, UserRecord};

/// Outcome of a user write that is subject to uniqueness rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserWrite<T> {
    Applied(T),
    /// No user with that ID (updates only)
    Missing,
    PhoneTaken,
    EmailTaken,
}

/// `users` collection
pub trait UserRepository: Send + Sync {
    /// Insert a user unless the phone or email is already taken
    fn insert_user(&self, user: &NewUserRecord) -> Result<UserWrite<UserRecord>>;

    fn get_user(&self, id: &str) -> Result<Option<UserRecord>>;

    fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserRecord>>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Apply profile changes; phone/email must not belong to another user
    fn update_user(&self, id: &str, changes: &UserChanges) -> Result<UserWrite<()>>;

    /// Overwrite the stored password hash. Returns false if the user is missing.
    fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool>;
}

/// `bookings` collection
pub trait BookingRepository: Send + Sync {
    /// Insert a booking and return its generated ID
    fn insert_booking(&self, booking: &NewBooking, status: BookingStatus) -> Result<String>;

    fn get_booking(&self, id: &str) -> Result<Option<Booking>>;

    /// Unordered
    fn get_bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>>;

    /// Unordered
    fn get_all_bookings(&self) -> Result<Vec<Booking>>;

    /// Write only the supplied fields. Returns false if the booking is missing.
    fn update_booking(&self, id: &str, patch: &BookingPatch) -> Result<bool>;

    /// Hard delete; deleting a missing booking is not an error
    fn delete_booking(&self, id: &str) -> Result<()>;
}

//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod auth_user;
pub mod booking;
pub mod patch;
pub mod result;
mod session;
pub mod user;

pub use auth_user::{AuthUser, ProfileUpdate};
pub use booking::{Booking, BookingFilter, BookingPatch, BookingStatus, NewBooking};
pub use patch::Patch;
pub use session::SessionState;
pub use user::{NewUser, NewUserRecord, User, UserChanges, UserProfilePatch, UserRecord};

//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod auth_provider;
mod key_value;
mod repository;

pub use auth_provider::{AuthProvider, AuthStateChannel};
pub use key_value::KeyValueStore;
pub use repository::{BookingRepository, UserRepository, UserWrite};

//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod barber_session;
mod booking;
mod client_auth;
mod client_session;
mod demo;
pub mod logging;
pub mod migration;
mod password;
pub mod session_cache;

pub use barber_session::BarberSession;
pub use booking::{BookingService, BookingSummary};
pub use client_auth::{ClientAuthService, MIN_PASSWORD_LENGTH};
pub use client_session::ClientSession;
pub use demo::{DemoService, DEMO_BARBER_EMAIL, DEMO_CLIENT_EMAIL, DEMO_CLIENT_PHONE, DEMO_PASSWORD};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use password::PasswordService;
pub use session_cache::SessionCache;

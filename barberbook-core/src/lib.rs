//! Barberbook Core - Business logic for barber and client bookings
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (User, Booking, AuthUser, etc.)
//! - **ports**: Trait definitions for external dependencies (repositories, key-value store, auth provider)
//! - **services**: Business logic orchestration (client auth, bookings, session managers)
//! - **adapters**: Concrete implementations (DuckDB, JSON file storage, Firebase, demo auth)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::demo::DemoAuthProvider;
use adapters::duckdb::DuckDbRepository;
use adapters::firebase::FirebaseAuthProvider;
use adapters::key_value::FileKeyValueStore;
use config::Config;
use ports::{AuthProvider, KeyValueStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    AuthUser, Booking, BookingFilter, BookingPatch, BookingStatus, NewBooking, NewUser, Patch, User,
    UserProfilePatch,
};
pub use domain::result::Error;

/// Main context for Barberbook operations
///
/// This is the primary entry point for all business logic. It holds the
/// database, the key-value store, configuration, and all services. Both
/// session managers are restored from their caches on open.
pub struct BarberbookContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub storage: Arc<dyn KeyValueStore>,
    pub client_auth_service: Arc<ClientAuthService>,
    pub booking_service: BookingService,
    pub client_session: ClientSession,
    barber_session: Option<BarberSession>,
}

impl BarberbookContext {
    /// Open the context rooted at `app_dir`
    ///
    /// Barbers need an auth provider: the demo provider in demo mode,
    /// Firebase when an API key is configured, otherwise none.
    pub fn open(app_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        std::fs::create_dir_all(app_dir)?;
        let config = Config::load(app_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&app_dir.join(config.database_file()))?);
        repository.ensure_schema()?;

        let storage: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::in_dir(app_dir));
        let passwords = PasswordService::new(config.password_pepper.clone());

        let client_auth_service = Arc::new(ClientAuthService::new(repository.clone(), passwords.clone()));
        let booking_service = BookingService::new(repository.clone());

        let client_session = ClientSession::new(client_auth_service.clone(), storage.clone(), logger.clone());
        client_session.restore();

        let provider: Option<Arc<dyn AuthProvider>> = if config.demo_mode {
            Some(Arc::new(DemoAuthProvider::new(storage.clone(), passwords)?))
        } else if let Some(settings) = config.firebase_settings() {
            Some(Arc::new(FirebaseAuthProvider::new(settings, storage.clone())?))
        } else {
            None
        };

        let barber_session = provider.map(|provider| {
            let session = BarberSession::new(provider, storage.clone(), logger);
            session.restore();
            session
        });

        Ok(Self {
            config,
            repository,
            storage,
            client_auth_service,
            booking_service,
            client_session,
            barber_session,
        })
    }

    /// Barber session, if an auth provider is configured
    pub fn barber_session(&self) -> std::result::Result<&BarberSession, Error> {
        self.barber_session.as_ref().ok_or_else(|| {
            Error::Config(
                "No barber auth provider configured. Set auth.apiKey in settings.json or enable demo mode".to_string(),
            )
        })
    }
}

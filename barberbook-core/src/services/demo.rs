//! Demo service - manage demo mode
//!
//! Demo mode swaps in `demo.duckdb` and the demo auth provider, seeded with
//! one client, one barber and a handful of bookings, so the app can be tried
//! without a Firebase project.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, DurationRound, Utc};

use crate::adapters::demo::{DemoAuthProvider, DEMO_ACCOUNTS_KEY, DEMO_SESSION_KEY};
use crate::adapters::duckdb::DuckDbRepository;
use crate::adapters::key_value::FileKeyValueStore;
use crate::config::Config;
use crate::domain::{BookingPatch, BookingStatus, NewBooking, NewUser};
use crate::ports::{AuthProvider, KeyValueStore};
use crate::services::session_cache::{BARBER_USER_KEY, CLIENT_USER_KEY};
use crate::services::{BookingService, ClientAuthService, PasswordService};

pub const DEMO_CLIENT_PHONE: &str = "+15550000001";
pub const DEMO_CLIENT_EMAIL: &str = "client@demo.barberbook.app";
pub const DEMO_BARBER_EMAIL: &str = "barber@demo.barberbook.app";
pub const DEMO_PASSWORD: &str = "demo123";

/// Demo service for managing demo mode
pub struct DemoService {
    app_dir: PathBuf,
}

impl DemoService {
    pub fn new(app_dir: &Path) -> Self {
        Self {
            app_dir: app_dir.to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        Ok(Config::load(&self.app_dir)?.demo_mode)
    }

    fn remove_demo_database(&self) -> Result<()> {
        for name in ["demo.duckdb", "demo.duckdb.wal"] {
            let path = self.app_dir.join(name);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Cached sessions belong to whichever database was active
    fn clear_sessions(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.remove_item(CLIENT_USER_KEY)?;
        store.remove_item(BARBER_USER_KEY)?;
        Ok(())
    }

    /// Enable demo mode
    ///
    /// This will:
    /// 1. Delete any existing demo database and demo accounts (fresh start)
    /// 2. Enable demo mode in config
    /// 3. Seed the demo database and the demo barber account
    pub fn enable(&self) -> Result<()> {
        std::fs::create_dir_all(&self.app_dir)?;
        self.remove_demo_database()?;

        let store: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::in_dir(&self.app_dir));
        store.remove_item(DEMO_ACCOUNTS_KEY)?;
        store.remove_item(DEMO_SESSION_KEY)?;
        self.clear_sessions(store.as_ref())?;

        let mut config = Config::load(&self.app_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.app_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&self.app_dir.join("demo.duckdb"))?);
        repository.ensure_schema()?;

        let passwords = PasswordService::new(config.password_pepper.clone());
        seed_bookings(repository, passwords.clone())?;

        let barber = DemoAuthProvider::new(store, passwords)?;
        barber.create_user_with_email_and_password(DEMO_BARBER_EMAIL, DEMO_PASSWORD)?;
        barber.sign_out()?;

        Ok(())
    }

    /// Disable demo mode
    ///
    /// The demo database is only deleted when `clean` is set.
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.app_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.app_dir)?;

        let store = FileKeyValueStore::in_dir(&self.app_dir);
        self.clear_sessions(&store)?;
        store.remove_item(DEMO_SESSION_KEY)?;

        if clean {
            self.remove_demo_database()?;
            store.remove_item(DEMO_ACCOUNTS_KEY)?;
        }

        Ok(())
    }
}

/// One client with past and upcoming bookings
fn seed_bookings(repository: Arc<DuckDbRepository>, passwords: PasswordService) -> Result<()> {
    let auth = ClientAuthService::new(repository.clone(), passwords);
    let bookings = BookingService::new(repository);

    let client = auth.create_user(
        NewUser::new("Demo Client", DEMO_CLIENT_PHONE, DEMO_PASSWORD).with_email(DEMO_CLIENT_EMAIL),
    )?;

    let today = Utc::now().duration_trunc(Duration::hours(1))?;
    let seeds = [
        (Duration::days(-21), Some("Skin fade"), BookingStatus::Completed),
        (Duration::days(-7), None, BookingStatus::Cancelled),
        (Duration::days(2), Some("Beard trim"), BookingStatus::Pending),
        (Duration::days(9), None, BookingStatus::Pending),
    ];

    for (offset, notes, status) in seeds {
        let mut input = NewBooking::new(&client.id, today + offset);
        if let Some(notes) = notes {
            input = input.with_notes(notes);
        }
        let booking = bookings.create_booking(input)?;
        if status != BookingStatus::Pending {
            bookings.update_booking(&booking.id, BookingPatch::status(status))?;
        }
    }

    Ok(())
}

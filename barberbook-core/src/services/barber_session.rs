//! Barber session manager
//!
//! Barbers authenticate with the platform auth provider. The session mirrors
//! the provider's auth state into memory and the `@user_data` cache, either
//! on demand ([`BarberSession::sync_auth_state`]) or continuously
//! ([`BarberSession::watch_auth_state`]).

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use crate::domain::result::{Error, Result};
use crate::domain::{AuthUser, ProfileUpdate, SessionState};
use crate::ports::{AuthProvider, KeyValueStore};
use crate::services::session_cache::{SessionCache, BARBER_USER_KEY};
use crate::services::{LogEvent, LoggingService};

pub struct BarberSession {
    provider: Arc<dyn AuthProvider>,
    cache: SessionCache<AuthUser>,
    state: RwLock<SessionState<AuthUser>>,
    auth_state: Mutex<watch::Receiver<Option<AuthUser>>>,
    logger: Option<Arc<LoggingService>>,
}

impl BarberSession {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn KeyValueStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        let auth_state = Mutex::new(provider.subscribe());
        Self {
            provider,
            cache: SessionCache::new(store, BARBER_USER_KEY),
            state: RwLock::new(SessionState::loading()),
            auth_state,
            logger,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState<AuthUser>> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState<AuthUser>> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn log_failure(&self, event: &str, err: &Error) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(LogEvent::new(event).with_session("barber").with_error(err.message()));
        }
    }

    fn logged<T>(&self, event: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        op().inspect_err(|e| self.log_failure(event, e))
    }

    /// Mark the provider's current state as applied
    fn mark_seen(&self) {
        let mut rx = self.auth_state.lock().unwrap_or_else(|e| e.into_inner());
        rx.borrow_and_update();
    }

    fn remember(&self, user: AuthUser) -> Result<AuthUser> {
        self.cache.save(&user)?;
        let mut state = self.write();
        state.user = Some(user.clone());
        state.loading = false;
        Ok(user)
    }

    /// Mirror one auth-state notification into cache and memory
    ///
    /// Cache write failures are logged; the in-memory state still follows
    /// the provider.
    fn apply_auth_state(&self, user: Option<AuthUser>) {
        let cached = match &user {
            Some(u) => self.cache.save(u),
            None => self.cache.clear(),
        };
        if let Err(e) = cached {
            self.log_failure("barber_cache_write_failed", &e);
        }

        let mut state = self.write();
        state.user = user;
        state.loading = false;
    }

    /// Expose the cached barber, then apply the provider's current state
    pub fn restore(&self) {
        match self.cache.load() {
            Ok(cached) => self.write().user = cached,
            Err(e) => self.log_failure("barber_restore_failed", &e),
        }

        let current = {
            let mut rx = self.auth_state.lock().unwrap_or_else(|e| e.into_inner());
            let current = rx.borrow_and_update().clone();
            current
        };
        self.apply_auth_state(current);
    }

    /// Apply a pending auth-state change, if any
    pub fn sync_auth_state(&self) -> bool {
        let pending = {
            let mut rx = self.auth_state.lock().unwrap_or_else(|e| e.into_inner());
            match rx.has_changed() {
                Ok(true) => Some(rx.borrow_and_update().clone()),
                _ => None,
            }
        };

        match pending {
            Some(user) => {
                self.apply_auth_state(user);
                true
            }
            None => false,
        }
    }

    /// Mirror every auth-state change until the provider's channel closes
    ///
    /// Runs forever while the provider is alive; abort the task to stop.
    pub async fn watch_auth_state(&self) {
        let mut rx = self.provider.subscribe();
        while rx.changed().await.is_ok() {
            let user = rx.borrow_and_update().clone();
            self.apply_auth_state(user);
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.logged("barber_sign_in_failed", || {
            let user = self.provider.sign_in_with_email_and_password(email.trim(), password)?;
            self.mark_seen();
            self.remember(user)
        })
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.logged("barber_sign_up_failed", || {
            let user = self.provider.create_user_with_email_and_password(email.trim(), password)?;
            self.mark_seen();
            self.remember(user)
        })
    }

    pub fn sign_out(&self) -> Result<()> {
        self.logged("barber_sign_out_failed", || {
            self.provider.sign_out()?;
            self.mark_seen();
            self.cache.clear()?;
            let mut state = self.write();
            state.user = None;
            state.loading = false;
            Ok(())
        })
    }

    pub fn reset_password(&self, email: &str) -> Result<()> {
        self.logged("barber_password_reset_failed", || {
            self.provider.send_password_reset_email(email.trim())
        })
    }

    /// Update display name and/or photo URL
    ///
    /// Omitted or empty values keep the current ones. Without a signed-in
    /// barber this does nothing.
    pub fn update_profile(&self, display_name: Option<&str>, photo_url: Option<&str>) -> Result<()> {
        self.logged("barber_profile_update_failed", || {
            let Some(current) = self.current_user() else {
                return Ok(());
            };

            let keep_or = |value: Option<&str>, fallback: Option<String>| {
                value.filter(|v| !v.is_empty()).map(str::to_string).or(fallback)
            };
            let update = ProfileUpdate {
                display_name: keep_or(display_name, current.display_name),
                photo_url: keep_or(photo_url, current.photo_url),
            };
            self.provider.update_profile(&update)?;

            if let Some(reloaded) = self.provider.reload()? {
                self.mark_seen();
                self.remember(reloaded)?;
            }
            Ok(())
        })
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }
}

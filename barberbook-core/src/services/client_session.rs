//! Client session manager
//!
//! Keeps the signed-in client in memory and in the `@client_user_data`
//! cache. Every operation goes through [`ClientAuthService`]; failures are
//! logged (without personal data) and returned unchanged.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::result::{Error, Result};
use crate::domain::{NewUser, SessionState, User, UserProfilePatch};
use crate::ports::KeyValueStore;
use crate::services::session_cache::{SessionCache, CLIENT_USER_KEY};
use crate::services::{ClientAuthService, LogEvent, LoggingService};

pub struct ClientSession {
    auth: Arc<ClientAuthService>,
    cache: SessionCache<User>,
    state: RwLock<SessionState<User>>,
    logger: Option<Arc<LoggingService>>,
}

impl ClientSession {
    pub fn new(
        auth: Arc<ClientAuthService>,
        store: Arc<dyn KeyValueStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Self {
        Self {
            auth,
            cache: SessionCache::new(store, CLIENT_USER_KEY),
            state: RwLock::new(SessionState::loading()),
            logger,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState<User>> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState<User>> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn log_failure(&self, event: &str, err: &Error) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(LogEvent::new(event).with_session("client").with_error(err.message()));
        }
    }

    /// Run `op`, logging its error under `event`
    fn logged<T>(&self, event: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        op().inspect_err(|e| self.log_failure(event, e))
    }

    fn set_user(&self, user: Option<User>) {
        let mut state = self.write();
        state.user = user;
        state.loading = false;
    }

    fn remember(&self, user: User) -> Result<User> {
        self.cache.save(&user)?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Load the cached client, then refresh it from the store
    ///
    /// Neither an unreadable cache nor a failed refresh is an error; the
    /// cached user stays signed in if the refresh fails.
    pub fn restore(&self) {
        let cached = match self.cache.load() {
            Ok(user) => user,
            Err(e) => {
                self.log_failure("client_restore_failed", &e);
                None
            }
        };

        let Some(cached) = cached else {
            self.set_user(None);
            return;
        };

        let id = cached.id.clone();
        self.write().user = Some(cached);

        let refreshed = self.auth.get_user_by_id(&id).and_then(|fresh| self.remember(fresh));
        if let Err(e) = refreshed {
            self.log_failure("client_refresh_failed", &e);
        }
        self.write().loading = false;
    }

    pub fn sign_in(&self, phone_or_email: &str, password: &str) -> Result<User> {
        self.logged("client_sign_in_failed", || {
            let user = self.auth.login_user(phone_or_email, password)?;
            self.remember(user)
        })
    }

    pub fn sign_up(&self, input: NewUser) -> Result<User> {
        self.logged("client_sign_up_failed", || {
            let user = self.auth.create_user(input)?;
            self.remember(user)
        })
    }

    pub fn sign_out(&self) -> Result<()> {
        self.logged("client_sign_out_failed", || {
            self.cache.clear()?;
            self.set_user(None);
            Ok(())
        })
    }

    pub fn update_profile(&self, patch: UserProfilePatch) -> Result<User> {
        self.logged("client_profile_update_failed", || {
            let id = self.require_user_id()?;
            let user = self.auth.update_user_profile(&id, patch)?;
            self.remember(user)
        })
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        self.logged("client_password_change_failed", || {
            let id = self.require_user_id()?;
            self.auth.change_user_password(&id, old_password, new_password)
        })
    }

    /// Re-read the signed-in client from the store; no-op when signed out
    pub fn refresh_user(&self) -> Result<Option<User>> {
        self.logged("client_refresh_failed", || {
            let Some(id) = self.read().user.as_ref().map(|u| u.id.clone()) else {
                return Ok(None);
            };
            let user = self.auth.get_user_by_id(&id)?;
            self.remember(user).map(Some)
        })
    }

    fn require_user_id(&self) -> Result<String> {
        self.read()
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or_else(|| Error::auth("No user logged in"))
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }
}

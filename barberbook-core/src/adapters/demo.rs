//! Demo auth provider
//!
//! Stands in for the platform auth provider in demo mode. Accounts and the
//! signed-in session live in the key-value store, so a demo barber stays
//! signed in across `bb` runs exactly like a real one.
//!
//! The validation rules mirror the platform's: emails need an `@`, and new
//! passwords need at least 6 characters.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{AuthUser, ProfileUpdate};
use crate::ports::{AuthProvider, AuthStateChannel, KeyValueStore};
use crate::services::PasswordService;

pub const DEMO_ACCOUNTS_KEY: &str = "@demo_auth_accounts";
pub const DEMO_SESSION_KEY: &str = "@demo_auth_session";

const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemoAccount {
    user: AuthUser,
    password_hash: String,
}

/// Accounts keyed by lowercased email
type Accounts = BTreeMap<String, DemoAccount>;

pub struct DemoAuthProvider {
    store: Arc<dyn KeyValueStore>,
    passwords: PasswordService,
    channel: AuthStateChannel,
}

impl DemoAuthProvider {
    /// Resume the persisted demo session, if any
    pub fn new(store: Arc<dyn KeyValueStore>, passwords: PasswordService) -> Result<Self> {
        let provider = Self {
            store,
            passwords,
            channel: AuthStateChannel::default(),
        };

        if let Some(uid) = provider.store.get_item(DEMO_SESSION_KEY)? {
            let user = provider
                .load_accounts()?
                .into_values()
                .find(|account| account.user.uid == uid)
                .map(|account| account.user);
            provider.channel.publish(user);
        }

        Ok(provider)
    }

    fn load_accounts(&self) -> Result<Accounts> {
        match self.store.get_item(DEMO_ACCOUNTS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Accounts::new()),
        }
    }

    fn save_accounts(&self, accounts: &Accounts) -> Result<()> {
        self.store.set_item(DEMO_ACCOUNTS_KEY, &serde_json::to_string(accounts)?)
    }

    fn start_session(&self, user: AuthUser) -> Result<AuthUser> {
        self.store.set_item(DEMO_SESSION_KEY, &user.uid)?;
        self.channel.publish(Some(user.clone()));
        Ok(user)
    }

    fn normalize_email(email: &str) -> Result<String> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(Error::validation("Email is required"));
        }
        if !email.contains('@') {
            return Err(Error::validation("Invalid email address"));
        }
        Ok(email)
    }
}

impl AuthProvider for DemoAuthProvider {
    fn name(&self) -> &str {
        "demo"
    }

    fn sign_in_with_email_and_password(&self, email: &str, password: &str) -> Result<AuthUser> {
        let email = Self::normalize_email(email)?;
        if password.is_empty() {
            return Err(Error::validation("Password is required"));
        }

        let Some(account) = self.load_accounts()?.remove(&email) else {
            return Err(Error::auth("Invalid credentials"));
        };
        if !self.passwords.verify(password, &account.password_hash)? {
            return Err(Error::auth("Invalid credentials"));
        }

        self.start_session(account.user)
    }

    fn create_user_with_email_and_password(&self, email: &str, password: &str) -> Result<AuthUser> {
        let email = Self::normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation("Password should be at least 6 characters"));
        }

        let mut accounts = self.load_accounts()?;
        if accounts.contains_key(&email) {
            return Err(Error::conflict("Email already exists"));
        }

        let mut user = AuthUser::new(Uuid::new_v4().simple().to_string(), email.clone());
        user.created_at = Some(Utc::now());
        accounts.insert(
            email,
            DemoAccount {
                user: user.clone(),
                password_hash: self.passwords.hash(password)?,
            },
        );
        self.save_accounts(&accounts)?;

        self.start_session(user)
    }

    fn sign_out(&self) -> Result<()> {
        self.store.remove_item(DEMO_SESSION_KEY)?;
        self.channel.publish(None);
        Ok(())
    }

    fn send_password_reset_email(&self, email: &str) -> Result<()> {
        let email = Self::normalize_email(email)?;
        if !self.load_accounts()?.contains_key(&email) {
            return Err(Error::not_found("No account found for that email"));
        }
        // Nothing to send in demo mode
        Ok(())
    }

    fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        let current = self
            .current_user()
            .ok_or_else(|| Error::auth("No user logged in"))?;

        let mut accounts = self.load_accounts()?;
        let account = accounts
            .values_mut()
            .find(|a| a.user.uid == current.uid)
            .ok_or_else(|| Error::auth("Session expired, please sign in again"))?;
        account.user.display_name = update.display_name.clone();
        account.user.photo_url = update.photo_url.clone();
        self.save_accounts(&accounts)
    }

    fn reload(&self) -> Result<Option<AuthUser>> {
        let Some(current) = self.current_user() else {
            return Ok(None);
        };
        let user = self
            .load_accounts()?
            .into_values()
            .find(|a| a.user.uid == current.uid)
            .map(|a| a.user);
        self.channel.publish(user.clone());
        Ok(user)
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.channel.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.channel.subscribe()
    }
}

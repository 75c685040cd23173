//! Platform auth provider port
//!
//! Barber accounts are managed by an external identity service. The
//! session layer only sees this trait plus a change notification channel.

use tokio::sync::watch;

use crate::domain::result::Result;
use crate::domain::{AuthUser, ProfileUpdate};

/// Platform auth provider trait
///
/// Implementations publish every sign-in, sign-up, sign-out and profile
/// reload through [`AuthProvider::subscribe`].
pub trait AuthProvider: Send + Sync {
    /// Provider name (e.g., "firebase", "demo")
    fn name(&self) -> &str;

    fn sign_in_with_email_and_password(&self, email: &str, password: &str) -> Result<AuthUser>;

    fn create_user_with_email_and_password(&self, email: &str, password: &str) -> Result<AuthUser>;

    fn sign_out(&self) -> Result<()>;

    fn send_password_reset_email(&self, email: &str) -> Result<()>;

    /// Update the signed-in user's profile
    fn update_profile(&self, update: &ProfileUpdate) -> Result<()>;

    /// Re-read the signed-in user from the provider
    fn reload(&self) -> Result<Option<AuthUser>>;

    /// The signed-in user as currently known locally
    fn current_user(&self) -> Option<AuthUser>;

    /// Subscribe to auth state changes
    ///
    /// The receiver starts with the current value marked as seen.
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
}

/// Auth state broadcaster shared by provider implementations
#[derive(Debug)]
pub struct AuthStateChannel {
    sender: watch::Sender<Option<AuthUser>>,
}

impl AuthStateChannel {
    pub fn new(initial: Option<AuthUser>) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Publish a new auth state (works with or without subscribers)
    pub fn publish(&self, user: Option<AuthUser>) {
        self.sender.send_replace(user);
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.sender.subscribe()
    }
}

impl Default for AuthStateChannel {
    fn default() -> Self {
        Self::new(None)
    }
}

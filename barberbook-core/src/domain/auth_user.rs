//! Platform auth user (barber accounts)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mirror of the auth provider's user object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            display_name: None,
            photo_url: None,
            email_verified: false,
            created_at: None,
        }
    }
}

/// Profile fields accepted by the auth provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

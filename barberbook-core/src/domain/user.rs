//! User domain model
//!
//! Client accounts live in the `users` collection. Only the public view
//! (`User`) ever leaves the core; the stored record carries the password hash.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::patch::Patch;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Public view of a client account (never carries the password)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A client account as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            phone: record.phone,
            email: record.email,
            created_at: record.created_at,
        }
    }
}

/// Sign-up input
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub password: String,
    pub email: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            password: password.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Normalized user row handed to the repository on insert
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password_hash: String,
}

/// Partial profile update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfilePatch {
    pub name: Patch<String>,
    pub phone: Patch<String>,
    pub email: Patch<String>,
}

impl UserProfilePatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Patch::Set(name.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Patch::Set(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Patch::Set(email.into());
        self
    }

    pub fn clear_email(mut self) -> Self {
        self.email = Patch::Clear;
        self
    }
}

/// Normalized profile changes handed to the repository
///
/// `email` keeps the three-way distinction; name and phone cannot be cleared.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Patch<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.email.is_unset()
    }
}

pub fn normalize_phone(phone: &str) -> String {
    phone.trim().to_string()
}

/// Lowercased and trimmed; empty input means no email
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
        .is_match(email)
}

//! Client auth service - custom client accounts
//!
//! Clients sign up with a name, phone number and password (email optional)
//! and log in with either phone or email. Uniqueness of phone and email is
//! enforced by the repository in the same write that stores the user.

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::user::{is_valid_email, normalize_email, normalize_phone};
use crate::domain::{NewUser, NewUserRecord, Patch, User, UserChanges, UserProfilePatch, UserRecord};
use crate::ports::{UserRepository, UserWrite};
use crate::services::PasswordService;

/// Minimum length for a new password on change
pub const MIN_PASSWORD_LENGTH: usize = 6;

pub struct ClientAuthService {
    users: Arc<dyn UserRepository>,
    passwords: PasswordService,
}

impl ClientAuthService {
    pub fn new(users: Arc<dyn UserRepository>, passwords: PasswordService) -> Self {
        Self { users, passwords }
    }

    /// Register a new client account
    pub fn create_user(&self, input: NewUser) -> Result<User> {
        let phone = normalize_phone(&input.phone);
        if phone.is_empty() {
            return Err(Error::validation("Phone number is required"));
        }
        if input.password.is_empty() {
            return Err(Error::validation("Password is required"));
        }
        let email = input.email.as_deref().and_then(normalize_email);
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(Error::validation("Invalid email address"));
            }
        }

        let record = NewUserRecord {
            name: input.name.trim().to_string(),
            phone,
            email,
            password_hash: self.passwords.hash(&input.password)?,
        };

        match self.users.insert_user(&record)? {
            UserWrite::Applied(user) => Ok(user.into()),
            UserWrite::PhoneTaken => Err(Error::conflict("Phone number already exists")),
            UserWrite::EmailTaken => Err(Error::conflict("Email already exists")),
            UserWrite::Missing => Err(Error::database("Insert reported a missing user")),
        }
    }

    /// Log in with a phone number or an email address
    ///
    /// Unknown account and wrong password fail the same way.
    pub fn login_user(&self, phone_or_email: &str, password: &str) -> Result<User> {
        let identifier = phone_or_email.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(Error::validation("Phone/email and password are required"));
        }

        let record = self.find_for_login(identifier)?;
        let Some(record) = record else {
            return Err(Error::auth("Invalid credentials"));
        };

        if !self.passwords.verify(password, &record.password_hash)? {
            return Err(Error::auth("Invalid credentials"));
        }

        Ok(record.into())
    }

    fn find_for_login(&self, identifier: &str) -> Result<Option<UserRecord>> {
        let email = identifier.to_lowercase();
        if identifier.contains('@') {
            return self.users.find_user_by_email(&email);
        }
        match self.users.find_user_by_phone(identifier)? {
            Some(record) => Ok(Some(record)),
            None => self.users.find_user_by_email(&email),
        }
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<User> {
        self.users
            .get_user(id)?
            .map(User::from)
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Apply a partial profile update and return the stored result
    pub fn update_user_profile(&self, id: &str, patch: UserProfilePatch) -> Result<User> {
        let changes = Self::normalize_patch(patch)?;
        if changes.is_empty() {
            return self.get_user_by_id(id);
        }

        match self.users.update_user(id, &changes)? {
            UserWrite::Applied(()) => self.get_user_by_id(id),
            UserWrite::Missing => Err(Error::not_found("User not found")),
            UserWrite::PhoneTaken => Err(Error::conflict("Phone number already in use")),
            UserWrite::EmailTaken => Err(Error::conflict("Email already in use")),
        }
    }

    fn normalize_patch(patch: UserProfilePatch) -> Result<UserChanges> {
        let name = match patch.name {
            Patch::Unset => None,
            Patch::Set(name) if !name.trim().is_empty() => Some(name.trim().to_string()),
            Patch::Set(_) | Patch::Clear => return Err(Error::validation("Name is required")),
        };

        let phone = match patch.phone {
            Patch::Unset => None,
            Patch::Set(phone) if !normalize_phone(&phone).is_empty() => Some(normalize_phone(&phone)),
            Patch::Set(_) | Patch::Clear => {
                return Err(Error::validation("Phone number is required"))
            }
        };

        let email = match patch.email {
            Patch::Unset => Patch::Unset,
            Patch::Clear => Patch::Clear,
            Patch::Set(email) => match normalize_email(&email) {
                None => Patch::Clear,
                Some(email) if is_valid_email(&email) => Patch::Set(email),
                Some(_) => return Err(Error::validation("Invalid email address")),
            },
        };

        Ok(UserChanges { name, phone, email })
    }

    pub fn change_user_password(&self, id: &str, old_password: &str, new_password: &str) -> Result<()> {
        if old_password.is_empty() || new_password.is_empty() {
            return Err(Error::validation("Both old and new passwords are required"));
        }
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "New password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let record = self
            .users
            .get_user(id)?
            .ok_or_else(|| Error::not_found("User not found"))?;

        if !self.passwords.verify(old_password, &record.password_hash)? {
            return Err(Error::auth("Old password is incorrect"));
        }

        let hash = self.passwords.hash(new_password)?;
        if !self.users.set_password_hash(id, &hash)? {
            return Err(Error::not_found("User not found"));
        }
        Ok(())
    }
}

//! Configuration management
//!
//! Settings live in `<app dir>/settings.json`:
//! ```json
//! {
//!   "app": { "demoMode": false },
//!   "auth": { "apiKey": "...", "identityBaseUrl": "...", "tokenBaseUrl": "..." },
//!   "security": { "passwordPepper": null }
//! }
//! ```
//!
//! Fields this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::firebase::{FirebaseSettings, DEFAULT_IDENTITY_BASE_URL, DEFAULT_TOKEN_BASE_URL};

pub const SETTINGS_FILE: &str = "settings.json";

pub const ENV_DEMO_MODE: &str = "BARBERBOOK_DEMO_MODE";
pub const ENV_FIREBASE_API_KEY: &str = "BARBERBOOK_FIREBASE_API_KEY";
pub const ENV_PASSWORD_PEPPER: &str = "BARBERBOOK_PASSWORD_PEPPER";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    security: SecuritySettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_base_url: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecuritySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_pepper: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Barberbook configuration (resolved view of settings + environment)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub demo_mode: bool,
    pub firebase_api_key: Option<String>,
    pub identity_base_url: Option<String>,
    pub token_base_url: Option<String>,
    pub password_pepper: Option<String>,
}

/// Parse a boolean environment value; unknown values are ignored
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn read_settings(app_dir: &Path) -> Result<SettingsFile> {
    let settings_path = app_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

impl Config {
    /// Load config from the app directory, applying environment overrides
    pub fn load(app_dir: &Path) -> Result<Self> {
        Self::load_with_env(app_dir, |name| std::env::var(name).ok())
    }

    /// Load config with an explicit environment lookup
    pub fn load_with_env(app_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(app_dir)?;

        let demo_mode = env(ENV_DEMO_MODE)
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(raw.app.demo_mode);

        Ok(Self {
            demo_mode,
            firebase_api_key: non_empty(env(ENV_FIREBASE_API_KEY)).or(non_empty(raw.auth.api_key)),
            identity_base_url: non_empty(raw.auth.identity_base_url),
            token_base_url: non_empty(raw.auth.token_base_url),
            password_pepper: non_empty(env(ENV_PASSWORD_PEPPER)).or(non_empty(raw.security.password_pepper)),
        })
    }

    /// Save config to the app directory
    ///
    /// Only the demo mode flag is written; everything else in the file is kept.
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(app_dir)?;
        let mut settings = read_settings(app_dir)?;
        settings.app.demo_mode = self.demo_mode;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(app_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }

    /// Database file for the current mode
    pub fn database_file(&self) -> &'static str {
        if self.demo_mode {
            "demo.duckdb"
        } else {
            "barberbook.duckdb"
        }
    }

    /// Firebase connection settings, if an API key is configured
    pub fn firebase_settings(&self) -> Option<FirebaseSettings> {
        let api_key = self.firebase_api_key.clone()?;
        Some(FirebaseSettings {
            api_key,
            identity_base_url: self
                .identity_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_string()),
            token_base_url: self
                .token_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_BASE_URL.to_string()),
        })
    }
}

//! Firebase Identity Toolkit client
//!
//! Barber accounts live in Firebase Authentication. This adapter talks to the
//! Identity Toolkit and Secure Token REST APIs with a blocking client and
//! keeps the token pair in the key-value store, so a signed-in barber
//! survives process restarts.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::{AuthUser, ProfileUpdate};
use crate::ports::{AuthProvider, AuthStateChannel, KeyValueStore};

pub const FIREBASE_SESSION_KEY: &str = "@firebase_auth_session";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// ID tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

const SESSION_EXPIRED: &str = "Session expired, please sign in again";

/// Connection settings for a Firebase project
#[derive(Debug, Clone)]
pub struct FirebaseSettings {
    pub api_key: String,
    pub identity_base_url: String,
    pub token_base_url: String,
}

impl FirebaseSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            token_base_url: DEFAULT_TOKEN_BASE_URL.to_string(),
        }
    }
}

/// Persisted sign-in state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    /// Milliseconds since epoch, as a string
    #[serde(default)]
    created_at: Option<String>,
}

impl From<LookupUser> for AuthUser {
    fn from(user: LookupUser) -> Self {
        Self {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name.filter(|s| !s.is_empty()),
            photo_url: user.photo_url.filter(|s| !s.is_empty()),
            email_verified: user.email_verified,
            created_at: user
                .created_at
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// A failed call, before it is mapped onto the error taxonomy
#[derive(Debug)]
enum ApiFailure {
    /// The service answered with an error code such as `EMAIL_EXISTS`
    Api { status: u16, code: String, message: String },
    Transport(Error),
}

impl ApiFailure {
    fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::Transport(_) => None,
        }
    }

    fn into_error(self) -> Error {
        match self {
            Self::Transport(e) => e,
            Self::Api { status, code, message } => map_error_code(status, &code, &message),
        }
    }
}

/// Map an Identity Toolkit error code onto the error taxonomy
fn map_error_code(status: u16, code: &str, message: &str) -> Error {
    match code {
        "EMAIL_EXISTS" => Error::conflict("Email already exists"),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            Error::auth("Invalid credentials")
        }
        "WEAK_PASSWORD" => Error::validation("Password should be at least 6 characters"),
        "INVALID_EMAIL" => Error::validation("Invalid email address"),
        "MISSING_EMAIL" => Error::validation("Email is required"),
        "MISSING_PASSWORD" => Error::validation("Password is required"),
        c if c.starts_with("MISSING_") => Error::validation(message.to_string()),
        "TOKEN_EXPIRED"
        | "INVALID_ID_TOKEN"
        | "INVALID_REFRESH_TOKEN"
        | "USER_NOT_FOUND"
        | "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => Error::auth(SESSION_EXPIRED),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => Error::provider("Too many attempts, try again later"),
        _ => Error::provider(format!("{} (HTTP {})", message, status)),
    }
}

/// The error code is the message up to the first space or colon
/// (e.g. `WEAK_PASSWORD : Password should be at least 6 characters`)
fn error_code(message: &str) -> &str {
    message.split([' ', ':']).next().unwrap_or(message)
}

/// Firebase Authentication REST adapter
pub struct FirebaseAuthProvider {
    client: Client,
    settings: FirebaseSettings,
    store: Arc<dyn KeyValueStore>,
    session: Mutex<Option<StoredSession>>,
    channel: AuthStateChannel,
}

impl FirebaseAuthProvider {
    /// Create the client and resume a persisted session
    ///
    /// An unreadable persisted session is discarded.
    pub fn new(settings: FirebaseSettings, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(Error::Config("Firebase API key is not configured".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::provider(format!("Failed to build HTTP client: {}", e)))?;

        let stored = match store.get_item(FIREBASE_SESSION_KEY)? {
            Some(raw) => match serde_json::from_str::<StoredSession>(&raw) {
                Ok(session) => Some(session),
                Err(_) => {
                    store.remove_item(FIREBASE_SESSION_KEY)?;
                    None
                }
            },
            None => None,
        };

        let channel = AuthStateChannel::new(stored.as_ref().map(|s| s.user.clone()));
        Ok(Self {
            client,
            settings,
            store,
            session: Mutex::new(stored),
            channel,
        })
    }

    fn session(&self) -> MutexGuard<'_, Option<StoredSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn endpoint(&self, base: &str, path: &str) -> std::result::Result<Url, ApiFailure> {
        let mut url = Url::parse(&format!("{}/{}", base.trim_end_matches('/'), path))
            .map_err(|e| ApiFailure::Transport(Error::Config(format!("Invalid auth URL: {}", e))))?;
        url.query_pairs_mut().append_pair("key", &self.settings.api_key);
        Ok(url)
    }

    fn identity_call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> std::result::Result<T, ApiFailure> {
        let url = self.endpoint(&self.settings.identity_base_url, &format!("accounts:{}", method))?;
        self.send(self.client.post(url).json(&body))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> std::result::Result<T, ApiFailure> {
        let response = request
            .send()
            .map_err(|e| ApiFailure::Transport(Self::map_request_error(e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| ApiFailure::Transport(Self::map_request_error(e)))?;

        if (200..300).contains(&status) {
            return serde_json::from_str(&text).map_err(|e| {
                ApiFailure::Transport(Error::provider(format!("Failed to parse auth response: {}", e)))
            });
        }

        match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) => Err(ApiFailure::Api {
                status,
                code: error_code(&envelope.error.message).to_string(),
                message: envelope.error.message,
            }),
            Err(_) => Err(ApiFailure::Transport(Error::provider(format!(
                "Auth service error: HTTP {}",
                status
            )))),
        }
    }

    fn map_request_error(error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::provider(format!("Connection timed out after {} seconds", REQUEST_TIMEOUT_SECS))
        } else if error.is_connect() {
            Error::provider("Unable to connect to the auth service")
        } else {
            Error::provider(format!("Auth request failed: {}", error))
        }
    }

    fn lookup(&self, id_token: &str) -> Result<AuthUser> {
        let response: LookupResponse = self
            .identity_call("lookup", json!({ "idToken": id_token }))
            .map_err(ApiFailure::into_error)?;
        response
            .users
            .into_iter()
            .next()
            .map(AuthUser::from)
            .ok_or_else(|| Error::auth(SESSION_EXPIRED))
    }

    fn expires_at(expires_in: Option<&str>) -> DateTime<Utc> {
        let secs = expires_in.and_then(|s| s.parse::<i64>().ok()).unwrap_or(3600);
        Utc::now() + chrono::Duration::seconds(secs)
    }

    /// Sign in or sign up, then load the full user record
    fn start_session(&self, method: &str, email: &str, password: &str) -> Result<AuthUser> {
        if email.trim().is_empty() {
            return Err(Error::validation("Email is required"));
        }
        if password.is_empty() {
            return Err(Error::validation("Password is required"));
        }

        let tokens: SignInResponse = self
            .identity_call(
                method,
                json!({ "email": email.trim(), "password": password, "returnSecureToken": true }),
            )
            .map_err(ApiFailure::into_error)?;

        let mut user = self.lookup(&tokens.id_token)?;
        if user.uid.is_empty() {
            user.uid = tokens.local_id.clone();
        }

        let session = StoredSession {
            id_token: tokens.id_token,
            refresh_token: tokens.refresh_token,
            expires_at: Self::expires_at(tokens.expires_in.as_deref()),
            user: user.clone(),
        };
        self.persist(session)?;
        self.channel.publish(Some(user.clone()));
        Ok(user)
    }

    fn persist(&self, session: StoredSession) -> Result<()> {
        self.store
            .set_item(FIREBASE_SESSION_KEY, &serde_json::to_string(&session)?)?;
        *self.session() = Some(session);
        Ok(())
    }

    fn end_session(&self) -> Result<()> {
        *self.session() = None;
        self.store.remove_item(FIREBASE_SESSION_KEY)?;
        self.channel.publish(None);
        Ok(())
    }

    /// A valid ID token, refreshing it first when it is about to expire
    ///
    /// A rejected refresh token ends the session.
    fn id_token(&self) -> Result<String> {
        let current = self
            .session()
            .clone()
            .ok_or_else(|| Error::auth("No user logged in"))?;

        if current.expires_at - chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > Utc::now() {
            return Ok(current.id_token);
        }

        let url = self
            .endpoint(&self.settings.token_base_url, "token")
            .map_err(ApiFailure::into_error)?;
        let refreshed: std::result::Result<RefreshResponse, ApiFailure> = self.send(
            self.client
                .post(url)
                .form(&[("grant_type", "refresh_token"), ("refresh_token", current.refresh_token.as_str())]),
        );

        match refreshed {
            Ok(tokens) => {
                let id_token = tokens.id_token.clone();
                self.persist(StoredSession {
                    id_token: tokens.id_token,
                    refresh_token: tokens.refresh_token,
                    expires_at: Self::expires_at(Some(&tokens.expires_in)),
                    user: current.user,
                })?;
                Ok(id_token)
            }
            Err(ApiFailure::Api { .. }) => {
                self.end_session()?;
                Err(Error::auth(SESSION_EXPIRED))
            }
            Err(failure) => Err(failure.into_error()),
        }
    }
}

impl AuthProvider for FirebaseAuthProvider {
    fn name(&self) -> &str {
        "firebase"
    }

    fn sign_in_with_email_and_password(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.start_session("signInWithPassword", email, password)
    }

    fn create_user_with_email_and_password(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.start_session("signUp", email, password)
    }

    /// Local only; tokens are simply forgotten
    fn sign_out(&self) -> Result<()> {
        self.end_session()
    }

    fn send_password_reset_email(&self, email: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(Error::validation("Email is required"));
        }
        let _: IgnoredAny = self
            .identity_call(
                "sendOobCode",
                json!({ "requestType": "PASSWORD_RESET", "email": email.trim() }),
            )
            .map_err(|failure| match failure.code() {
                Some("EMAIL_NOT_FOUND") => Error::not_found("No account found for that email"),
                _ => failure.into_error(),
            })?;
        Ok(())
    }

    fn update_profile(&self, update: &ProfileUpdate) -> Result<()> {
        let id_token = self.id_token()?;

        let mut body = json!({ "idToken": id_token, "returnSecureToken": true });
        if let Some(name) = &update.display_name {
            body["displayName"] = json!(name);
        }
        if let Some(photo) = &update.photo_url {
            body["photoUrl"] = json!(photo);
        }

        let response: UpdateResponse = self
            .identity_call("update", body)
            .map_err(ApiFailure::into_error)?;

        // The service may rotate tokens on profile changes
        if let (Some(id_token), Some(refresh_token)) = (response.id_token, response.refresh_token) {
            let current = self.session().clone();
            if let Some(current) = current {
                self.persist(StoredSession {
                    id_token,
                    refresh_token,
                    expires_at: Self::expires_at(response.expires_in.as_deref()),
                    user: current.user,
                })?;
            }
        }
        Ok(())
    }

    fn reload(&self) -> Result<Option<AuthUser>> {
        if self.session().is_none() {
            return Ok(None);
        }
        let id_token = self.id_token()?;
        let user = self.lookup(&id_token)?;

        let current = self.session().clone();
        if let Some(mut current) = current {
            current.user = user.clone();
            self.persist(current)?;
        }
        self.channel.publish(Some(user.clone()));
        Ok(Some(user))
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.channel.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.channel.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::firebase_mock::{MockConfig, MockFirebaseServer, MOCK_API_KEY};
    use crate::adapters::key_value::MemoryKeyValueStore;

    fn settings(server: &MockFirebaseServer) -> FirebaseSettings {
        FirebaseSettings {
            api_key: MOCK_API_KEY.to_string(),
            identity_base_url: server.identity_url(),
            token_base_url: server.token_url(),
        }
    }

    fn provider(server: &MockFirebaseServer, store: &Arc<dyn KeyValueStore>) -> FirebaseAuthProvider {
        FirebaseAuthProvider::new(settings(server), store.clone()).unwrap()
    }

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryKeyValueStore::new())
    }

    #[test]
    fn test_error_code_extraction() {
        assert_eq!(error_code("EMAIL_EXISTS"), "EMAIL_EXISTS");
        assert_eq!(
            error_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            "WEAK_PASSWORD"
        );
        assert_eq!(error_code("TOO_MANY_ATTEMPTS_TRY_LATER: later"), "TOO_MANY_ATTEMPTS_TRY_LATER");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(map_error_code(400, "EMAIL_EXISTS", ""), Error::Conflict(_)));
        assert!(matches!(map_error_code(400, "INVALID_LOGIN_CREDENTIALS", ""), Error::Auth(_)));
        assert!(matches!(map_error_code(400, "MISSING_REQ_TYPE", "MISSING_REQ_TYPE"), Error::Validation(_)));
        assert_eq!(map_error_code(400, "TOKEN_EXPIRED", "").message(), SESSION_EXPIRED);
        assert!(matches!(map_error_code(500, "INTERNAL", "INTERNAL"), Error::Provider(_)));
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = FirebaseAuthProvider::new(FirebaseSettings::new(""), store());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_sign_up_sign_in_and_persisted_session() {
        let server = MockFirebaseServer::start(MockConfig::default()).unwrap();
        let store = store();
        let firebase = provider(&server, &store);

        let created = firebase
            .create_user_with_email_and_password("sam@example.com", "secret1")
            .unwrap();
        assert_eq!(created.email.as_deref(), Some("sam@example.com"));
        assert!(created.created_at.is_some());

        let err = firebase
            .create_user_with_email_and_password("sam@example.com", "secret1")
            .unwrap_err();
        assert_eq!(err.message(), "Email already exists");

        firebase.sign_out().unwrap();
        assert!(store.get_item(FIREBASE_SESSION_KEY).unwrap().is_none());

        let err = firebase.sign_in_with_email_and_password("sam@example.com", "wrong1").unwrap_err();
        assert_eq!(err.message(), "Invalid credentials");

        let user = firebase.sign_in_with_email_and_password("sam@example.com", "secret1").unwrap();
        assert_eq!(user.uid, created.uid);

        // A new process picks up the stored tokens
        let restarted = provider(&server, &store);
        assert_eq!(restarted.current_user().unwrap().uid, created.uid);
    }

    #[test]
    fn test_weak_password() {
        let server = MockFirebaseServer::start(MockConfig::default()).unwrap();
        let err = provider(&server, &store())
            .create_user_with_email_and_password("sam@example.com", "123")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_update_profile_then_reload() {
        let server = MockFirebaseServer::start(MockConfig::default()).unwrap();
        let firebase = provider(&server, &store());
        firebase.create_user_with_email_and_password("sam@example.com", "secret1").unwrap();

        firebase
            .update_profile(&ProfileUpdate {
                display_name: Some("Sam".to_string()),
                photo_url: Some("https://img.example.com/sam.png".to_string()),
            })
            .unwrap();

        let user = firebase.reload().unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Sam"));
        assert_eq!(firebase.current_user().unwrap().photo_url.as_deref(), Some("https://img.example.com/sam.png"));
    }

    #[test]
    fn test_expired_token_is_refreshed() {
        let server = MockFirebaseServer::start(MockConfig { token_ttl_secs: 1 }).unwrap();
        let firebase = provider(&server, &store());
        firebase.create_user_with_email_and_password("sam@example.com", "secret1").unwrap();

        assert!(firebase.reload().unwrap().is_some());
        assert!(server.refresh_count() >= 1);
    }

    #[test]
    fn test_revoked_refresh_token_ends_session() {
        let server = MockFirebaseServer::start(MockConfig { token_ttl_secs: 1 }).unwrap();
        let store = store();
        let firebase = provider(&server, &store);
        firebase.create_user_with_email_and_password("sam@example.com", "secret1").unwrap();
        let mut rx = firebase.subscribe();

        server.revoke_refresh_tokens();
        let err = firebase.reload().unwrap_err();
        assert_eq!(err.message(), SESSION_EXPIRED);
        assert!(firebase.current_user().is_none());
        assert!(store.get_item(FIREBASE_SESSION_KEY).unwrap().is_none());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_password_reset() {
        let server = MockFirebaseServer::start(MockConfig::default()).unwrap();
        let firebase = provider(&server, &store());

        let err = firebase.send_password_reset_email("ghost@example.com").unwrap_err();
        assert_eq!(err.message(), "No account found for that email");

        firebase.create_user_with_email_and_password("sam@example.com", "secret1").unwrap();
        firebase.send_password_reset_email("sam@example.com").unwrap();
    }

    #[test]
    fn test_wrong_api_key() {
        let server = MockFirebaseServer::start(MockConfig::default()).unwrap();
        let mut bad = settings(&server);
        bad.api_key = "nope".to_string();
        let firebase = FirebaseAuthProvider::new(bad, store()).unwrap();
        let err = firebase.sign_in_with_email_and_password("a@b.co", "secret1").unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn test_unreachable_service() {
        let settings = FirebaseSettings {
            api_key: MOCK_API_KEY.to_string(),
            identity_base_url: "http://127.0.0.1:9/v1".to_string(),
            token_base_url: "http://127.0.0.1:9/v1".to_string(),
        };
        let firebase = FirebaseAuthProvider::new(settings, store()).unwrap();
        let err = firebase.sign_in_with_email_and_password("a@b.co", "secret1").unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}

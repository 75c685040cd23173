//! Mock Firebase Authentication server for testing
//!
//! Implements just enough of the Identity Toolkit and Secure Token APIs for
//! the adapter tests:
//! - POST /v1/accounts:signUp, :signInWithPassword, :lookup, :update, :sendOobCode
//! - POST /v1/token (form encoded refresh)
//!
//! Errors use the real envelope: `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

pub const MOCK_API_KEY: &str = "mock-api-key";

/// Configuration for the mock server
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// `expiresIn` reported for every issued ID token
    pub token_ttl_secs: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self { token_ttl_secs: 3600 }
    }
}

#[derive(Debug, Clone)]
struct MockAccount {
    uid: String,
    email: String,
    password: String,
    display_name: Option<String>,
    photo_url: Option<String>,
    created_at_ms: i64,
}

#[derive(Default)]
struct MockState {
    /// Keyed by email
    accounts: HashMap<String, MockAccount>,
    /// ID token -> uid
    id_tokens: HashMap<String, String>,
    /// Refresh token -> uid
    refresh_tokens: HashMap<String, String>,
}

impl MockState {
    fn account_by_uid(&mut self, uid: &str) -> Option<&mut MockAccount> {
        self.accounts.values_mut().find(|a| a.uid == uid)
    }

    fn issue_tokens(&mut self, uid: &str) -> (String, String) {
        let id_token = format!("id-{}", Uuid::new_v4().simple());
        let refresh_token = format!("rt-{}", Uuid::new_v4().simple());
        self.id_tokens.insert(id_token.clone(), uid.to_string());
        self.refresh_tokens.insert(refresh_token.clone(), uid.to_string());
        (id_token, refresh_token)
    }
}

/// Mock Firebase server for testing
pub struct MockFirebaseServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    refreshes: Arc<AtomicUsize>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockFirebaseServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState::default()));
        let refreshes = Arc::new(AtomicUsize::new(0));

        // Non-blocking accept so stop() can end the loop
        listener.set_nonblocking(true)?;

        let thread_handle = {
            let running = running.clone();
            let state = state.clone();
            let refreshes = refreshes.clone();
            thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            let cfg = config.clone();
                            let state = state.clone();
                            let refreshes = refreshes.clone();
                            thread::spawn(move || handle_connection(stream, &cfg, &state, &refreshes));
                        }
                        Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }
                        Err(_) => break,
                    }
                }
            })
        };

        Ok(Self {
            port,
            running,
            state,
            refreshes,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn identity_url(&self) -> String {
        format!("http://127.0.0.1:{}/v1", self.port)
    }

    pub fn token_url(&self) -> String {
        format!("http://127.0.0.1:{}/v1", self.port)
    }

    /// Number of successful token refreshes served
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Invalidate every refresh token (as if the account was disabled)
    pub fn revoke_refresh_tokens(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.refresh_tokens.clear();
        }
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockFirebaseServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    path: String,
    query: String,
    body: String,
}

fn read_request(stream: &TcpStream) -> Option<Request> {
    // The listener is non-blocking; accepted sockets must not be
    stream.set_nonblocking(false).ok()?;
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let target = request_line.split_whitespace().nth(1)?.to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p.to_string(), q.to_string()),
        None => (target, String::new()),
    };
    Some(Request {
        path,
        query,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>, refreshes: &AtomicUsize) {
    let Some(request) = read_request(&stream) else {
        send_response(&mut stream, 400, &error_body(400, "INVALID_REQUEST"));
        return;
    };

    if !request.query.split('&').any(|pair| pair == format!("key={}", MOCK_API_KEY)) {
        send_response(
            &mut stream,
            400,
            &error_body(400, "API key not valid. Please pass a valid API key."),
        );
        return;
    }

    let Ok(mut state) = state.lock() else {
        send_response(&mut stream, 500, &error_body(500, "INTERNAL"));
        return;
    };

    let ttl = config.token_ttl_secs.to_string();
    let result = if request.path == "/v1/token" {
        refresh(&mut state, &request.body, &ttl).inspect(|_| {
            refreshes.fetch_add(1, Ordering::SeqCst);
        })
    } else {
        let body: Value = serde_json::from_str(&request.body).unwrap_or(Value::Null);
        match request.path.strip_prefix("/v1/accounts:") {
            Some("signUp") => sign_up(&mut state, &body, &ttl),
            Some("signInWithPassword") => sign_in(&mut state, &body, &ttl),
            Some("lookup") => lookup(&mut state, &body),
            Some("update") => update(&mut state, &body),
            Some("sendOobCode") => send_oob_code(&state, &body),
            _ => Err((404, "NOT_FOUND".to_string())),
        }
    };

    match result {
        Ok(value) => send_response(&mut stream, 200, &value.to_string()),
        Err((status, message)) => send_response(&mut stream, status, &error_body(status, &message)),
    }
}

type Handled = Result<Value, (u16, String)>;

fn bad_request(message: &str) -> (u16, String) {
    (400, message.to_string())
}

fn str_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn sign_up(state: &mut MockState, body: &Value, ttl: &str) -> Handled {
    let email = str_field(body, "email").ok_or_else(|| bad_request("MISSING_EMAIL"))?;
    let password = str_field(body, "password").ok_or_else(|| bad_request("MISSING_PASSWORD"))?;
    if !email.contains('@') {
        return Err(bad_request("INVALID_EMAIL"));
    }
    if password.len() < 6 {
        return Err(bad_request("WEAK_PASSWORD : Password should be at least 6 characters"));
    }
    let email = email.to_lowercase();
    if state.accounts.contains_key(&email) {
        return Err(bad_request("EMAIL_EXISTS"));
    }

    let account = MockAccount {
        uid: Uuid::new_v4().simple().to_string(),
        email: email.clone(),
        password: password.to_string(),
        display_name: None,
        photo_url: None,
        created_at_ms: Utc::now().timestamp_millis(),
    };
    let uid = account.uid.clone();
    state.accounts.insert(email.clone(), account);
    let (id_token, refresh_token) = state.issue_tokens(&uid);

    Ok(json!({
        "kind": "identitytoolkit#SignupNewUserResponse",
        "idToken": id_token,
        "email": email,
        "refreshToken": refresh_token,
        "expiresIn": ttl,
        "localId": uid,
    }))
}

fn sign_in(state: &mut MockState, body: &Value, ttl: &str) -> Handled {
    let email = str_field(body, "email").ok_or_else(|| bad_request("MISSING_EMAIL"))?;
    let password = str_field(body, "password").ok_or_else(|| bad_request("MISSING_PASSWORD"))?;

    let account = state
        .accounts
        .get(&email.to_lowercase())
        .filter(|a| a.password == password)
        .cloned()
        .ok_or_else(|| bad_request("INVALID_LOGIN_CREDENTIALS"))?;
    let (id_token, refresh_token) = state.issue_tokens(&account.uid);

    Ok(json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": account.uid,
        "email": account.email,
        "displayName": account.display_name.unwrap_or_default(),
        "idToken": id_token,
        "registered": true,
        "refreshToken": refresh_token,
        "expiresIn": ttl,
    }))
}

fn uid_for_token(state: &MockState, body: &Value) -> Result<String, (u16, String)> {
    let token = str_field(body, "idToken").ok_or_else(|| bad_request("MISSING_ID_TOKEN"))?;
    state
        .id_tokens
        .get(token)
        .cloned()
        .ok_or_else(|| bad_request("INVALID_ID_TOKEN"))
}

fn lookup(state: &mut MockState, body: &Value) -> Handled {
    let uid = uid_for_token(state, body)?;
    let account = state
        .account_by_uid(&uid)
        .cloned()
        .ok_or_else(|| bad_request("USER_NOT_FOUND"))?;

    let mut user = json!({
        "localId": account.uid,
        "email": account.email,
        "emailVerified": false,
        "createdAt": account.created_at_ms.to_string(),
    });
    if let Some(name) = account.display_name {
        user["displayName"] = json!(name);
    }
    if let Some(photo) = account.photo_url {
        user["photoUrl"] = json!(photo);
    }

    Ok(json!({ "kind": "identitytoolkit#GetAccountInfoResponse", "users": [user] }))
}

fn update(state: &mut MockState, body: &Value) -> Handled {
    let uid = uid_for_token(state, body)?;
    let account = state
        .account_by_uid(&uid)
        .ok_or_else(|| bad_request("USER_NOT_FOUND"))?;
    if let Some(name) = str_field(body, "displayName") {
        account.display_name = Some(name.to_string());
    }
    if let Some(photo) = str_field(body, "photoUrl") {
        account.photo_url = Some(photo.to_string());
    }
    let email = account.email.clone();

    Ok(json!({ "kind": "identitytoolkit#SetAccountInfoResponse", "localId": uid, "email": email }))
}

fn send_oob_code(state: &MockState, body: &Value) -> Handled {
    if str_field(body, "requestType") != Some("PASSWORD_RESET") {
        return Err(bad_request("MISSING_REQ_TYPE"));
    }
    let email = str_field(body, "email").ok_or_else(|| bad_request("MISSING_EMAIL"))?;
    if !state.accounts.contains_key(&email.to_lowercase()) {
        return Err(bad_request("EMAIL_NOT_FOUND"));
    }
    Ok(json!({ "kind": "identitytoolkit#GetOobConfirmationCodeResponse", "email": email }))
}

fn refresh(state: &mut MockState, form: &str, ttl: &str) -> Handled {
    let fields: HashMap<&str, &str> = form
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    if fields.get("grant_type") != Some(&"refresh_token") {
        return Err(bad_request("INVALID_GRANT_TYPE"));
    }
    let token = fields
        .get("refresh_token")
        .ok_or_else(|| bad_request("MISSING_REFRESH_TOKEN"))?;
    let uid = state
        .refresh_tokens
        .remove(*token)
        .ok_or_else(|| bad_request("INVALID_REFRESH_TOKEN"))?;
    let (id_token, refresh_token) = state.issue_tokens(&uid);

    Ok(json!({
        "expires_in": ttl,
        "token_type": "Bearer",
        "refresh_token": refresh_token,
        "id_token": id_token,
        "user_id": uid,
        "project_id": "mock-project",
    }))
}

fn error_body(code: u16, message: &str) -> String {
    json!({ "error": { "code": code, "message": message, "errors": [] } }).to_string()
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

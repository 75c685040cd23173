//! DuckDB repository implementation
//!
//! Implements the `users` and `bookings` collections. Uniqueness of phone
//! and email is checked and written inside one transaction while holding
//! the connection lock, with `UNIQUE` indexes as the backstop for writers in
//! other processes.
//!
//! Repositories opened on the same file within one process share a single
//! connection, so every writer in the process sees the same database.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::types::Type;
use duckdb::{params, params_from_iter, Connection, OptionalExt, Row};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Booking, BookingPatch, BookingStatus, NewBooking, NewUserRecord, Patch, UserChanges, UserRecord,
};
use crate::ports::{BookingRepository, UserRepository, UserWrite};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Timestamps are stored as naive UTC `TIMESTAMP` values
const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const USER_COLUMNS: &str = "user_id, name, phone, email, password_hash, created_at::VARCHAR";
const BOOKING_COLUMNS: &str =
    "booking_id, user_id, booking_date::VARCHAR, status, notes, created_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Map a duplicate-key violation on `users` to the field that collided
///
/// DuckDB reports `Duplicate key "<column>: <value>" violates ...`; only the
/// column name is inspected since the value is user input.
fn unique_violation<T>(err: &duckdb::Error) -> Option<UserWrite<T>> {
    const PREFIX: &str = "Duplicate key \"";

    let msg = err.to_string();
    let start = msg.find(PREFIX)? + PREFIX.len();
    let (column, _) = msg[start..].split_once(':')?;
    match column.trim() {
        "phone" => Some(UserWrite::PhoneTaken),
        "email" => Some(UserWrite::EmailTaken),
        _ => None,
    }
}

type SharedConnection = Arc<Mutex<Connection>>;

/// Live connections by database file
fn open_connections() -> &'static Mutex<HashMap<PathBuf, Weak<Mutex<Connection>>>> {
    static CONNECTIONS: OnceLock<Mutex<HashMap<PathBuf, Weak<Mutex<Connection>>>>> = OnceLock::new();
    CONNECTIONS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registry key for a database file, resolved against its parent directory
fn connection_key(db_path: &Path) -> PathBuf {
    match (db_path.parent(), db_path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|dir| dir.join(name))
            .unwrap_or_else(|_| db_path.to_path_buf()),
        _ => db_path.to_path_buf(),
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: SharedConnection,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Reuses the connection of a repository that is still open on the same
    /// file. Otherwise opens a new one, with retry logic and exponential
    /// backoff for file locking errors, which can occur when the CLI and
    /// another process open the database at the same time.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut connections = open_connections()
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))?;
        let key = connection_key(db_path);

        if let Some(conn) = connections.get(&key).and_then(Weak::upgrade) {
            return Ok(Self { conn });
        }

        let conn = Arc::new(Mutex::new(Self::open_with_retry(db_path)?));
        connections.retain(|_, weak| weak.strong_count() > 0);
        connections.insert(key, Arc::downgrade(&conn));
        Ok(Self { conn })
    }

    fn open_with_retry(db_path: &Path) -> Result<Connection> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => return Ok(conn),
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[barberbook] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory database, mostly for tests and demos
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // IMPORTANT: Disable extension autoloading to avoid macOS code signing issues
        // (cached extensions in ~/.duckdb/extensions may have different Team IDs)
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

// === Row mapping ===

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_WRITE_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_READ_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn row_to_user(row: &Row) -> duckdb::Result<UserRecord> {
    let created: Option<String> = row.get(5)?;
    Ok(UserRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: created.as_deref().and_then(parse_timestamp),
    })
}

fn row_to_booking(row: &Row) -> duckdb::Result<Booking> {
    let booking_date: String = row.get(2)?;
    let booking_date = parse_timestamp(&booking_date).ok_or_else(|| {
        duckdb::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("invalid booking date '{}'", booking_date).into(),
        )
    })?;
    let status: String = row.get(3)?;
    let status = status
        .parse::<BookingStatus>()
        .map_err(|e| duckdb::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let created: Option<String> = row.get(5)?;
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        booking_date,
        status,
        notes: row.get(4)?,
        created_at: created.as_deref().and_then(parse_timestamp),
    })
}

fn query_user(conn: &Connection, where_clause: &str, value: &str) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", USER_COLUMNS, where_clause);
    let user = conn.query_row(&sql, [value], row_to_user).optional()?;
    Ok(user)
}

fn query_bookings(conn: &Connection, where_clause: Option<&str>, value: Option<&str>) -> Result<Vec<Booking>> {
    let sql = match where_clause {
        Some(clause) => format!("SELECT {} FROM bookings WHERE {}", BOOKING_COLUMNS, clause),
        None => format!("SELECT {} FROM bookings", BOOKING_COLUMNS),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = match value {
        Some(v) => stmt.query_map([v], row_to_booking)?.collect::<duckdb::Result<Vec<_>>>()?,
        None => stmt.query_map([], row_to_booking)?.collect::<duckdb::Result<Vec<_>>>()?,
    };
    Ok(rows)
}

// === Users ===

impl UserRepository for DuckDbRepository {
    fn insert_user(&self, user: &NewUserRecord) -> Result<UserWrite<UserRecord>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if query_user(&tx, "phone = ?", &user.phone)?.is_some() {
            return Ok(UserWrite::PhoneTaken);
        }
        if let Some(email) = &user.email {
            if query_user(&tx, "email = ?", email)?.is_some() {
                return Ok(UserWrite::EmailTaken);
            }
        }

        let id = Self::new_id();
        let created_at = Utc::now();
        let inserted = tx.execute(
            "INSERT INTO users (user_id, name, phone, email, password_hash, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                user.name,
                user.phone,
                user.email,
                user.password_hash,
                format_timestamp(&created_at),
            ],
        );
        if let Err(e) = inserted {
            return match unique_violation(&e) {
                Some(outcome) => Ok(outcome),
                None => Err(e.into()),
            };
        }
        let record = query_user(&tx, "user_id = ?", &id)?
            .ok_or_else(|| Error::database("Inserted user could not be read back"))?;
        tx.commit()?;

        Ok(UserWrite::Applied(record))
    }

    fn get_user(&self, id: &str) -> Result<Option<UserRecord>> {
        let conn = self.lock()?;
        query_user(&conn, "user_id = ?", id)
    }

    fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserRecord>> {
        let conn = self.lock()?;
        query_user(&conn, "phone = ?", phone)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let conn = self.lock()?;
        query_user(&conn, "email = ?", email)
    }

    fn update_user(&self, id: &str, changes: &UserChanges) -> Result<UserWrite<()>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(existing) = query_user(&tx, "user_id = ?", id)? else {
            return Ok(UserWrite::Missing);
        };

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Option<String>> = Vec::new();

        if let Some(name) = &changes.name {
            if *name != existing.name {
                assignments.push("name = ?");
                values.push(Some(name.clone()));
            }
        }

        // Only touch indexed columns when the value actually changes
        if let Some(phone) = &changes.phone {
            if *phone != existing.phone {
                if let Some(other) = query_user(&tx, "phone = ?", phone)? {
                    if other.id != id {
                        return Ok(UserWrite::PhoneTaken);
                    }
                }
                assignments.push("phone = ?");
                values.push(Some(phone.clone()));
            }
        }

        match &changes.email {
            Patch::Unset => {}
            Patch::Set(email) => {
                if existing.email.as_deref() != Some(email.as_str()) {
                    if let Some(other) = query_user(&tx, "email = ?", email)? {
                        if other.id != id {
                            return Ok(UserWrite::EmailTaken);
                        }
                    }
                    assignments.push("email = ?");
                    values.push(Some(email.clone()));
                }
            }
            Patch::Clear => {
                if existing.email.is_some() {
                    assignments.push("email = ?");
                    values.push(None);
                }
            }
        }

        if assignments.is_empty() {
            return Ok(UserWrite::Applied(()));
        }

        let sql = format!("UPDATE users SET {} WHERE user_id = ?", assignments.join(", "));
        values.push(Some(id.to_string()));
        if let Err(e) = tx.execute(&sql, params_from_iter(values.iter())) {
            return match unique_violation(&e) {
                Some(outcome) => Ok(outcome),
                None => Err(e.into()),
            };
        }
        tx.commit()?;

        Ok(UserWrite::Applied(()))
    }

    fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE users SET password_hash = ? WHERE user_id = ?",
            params![password_hash, id],
        )?;
        Ok(updated > 0)
    }
}

// === Bookings ===

impl BookingRepository for DuckDbRepository {
    fn insert_booking(&self, booking: &NewBooking, status: BookingStatus) -> Result<String> {
        let conn = self.lock()?;
        let id = Self::new_id();
        conn.execute(
            "INSERT INTO bookings (booking_id, user_id, booking_date, status, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                booking.user_id,
                format_timestamp(&booking.booking_date),
                status.as_str(),
                booking.notes,
                format_timestamp(&Utc::now()),
            ],
        )?;
        Ok(id)
    }

    fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM bookings WHERE booking_id = ?", BOOKING_COLUMNS);
        let booking = conn.query_row(&sql, [id], row_to_booking).optional()?;
        Ok(booking)
    }

    fn get_bookings_by_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        let conn = self.lock()?;
        query_bookings(&conn, Some("user_id = ?"), Some(user_id))
    }

    fn get_all_bookings(&self) -> Result<Vec<Booking>> {
        let conn = self.lock()?;
        query_bookings(&conn, None, None)
    }

    fn update_booking(&self, id: &str, patch: &BookingPatch) -> Result<bool> {
        let conn = self.lock()?;

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Option<String>> = Vec::new();
        if let Some(status) = patch.status {
            assignments.push("status = ?");
            values.push(Some(status.as_str().to_string()));
        }
        if let Some(notes) = patch.notes.clone().into_change() {
            assignments.push("notes = ?");
            values.push(notes);
        }

        if assignments.is_empty() {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM bookings WHERE booking_id = ?",
                [id],
                |row| row.get(0),
            )?;
            return Ok(count > 0);
        }

        let sql = format!("UPDATE bookings SET {} WHERE booking_id = ?", assignments.join(", "));
        values.push(Some(id.to_string()));
        let updated = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(updated > 0)
    }

    fn delete_booking(&self, id: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM bookings WHERE booking_id = ?", [id])?;
        Ok(())
    }
}

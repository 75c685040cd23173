//! Migrations for logs.duckdb
//!
//! Kept apart from the store migrations so the log database can be deleted
//! or shipped for troubleshooting without touching user data.

/// Log database migrations in apply order: (filename, sql_content)
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_sys_logs.sql", include_str!("001_sys_logs.sql")),
];

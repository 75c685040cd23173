//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the user and booking repositories
//! - JSON file (and in-memory) key-value storage for session caches
//! - Firebase Identity Toolkit REST client for barber auth
//! - Demo auth provider for demo mode

pub mod demo;
pub mod duckdb;
pub mod firebase;
pub mod key_value;

#[cfg(test)]
pub mod firebase_mock;

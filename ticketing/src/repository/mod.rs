use rusqlite::Connection;
use std::sync::{Arc, Mutex};

// Application repository modules, one per kind of locally stored state.
pub(crate) mod cache_repository;
pub(crate) mod problem_repository;
pub(crate) mod settings_repository;
pub(crate) mod timer_repository;

// Database-related utilities and managers.
pub mod database_manager;
pub(crate) mod sqlite;

/// A thread-safe, shared connection to an ``SQLite`` database,
/// used across multiple repository layers.
pub(crate) type SharedSqliteConnection = Arc<Mutex<Connection>>;

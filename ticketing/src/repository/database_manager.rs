use crate::error::TicketingError;
use crate::repository::sqlite;
use crate::repository::sqlite::sqlite_cache_repo::SqliteCacheRepository;
use crate::repository::sqlite::sqlite_problem_repo::SqliteProblemRepository;
use crate::repository::sqlite::sqlite_session_repo::SqliteSessionRepository;
use crate::repository::sqlite::sqlite_settings_repo::SqliteSettingsRepository;
use crate::repository::sqlite::sqlite_timer_repo::SqliteTimerRepository;
use crate::repository::SharedSqliteConnection;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Represents parameters for initializing the database connection
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    /// SQLite database with a specific file path
    SqliteOnDisk { path: PathBuf },

    /// SQLite database that runs entirely in memory
    SqliteInMemory,
}

pub struct DatabaseManager {
    connection: SharedSqliteConnection,
}

impl DatabaseManager {
    /// Creates a new `DatabaseManager` based on the provided configuration.
    ///
    /// # Errors
    /// If the database could not be opened or the schema could not be created
    pub fn new(config: &DatabaseConfig) -> Result<Self, TicketingError> {
        let connection = match config {
            DatabaseConfig::SqliteOnDisk { path } => sqlite::create_connection(path)?,
            DatabaseConfig::SqliteInMemory => Connection::open_in_memory()?,
        };

        let connection = Arc::new(Mutex::new(connection));
        sqlite::create_schema(&connection)?;

        Ok(Self { connection })
    }

    /// Provide access to the shared database connection.
    pub(crate) fn get_connection(&self) -> SharedSqliteConnection {
        self.connection.clone()
    }

    pub(crate) fn create_cache_repository(&self) -> Arc<SqliteCacheRepository> {
        Arc::new(SqliteCacheRepository::new(self.get_connection()))
    }

    pub(crate) fn create_timer_repository(&self) -> Arc<SqliteTimerRepository> {
        Arc::new(SqliteTimerRepository::new(self.get_connection()))
    }

    pub(crate) fn create_session_repository(&self) -> Arc<SqliteSessionRepository> {
        Arc::new(SqliteSessionRepository::new(self.get_connection()))
    }

    pub(crate) fn create_settings_repository(&self) -> Arc<SqliteSettingsRepository> {
        Arc::new(SqliteSettingsRepository::new(self.get_connection()))
    }

    pub(crate) fn create_problem_repository(&self) -> Arc<SqliteProblemRepository> {
        Arc::new(SqliteProblemRepository::new(self.get_connection()))
    }
}

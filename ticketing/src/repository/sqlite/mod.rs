use crate::error::TicketingError;
use crate::repository::SharedSqliteConnection;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub(crate) mod sqlite_cache_repo;
pub(crate) mod sqlite_problem_repo;
pub(crate) mod sqlite_session_repo;
pub(crate) mod sqlite_settings_repo;
pub(crate) mod sqlite_timer_repo;

#[cfg(test)]
pub(crate) mod tests;

/// Creates the entire database schema by running schema creation functions for all entities.
#[allow(clippy::module_name_repetitions)]
pub(crate) fn create_schema(connection: &SharedSqliteConnection) -> Result<(), TicketingError> {
    let conn = connection.lock().map_err(|_| TicketingError::LockPoisoned)?;
    sqlite_cache_repo::create_cache_table(&conn)?;
    sqlite_timer_repo::create_timer_table(&conn)?;
    sqlite_session_repo::create_session_table(&conn)?;
    sqlite_settings_repo::create_settings_table(&conn)?;
    sqlite_problem_repo::create_problem_table(&conn)?;
    Ok(())
}

pub(crate) fn create_connection(dbms_path: &Path) -> Result<Connection, TicketingError> {
    if let Some(parent) = dbms_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let connection = Connection::open(dbms_path)?;
    Ok(connection)
}

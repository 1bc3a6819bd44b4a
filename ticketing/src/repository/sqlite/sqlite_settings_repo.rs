use crate::error::TicketingError;
use crate::repository::settings_repository::SettingsRepository;
use crate::repository::SharedSqliteConnection;
use rusqlite::{params, Connection, OptionalExtension};

pub struct SqliteSettingsRepository {
    connection: SharedSqliteConnection,
}

const CREATE_SETTINGS_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS setting (
        key varchar(64) primary key not null,
        value text not null
    );
";

pub(crate) fn create_settings_table(conn: &Connection) -> Result<(), TicketingError> {
    conn.execute_batch(CREATE_SETTINGS_TABLE_SQL)?;
    Ok(())
}

impl SqliteSettingsRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

impl SettingsRepository for SqliteSettingsRepository {
    fn get(&self, key: &str) -> Result<Option<String>, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM setting WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO setting (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute("DELETE FROM setting WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::test_database_manager;

    #[test]
    fn test_set_replaces_previous_value() -> Result<(), TicketingError> {
        let repo = test_database_manager()?.create_settings_repository();
        assert_eq!(repo.get("tickets_view_mode")?, None);

        repo.set("tickets_view_mode", "cards")?;
        repo.set("tickets_view_mode", "list")?;
        assert_eq!(repo.get("tickets_view_mode")?.as_deref(), Some("list"));

        repo.remove("tickets_view_mode")?;
        assert_eq!(repo.get("tickets_view_mode")?, None);
        Ok(())
    }
}

use crate::repository::SharedSqliteConnection;
use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension};
use ticket_api::models::auth::Session;
use ticket_api::models::user::User;
use ticket_api::session::{SessionStore, SessionStoreError};

/// Keeps the session of the logged in user in a single row
pub struct SqliteSessionRepository {
    connection: SharedSqliteConnection,
}

const CREATE_SESSION_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS session (
        id integer primary key not null check (id = 1),
        token text not null,
        refresh_token text not null,
        expires_at datetime,
        user_data text
    );
";

pub(crate) fn create_session_table(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CREATE_SESSION_TABLE_SQL)
}

impl SqliteSessionRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

fn store_error(err: impl std::fmt::Display) -> SessionStoreError {
    SessionStoreError(err.to_string())
}

impl SessionStore for SqliteSessionRepository {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| store_error("lock poisoned"))?;
        let row = conn
            .query_row(
                "SELECT token, refresh_token, expires_at, user_data FROM session WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<DateTime<Utc>>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(store_error)?;

        let Some((token, refresh_token, expires_at, user_data)) = row else {
            return Ok(None);
        };
        let user = user_data
            .as_deref()
            .map(serde_json::from_str::<User>)
            .transpose()
            .map_err(store_error)?;
        Ok(Some(Session {
            token,
            refresh_token,
            expires_at,
            user,
        }))
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let user_data = session
            .user
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(store_error)?;
        let conn = self
            .connection
            .lock()
            .map_err(|_| store_error("lock poisoned"))?;
        conn.execute(
            r"INSERT INTO session (id, token, refresh_token, expires_at, user_data)
              VALUES (1, :token, :refresh_token, :expires_at, :user_data)
              ON CONFLICT(id) DO UPDATE SET
                token = excluded.token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                user_data = excluded.user_data",
            named_params! {
                ":token": session.token,
                ":refresh_token": session.refresh_token,
                ":expires_at": session.expires_at,
                ":user_data": user_data,
            },
        )
        .map_err(store_error)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| store_error("lock poisoned"))?;
        conn.execute("DELETE FROM session", []).map_err(store_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::test_database_manager;
    use ticket_api::models::user::Role;

    #[test]
    fn test_save_load_clear() {
        let repo = test_database_manager().unwrap().create_session_repository();
        assert!(repo.load().unwrap().is_none());

        let session = Session {
            token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: None,
            user: Some(User {
                id: 5,
                email: "alice@example.org".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Martin".to_string(),
                role: Role::Collaborateur,
            }),
        };
        repo.save(&session).unwrap();
        assert_eq!(repo.load().unwrap(), Some(session.clone()));

        let renewed = Session {
            token: "access-2".to_string(),
            ..session
        };
        repo.save(&renewed).unwrap();
        assert_eq!(repo.load().unwrap().unwrap().token, "access-2");

        repo.clear().unwrap();
        assert!(repo.load().unwrap().is_none());
    }
}

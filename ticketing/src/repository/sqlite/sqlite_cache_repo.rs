use crate::error::TicketingError;
use crate::repository::cache_repository::CacheRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::CachedTicket;
use log::debug;
use rusqlite::{named_params, params, Connection, OptionalExtension};
use ticket_api::models::core::TicketId;

pub struct SqliteCacheRepository {
    connection: SharedSqliteConnection,
}

/// Every record is kept as a JSON document next to the columns we query on
const CREATE_CACHE_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS cached_ticket (
        id integer primary key not null,
        data text not null,
        pending boolean not null default 0,
        local_modified_at datetime
    );
";

pub(crate) fn create_cache_table(conn: &Connection) -> Result<(), TicketingError> {
    conn.execute_batch(CREATE_CACHE_TABLE_SQL)?;
    Ok(())
}

impl SqliteCacheRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }

    fn query(&self, sql: &str) -> Result<Vec<CachedTicket>, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let mut stmt = conn.prepare(sql)?;
        let documents = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        documents
            .iter()
            .map(|doc| serde_json::from_str::<CachedTicket>(doc).map_err(TicketingError::from))
            .collect()
    }
}

impl CacheRepository for SqliteCacheRepository {
    fn find(&self, id: TicketId) -> Result<Option<CachedTicket>, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let document: Option<String> = conn
            .query_row(
                "SELECT data FROM cached_ticket WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match document {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    fn upsert(&self, cached: &CachedTicket) -> Result<(), TicketingError> {
        let data = serde_json::to_string(cached)?;
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute(
            r"INSERT INTO cached_ticket (id, data, pending, local_modified_at)
              VALUES (:id, :data, :pending, :local_modified_at)
              ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                pending = excluded.pending,
                local_modified_at = excluded.local_modified_at",
            named_params! {
                ":id": cached.id,
                ":data": data,
                ":pending": cached.pending,
                ":local_modified_at": cached.local_modified_at,
            },
        )?;
        debug!("Cached ticket {} (pending: {})", cached.id, cached.pending);
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<CachedTicket>, TicketingError> {
        self.query("SELECT data FROM cached_ticket ORDER BY id")
    }

    fn find_pending(&self) -> Result<Vec<CachedTicket>, TicketingError> {
        self.query("SELECT data FROM cached_ticket WHERE pending = 1 ORDER BY local_modified_at, id")
    }

    fn remove(&self, id: TicketId) -> Result<(), TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute("DELETE FROM cached_ticket WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn clear(&self) -> Result<(), TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute("DELETE FROM cached_ticket", [])?;
        Ok(())
    }
}

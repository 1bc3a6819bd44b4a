use crate::error::TicketingError;
use crate::repository::timer_repository::TimerRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{WorkState, WorkTimer};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{named_params, params, Connection, OptionalExtension, Row};
use ticket_api::models::core::TicketId;

pub struct SqliteTimerRepository {
    connection: SharedSqliteConnection,
}

/// SQL statement to create the `work_timer` table.
/// `running_since` is set only while running, `finished_at` only once finished.
const CREATE_TIMER_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS work_timer (
        ticket_id integer primary key not null,
        state varchar(16) not null,
        running_since datetime,
        finished_at datetime,
        base_duration integer not null default 0,
        updated_at datetime not null,
        CHECK ((state = 'running') = (running_since IS NOT NULL)),
        CHECK ((state = 'finished') = (finished_at IS NOT NULL))
    );
";

/// Creates the `work_timer` table in the database.
pub(crate) fn create_timer_table(conn: &Connection) -> Result<(), TicketingError> {
    conn.execute_batch(CREATE_TIMER_TABLE_SQL)?;
    Ok(())
}

impl SqliteTimerRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

fn timer_from_row(row: &Row<'_>) -> rusqlite::Result<WorkTimer> {
    let state: String = row.get(1)?;
    let running_since: Option<DateTime<Utc>> = row.get(2)?;
    let finished_at: Option<DateTime<Utc>> = row.get(3)?;
    let state = match (state.as_str(), running_since, finished_at) {
        ("running", Some(since), _) => WorkState::Running { since },
        ("paused", _, _) => WorkState::Paused,
        ("finished", _, Some(at)) => WorkState::Finished { at },
        _ => WorkState::Idle,
    };
    Ok(WorkTimer {
        ticket_id: row.get(0)?,
        state,
        base_duration_secs: u64::try_from(row.get::<_, i64>(4)?).unwrap_or(0),
        updated_at: row.get(5)?,
    })
}

impl TimerRepository for SqliteTimerRepository {
    fn find(&self, ticket_id: TicketId) -> Result<Option<WorkTimer>, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let timer = conn
            .query_row(
                r"SELECT ticket_id, state, running_since, finished_at, base_duration, updated_at
                  FROM work_timer
                  WHERE ticket_id = ?1",
                params![ticket_id],
                timer_from_row,
            )
            .optional()?;
        Ok(timer)
    }

    fn save(&self, timer: &WorkTimer) -> Result<(), TicketingError> {
        debug!(
            "Saving timer of ticket {} ({}, {}s)",
            timer.ticket_id, timer.state, timer.base_duration_secs
        );
        let (running_since, finished_at) = match timer.state {
            WorkState::Running { since } => (Some(since), None),
            WorkState::Finished { at } => (None, Some(at)),
            WorkState::Idle | WorkState::Paused => (None, None),
        };
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute(
            r"INSERT INTO work_timer (ticket_id, state, running_since, finished_at, base_duration, updated_at)
              VALUES (:ticket_id, :state, :running_since, :finished_at, :base_duration, :updated_at)
              ON CONFLICT(ticket_id) DO UPDATE SET
                state = excluded.state,
                running_since = excluded.running_since,
                finished_at = excluded.finished_at,
                base_duration = excluded.base_duration,
                updated_at = excluded.updated_at",
            named_params! {
                ":ticket_id": timer.ticket_id,
                ":state": timer.state.to_string(),
                ":running_since": running_since,
                ":finished_at": finished_at,
                ":base_duration": i64::try_from(timer.base_duration_secs).unwrap_or(i64::MAX),
                ":updated_at": timer.updated_at,
            },
        )?;
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<WorkTimer>, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            r"SELECT ticket_id, state, running_since, finished_at, base_duration, updated_at
              FROM work_timer
              ORDER BY ticket_id",
        )?;
        let timers = stmt
            .query_map([], timer_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(timers)
    }

    fn remove(&self, ticket_id: TicketId) -> Result<(), TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute(
            "DELETE FROM work_timer WHERE ticket_id = ?1",
            params![ticket_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::test_database_manager;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_save_and_find_every_state() -> Result<(), TicketingError> {
        let repo = test_database_manager()?.create_timer_repository();
        let t0 = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();

        let mut timer = WorkTimer::new(42, t0);
        repo.save(&timer)?;
        assert_eq!(repo.find(42)?, Some(timer.clone()));

        timer.start(t0).unwrap();
        repo.save(&timer)?;
        assert_eq!(repo.find(42)?.unwrap().state, WorkState::Running { since: t0 });

        timer.pause(t0 + Duration::seconds(65)).unwrap();
        repo.save(&timer)?;
        let paused = repo.find(42)?.unwrap();
        assert_eq!(paused.state, WorkState::Paused);
        assert_eq!(paused.base_duration_secs, 65);

        timer.finish(t0 + Duration::seconds(70)).unwrap();
        repo.save(&timer)?;
        assert!(repo.find(42)?.unwrap().is_finished());
        assert_eq!(repo.find_all()?.len(), 1);

        repo.remove(42)?;
        assert!(repo.find(42)?.is_none());
        Ok(())
    }
}

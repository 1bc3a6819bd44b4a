use crate::error::TicketingError;
use crate::repository::problem_repository::ProblemRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::ProblemRequest;
use rusqlite::{named_params, params, Connection};

pub struct SqliteProblemRepository {
    connection: SharedSqliteConnection,
}

const CREATE_PROBLEM_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS problem_request (
        id integer primary key autoincrement not null,
        occurred_at datetime not null,
        ticket_id integer,
        action varchar(32) not null,
        message text not null
    );
";

pub(crate) fn create_problem_table(conn: &Connection) -> Result<(), TicketingError> {
    conn.execute_batch(CREATE_PROBLEM_TABLE_SQL)?;
    Ok(())
}

impl SqliteProblemRepository {
    pub(crate) fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

impl ProblemRepository for SqliteProblemRepository {
    fn add(&self, problem: &ProblemRequest, keep: usize) -> Result<i64, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let id: i64 = conn.query_row(
            r"INSERT INTO problem_request (occurred_at, ticket_id, action, message)
              VALUES (:occurred_at, :ticket_id, :action, :message)
              RETURNING id",
            named_params! {
                ":occurred_at": problem.occurred_at,
                ":ticket_id": problem.ticket_id,
                ":action": problem.action,
                ":message": problem.message,
            },
            |row| row.get(0),
        )?;
        conn.execute(
            r"DELETE FROM problem_request
              WHERE id NOT IN (SELECT id FROM problem_request ORDER BY id DESC LIMIT ?1)",
            params![i64::try_from(keep).unwrap_or(i64::MAX)],
        )?;
        Ok(id)
    }

    fn find_recent(&self, limit: usize) -> Result<Vec<ProblemRequest>, TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            r"SELECT id, occurred_at, ticket_id, action, message
              FROM problem_request
              ORDER BY id DESC
              LIMIT ?1",
        )?;
        let problems = stmt
            .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok(ProblemRequest {
                    id: Some(row.get(0)?),
                    occurred_at: row.get(1)?,
                    ticket_id: row.get(2)?,
                    action: row.get(3)?,
                    message: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(problems)
    }

    fn clear(&self) -> Result<(), TicketingError> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| TicketingError::LockPoisoned)?;
        conn.execute("DELETE FROM problem_request", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::test_database_manager;
    use chrono::Utc;

    #[test]
    fn test_only_the_most_recent_are_kept() -> Result<(), TicketingError> {
        let repo = test_database_manager()?.create_problem_repository();
        for n in 0..5 {
            repo.add(
                &ProblemRequest {
                    id: None,
                    occurred_at: Utc::now(),
                    ticket_id: Some(n),
                    action: "pause".to_string(),
                    message: format!("timeout {n}"),
                },
                3,
            )?;
        }
        let recent = repo.find_recent(10)?;
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].ticket_id, Some(4));
        assert_eq!(recent[2].message, "timeout 2");
        Ok(())
    }
}

use crate::clock::Clock;
use crate::error::TicketingError;
use crate::repository::problem_repository::ProblemRepository;
use crate::types::ProblemRequest;
use log::warn;
use std::fmt::Display;
use std::sync::Arc;
use ticket_api::models::core::TicketId;

/// Number of failed requests kept in the log
pub const PROBLEM_LOG_CAPACITY: usize = 100;

/// Keeps track of requests that failed in the background, where no one is
/// there to see the error
pub struct ProblemLogService {
    repo: Arc<dyn ProblemRepository>,
    clock: Arc<dyn Clock>,
}

impl ProblemLogService {
    pub fn new(repo: Arc<dyn ProblemRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Logs and stores the failure. Failing to store it is only logged.
    pub fn record(&self, ticket_id: Option<TicketId>, action: &str, error: &dyn Display) {
        warn!("{action} failed for ticket {ticket_id:?}: {error}");
        let problem = ProblemRequest {
            id: None,
            occurred_at: self.clock.now(),
            ticket_id,
            action: action.to_string(),
            message: error.to_string(),
        };
        if let Err(e) = self.repo.add(&problem, PROBLEM_LOG_CAPACITY) {
            warn!("Unable to store the failure in the problem log: {e}");
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn recent(&self, limit: usize) -> Result<Vec<ProblemRequest>, TicketingError> {
        self.repo.find_recent(limit)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn clear(&self) -> Result<(), TicketingError> {
        self.repo.clear()
    }
}

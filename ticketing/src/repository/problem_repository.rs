use crate::error::TicketingError;
use crate::types::ProblemRequest;

/// Log of failed requests, keeping only the most recent entries
pub trait ProblemRepository: Send + Sync {
    /// Appends the entry and drops the oldest ones beyond `keep`.
    /// Returns the id of the new entry.
    fn add(&self, problem: &ProblemRequest, keep: usize) -> Result<i64, TicketingError>;

    /// Newest first
    fn find_recent(&self, limit: usize) -> Result<Vec<ProblemRequest>, TicketingError>;

    fn clear(&self) -> Result<(), TicketingError>;
}

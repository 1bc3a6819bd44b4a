use crate::error::TicketingError;
use crate::types::WorkTimer;
use ticket_api::models::core::TicketId;

/// Storage of the work timers, at most one per ticket
pub trait TimerRepository: Send + Sync {
    fn find(&self, ticket_id: TicketId) -> Result<Option<WorkTimer>, TicketingError>;

    /// Inserts the timer, or replaces the one of the same ticket
    fn save(&self, timer: &WorkTimer) -> Result<(), TicketingError>;

    fn find_all(&self) -> Result<Vec<WorkTimer>, TicketingError>;

    fn remove(&self, ticket_id: TicketId) -> Result<(), TicketingError>;
}

use crate::error::TicketingError;
use crate::types::CachedTicket;
use ticket_api::models::core::TicketId;

/// Local mirror of the tickets, keyed by ticket id
pub trait CacheRepository: Send + Sync {
    fn find(&self, id: TicketId) -> Result<Option<CachedTicket>, TicketingError>;

    /// Inserts the record, or replaces the one with the same id
    fn upsert(&self, cached: &CachedTicket) -> Result<(), TicketingError>;

    /// All records, ordered by ticket id
    fn find_all(&self) -> Result<Vec<CachedTicket>, TicketingError>;

    /// Records holding local changes not yet confirmed by the service
    fn find_pending(&self) -> Result<Vec<CachedTicket>, TicketingError>;

    fn remove(&self, id: TicketId) -> Result<(), TicketingError>;

    fn clear(&self) -> Result<(), TicketingError>;
}

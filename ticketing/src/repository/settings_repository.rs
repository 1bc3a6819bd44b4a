use crate::error::TicketingError;

/// User preferences as key/value pairs
pub trait SettingsRepository: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, TicketingError>;

    fn set(&self, key: &str, value: &str) -> Result<(), TicketingError>;

    fn remove(&self, key: &str) -> Result<(), TicketingError>;
}

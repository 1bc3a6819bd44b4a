use std::{io, path::PathBuf};

use thiserror::Error;
use ticket_api::builder::TicketApiBuilderError;
use ticket_api::models::core::TicketId;
use ticket_api::session::SessionStoreError;
use ticket_api::ApiError;
use url::ParseError;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum TicketingError {
    #[error("Unable to load the application configuration file {path:?}")]
    ApplicationConfig { path: PathBuf, source: io::Error },
    #[error("Unable to parse contents of {path}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Unable to create configuration file {path}")]
    ConfigFileCreation { path: PathBuf },
    #[error("Directory creation failed")]
    CreateDir(#[from] io::Error),
    #[error("Ticket service: {0}")]
    Api(#[from] ApiError),
    #[error("Unable to create the ticket service client: {0}")]
    ClientInit(String),
    #[error("Unable to parse the url: {0}")]
    InvalidUrl(ParseError),
    #[error("SQL dbms error: {0}")]
    Sql(String),
    #[error("Mutex locking error")]
    LockPoisoned,
    #[error("Unable to create database SQL schema: {0}")]
    DatabaseError(String),
    #[error("Unable to encode or decode cached data: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cannot {action} the work on ticket {ticket_id} while it is {state}")]
    InvalidTransition {
        ticket_id: TicketId,
        action: &'static str,
        state: String,
    },
    #[error("No work has been tracked for ticket {0}")]
    NoTimer(TicketId),
    #[error("Ticket {0} not found")]
    TicketNotFound(TicketId),
    #[error("Not logged in, use 'tickets login' first")]
    NotLoggedIn,
    #[error("Could not make sense of input: {0}")]
    BadInput(String),
}

impl From<rusqlite::Error> for TicketingError {
    fn from(err: rusqlite::Error) -> Self {
        TicketingError::Sql(format!("Sqlite error {err}"))
    }
}

impl From<ParseError> for TicketingError {
    fn from(value: ParseError) -> Self {
        TicketingError::InvalidUrl(value)
    }
}

impl From<SessionStoreError> for TicketingError {
    fn from(err: SessionStoreError) -> Self {
        TicketingError::Api(ApiError::SessionStore(err))
    }
}

impl From<TicketApiBuilderError> for TicketingError {
    fn from(err: TicketApiBuilderError) -> Self {
        match err {
            TicketApiBuilderError::UrlParseError(e) => TicketingError::InvalidUrl(e),
            other => TicketingError::ClientInit(other.to_string()),
        }
    }
}

impl TicketingError {
    /// Errors telling the user to log in (again)
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            TicketingError::NotLoggedIn
                | TicketingError::Api(
                    ApiError::SessionExpired | ApiError::NotLoggedIn | ApiError::Unauthorized
                )
        )
    }
}

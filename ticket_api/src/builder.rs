//!
//! ```rust,ignore
//! // 1. Using the builder with explicit configuration
//! let api = TicketApi::builder()
//!     .host("https://tickets.example.com")
//!     .timeout(8)
//!     .build()
//!     .expect("Failed to create ticket client");
//!
//! // 2. Using environment variables
//! let api = TicketApiBuilder::create_from_env()
//!     .expect("Failed to create ticket client");
//! ```
use crate::config::ApiClientConfiguration;
use crate::models::auth::Session;
use crate::session::{MemorySessionStore, SessionStore};
use crate::{RetryPolicy, TicketApi};
use log::debug;
use reqwest::Client;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Error type for `TicketApiBuilder` operations
#[derive(Error, Debug)]
pub enum TicketApiBuilderError {
    #[error("Environment variable {0} not set")]
    EnvVarNotSet(String),

    #[error("URL parsing error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Client initialization error: {0}")]
    ClientInitError(String),

    #[error("Timeout must be positive")]
    InvalidTimeout,
}

/// Names of the environment variables understood by [`TicketApiBuilder::from_env`]
pub struct TicketEnvVars;

impl TicketEnvVars {
    pub const HOST: &'static str = "TICKETS_HOST";
    pub const TOKEN: &'static str = "TICKETS_TOKEN";
    pub const REFRESH_TOKEN: &'static str = "TICKETS_REFRESH_TOKEN";
}

pub const DEFAULT_API_PATH: &str = "api";

/// Builder for creating `TicketApi` instances
pub struct TicketApiBuilder {
    host: Option<String>,
    api_path: Option<String>,
    timeout: Option<Duration>,
    retry: RetryPolicy,
    session_store: Option<Arc<dyn SessionStore>>,
    initial_session: Option<Session>,
}

impl Default for TicketApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketApiBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: None,
            api_path: None,
            timeout: None,
            retry: RetryPolicy::default(),
            session_store: None,
            initial_session: None,
        }
    }

    /// Sets the host URL, i.e. `https://tickets.example.com`
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the path prefix of the REST resources (default is `api`)
    #[must_use]
    pub fn api_path(mut self, path: impl Into<String>) -> Self {
        self.api_path = Some(path.into());
        self
    }

    /// Sets a request timeout in seconds
    #[must_use]
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Where the session is read from and written to
    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Seeds an in-memory session, ignored if a session store is supplied
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.initial_session = Some(session);
        self
    }

    /// Applies the `[server]` section of the application configuration
    #[must_use]
    pub fn configuration(self, cfg: &ApiClientConfiguration) -> Self {
        self.host(cfg.url.clone())
            .timeout(cfg.request_timeout_secs)
            .retry(RetryPolicy {
                attempts: cfg.retry_attempts.max(1),
                delay: Duration::from_millis(cfg.retry_delay_ms),
            })
    }

    /// Attempts to load configuration from environment variables
    #[must_use]
    pub fn from_env(self) -> Self {
        let mut builder = self;

        if let Ok(host) = env::var(TicketEnvVars::HOST) {
            builder = builder.host(host);
        }
        if let (Ok(token), Ok(refresh_token)) = (
            env::var(TicketEnvVars::TOKEN),
            env::var(TicketEnvVars::REFRESH_TOKEN),
        ) {
            builder = builder.session(Session {
                token,
                refresh_token,
                expires_at: None,
                user: None,
            });
        }
        builder
    }

    /// Builds a client instance with the configured parameters
    ///
    /// # Errors
    /// If the host is missing or invalid, or the HTTP client could not be created
    pub fn build(self) -> Result<TicketApi, TicketApiBuilderError> {
        let host = self
            .host
            .ok_or_else(|| TicketApiBuilderError::EnvVarNotSet(TicketEnvVars::HOST.to_string()))?;

        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(TicketApiBuilderError::InvalidTimeout);
        }

        let api_path = self
            .api_path
            .unwrap_or_else(|| DEFAULT_API_PATH.to_string());
        let base = base_url(&host, &api_path)?;

        let mut client_builder = Client::builder();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder
            .build()
            .map_err(|e| TicketApiBuilderError::ClientInitError(e.to_string()))?;

        let sessions = self
            .session_store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new(self.initial_session)));

        let api = TicketApi::with_parts(base, client, self.retry, sessions);
        debug!("Created ticket client: {:#?}", api);

        Ok(api)
    }

    /// Convenience method to create a client from environment variables
    ///
    /// # Errors
    /// See [`TicketApiBuilder::build`]
    pub fn create_from_env() -> Result<TicketApi, TicketApiBuilderError> {
        Self::new().from_env().build()
    }
}

/// Joins host and api path into a base url ending with a slash, so that
/// relative resources are appended rather than replacing the last segment.
pub(crate) fn base_url(host: &str, api_path: &str) -> Result<Url, url::ParseError> {
    let mut host = host.trim_end_matches('/').to_string();
    host.push('/');
    let mut path = api_path.trim_matches('/').to_string();
    if !path.is_empty() {
        path.push('/');
    }
    Url::parse(&host)?.join(&path)
}

impl TicketApi {
    /// Create a client builder
    #[must_use]
    pub fn builder() -> TicketApiBuilder {
        TicketApiBuilder::new()
    }
}

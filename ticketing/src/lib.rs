//! Application core of the ticket client.
//!
//! [`ApplicationRuntime`] wires the ticket service client, the local Sqlite store
//! and the services on top of them. Create it with [`ApplicationRuntimeBuilder`].
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfiguration;
use crate::error::TicketingError;
use crate::repository::database_manager::{DatabaseConfig, DatabaseManager};
use crate::service::cache_service::CacheService;
use crate::service::dashboard::DashboardService;
use crate::service::problem_log::ProblemLogService;
use crate::service::session_service::SessionService;
use crate::service::ticket_service::TicketService;
use crate::service::timer_service::TimerService;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ticket_api::TicketApi;

pub mod clock;
pub mod config;
pub mod date;
pub mod error;
pub mod repository;
pub mod service;
pub mod types;

pub struct ApplicationRuntime {
    config: AppConfiguration,
    client: TicketApi,
    cache_service: Arc<CacheService>,
    timer_service: Arc<TimerService>,
    ticket_service: Arc<TicketService>,
    session_service: Arc<SessionService>,
    dashboard_service: Arc<DashboardService>,
    problem_log: Arc<ProblemLogService>,
}

impl ApplicationRuntime {
    /// Creates the runtime from the configuration file and the local store it names
    ///
    /// # Errors
    /// - the configuration file could not be read
    /// - the ticket service url is invalid
    /// - the local store could not be opened
    pub fn new() -> Result<Self, TicketingError> {
        ApplicationRuntimeBuilder::new().build()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfiguration {
        &self.config
    }

    #[must_use]
    pub fn ticket_client(&self) -> &TicketApi {
        &self.client
    }

    #[must_use]
    pub fn cache_service(&self) -> Arc<CacheService> {
        self.cache_service.clone()
    }

    #[must_use]
    pub fn timer_service(&self) -> Arc<TimerService> {
        self.timer_service.clone()
    }

    #[must_use]
    pub fn ticket_service(&self) -> Arc<TicketService> {
        self.ticket_service.clone()
    }

    #[must_use]
    pub fn session_service(&self) -> Arc<SessionService> {
        self.session_service.clone()
    }

    #[must_use]
    pub fn dashboard_service(&self) -> Arc<DashboardService> {
        self.dashboard_service.clone()
    }

    #[must_use]
    pub fn problem_log(&self) -> Arc<ProblemLogService> {
        self.problem_log.clone()
    }
}

/// Builder for [`ApplicationRuntime`]. Anything not set is taken from the
/// configuration file.
#[derive(Default)]
pub struct ApplicationRuntimeBuilder {
    config: Option<AppConfiguration>,
    server_url: Option<String>,
    database: Option<DatabaseConfig>,
    clock: Option<Arc<dyn Clock>>,
}

impl ApplicationRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfiguration) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the url of the ticket service
    #[must_use]
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn use_in_memory_db(mut self) -> Self {
        self.database = Some(DatabaseConfig::SqliteInMemory);
        self
    }

    #[must_use]
    pub fn use_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(DatabaseConfig::SqliteOnDisk { path: path.into() });
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    ///
    /// # Errors
    /// See [`ApplicationRuntime::new`]
    pub fn build(self) -> Result<ApplicationRuntime, TicketingError> {
        let mut config = match self.config {
            Some(config) => config,
            None => config::load()?,
        };
        if let Some(url) = self.server_url {
            config.server.api.url = url;
        }
        let database = self.database.unwrap_or_else(|| DatabaseConfig::SqliteOnDisk {
            path: PathBuf::from(&config.application_data.local_db),
        });
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let database_manager = DatabaseManager::new(&database)?;
        let sessions = database_manager.create_session_repository();

        let client = TicketApi::builder()
            .configuration(&config.server.api)
            .session_store(sessions.clone())
            .build()?;
        let background_client = client.with_request_timeout(Duration::from_secs(
            config.server.api.background_timeout_secs.max(1),
        ))?;

        let problem_log = Arc::new(ProblemLogService::new(
            database_manager.create_problem_repository(),
            clock.clone(),
        ));
        let cache_service = Arc::new(CacheService::new(
            database_manager.create_cache_repository(),
            clock.clone(),
        ));
        let timer_repository = database_manager.create_timer_repository();
        let timer_service = Arc::new(TimerService::new(
            timer_repository.clone(),
            cache_service.clone(),
            client.clone(),
            background_client,
            problem_log.clone(),
            clock.clone(),
        ));
        let ticket_service = Arc::new(TicketService::new(
            client.clone(),
            cache_service.clone(),
            timer_repository,
            problem_log.clone(),
            clock.clone(),
        ));
        let session_service = Arc::new(SessionService::new(client.clone(), sessions, clock));
        let dashboard_service = Arc::new(DashboardService::new(
            database_manager.create_settings_repository(),
        ));

        debug!("Application runtime ready, database {database:?}");
        Ok(ApplicationRuntime {
            config,
            client,
            cache_service,
            timer_service,
            ticket_service,
            session_service,
            dashboard_service,
            problem_log,
        })
    }
}

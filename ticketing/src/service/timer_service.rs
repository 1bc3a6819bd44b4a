//! Work timers.
//!
//! A transition is applied to the local timer and to the optimistic cache first,
//! then sent to the service as a workflow command. These background saves never
//! fail the transition: a failure is logged and kept in the problem log. Only
//! [`TimerService::resolve`], an explicit user action, reports errors.
use crate::clock::Clock;
use crate::error::TicketingError;
use crate::repository::timer_repository::TimerRepository;
use crate::service::cache_service::CacheService;
use crate::service::problem_log::ProblemLogService;
use crate::types::{TicketPatch, WorkState, WorkTimer};
use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;
use ticket_api::models::core::TicketId;
use ticket_api::models::ticket::Ticket;
use ticket_api::models::workflow::{Resolution, WorkflowCommand};
use ticket_api::{ApiError, TicketApi};

/// Elapsed time of a work timer at a given instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Elapsed {
    pub ticket_id: TicketId,
    pub secs: u64,
    /// `HH:MM:SS`
    pub hms: String,
    pub state: WorkState,
}

pub struct TimerService {
    timer_repository: Arc<dyn TimerRepository>,
    cache: Arc<CacheService>,
    api: TicketApi,
    background_api: TicketApi,
    problems: Arc<ProblemLogService>,
    clock: Arc<dyn Clock>,
}

impl TimerService {
    /// `background_api` is used for the saves of timer transitions and
    /// usually has a shorter timeout than `api`
    pub fn new(
        timer_repository: Arc<dyn TimerRepository>,
        cache: Arc<CacheService>,
        api: TicketApi,
        background_api: TicketApi,
        problems: Arc<ProblemLogService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            timer_repository,
            cache,
            api,
            background_api,
            problems,
            clock,
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn start(&self, ticket_id: TicketId) -> Result<WorkTimer, TicketingError> {
        self.transition(ticket_id, WorkTimer::start).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn pause(&self, ticket_id: TicketId) -> Result<WorkTimer, TicketingError> {
        self.transition(ticket_id, WorkTimer::pause).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn resume(&self, ticket_id: TicketId) -> Result<WorkTimer, TicketingError> {
        self.transition(ticket_id, WorkTimer::resume).await
    }

    /// Freezes the duration; the ticket then waits for [`TimerService::resolve`]
    #[allow(clippy::missing_errors_doc)]
    pub async fn finish(&self, ticket_id: TicketId) -> Result<WorkTimer, TicketingError> {
        self.transition(ticket_id, WorkTimer::finish).await
    }

    ///
    /// # Errors
    /// [`TicketingError::NoTimer`] if no work has been tracked for the ticket
    pub fn elapsed(&self, ticket_id: TicketId) -> Result<Elapsed, TicketingError> {
        let timer = self
            .timer_repository
            .find(ticket_id)?
            .ok_or(TicketingError::NoTimer(ticket_id))?;
        Ok(self.elapsed_of(&timer))
    }

    #[must_use]
    pub fn elapsed_of(&self, timer: &WorkTimer) -> Elapsed {
        let now = self.clock.now();
        Elapsed {
            ticket_id: timer.ticket_id,
            secs: timer.elapsed_secs(now),
            hms: timer.elapsed_hms(now),
            state: timer.state.clone(),
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn timers(&self) -> Result<Vec<WorkTimer>, TicketingError> {
        self.timer_repository.find_all()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn remove(&self, ticket_id: TicketId) -> Result<(), TicketingError> {
        self.timer_repository.remove(ticket_id)
    }

    /// Pushes the current duration of a running timer to the service.
    /// Returns `false` if the timer is not running.
    ///
    /// # Errors
    /// [`TicketingError::NoTimer`] if no work has been tracked for the ticket
    pub async fn autosave(&self, ticket_id: TicketId) -> Result<bool, TicketingError> {
        let timer = self
            .timer_repository
            .find(ticket_id)?
            .ok_or(TicketingError::NoTimer(ticket_id))?;
        if !timer.is_running() {
            return Ok(false);
        }
        let command = WorkflowCommand::RecordDuration {
            duration_secs: timer.elapsed_secs(self.clock.now()),
        };
        self.cache.put(ticket_id, TicketPatch::from_command(&command))?;
        self.save_in_background(ticket_id, &command).await;
        Ok(true)
    }

    /// Autosaves every running timer, returns how many there were
    #[allow(clippy::missing_errors_doc)]
    pub async fn autosave_all(&self) -> Result<usize, TicketingError> {
        let mut saved = 0;
        for timer in self.timer_repository.find_all()? {
            if timer.is_running() && self.autosave(timer.ticket_id).await? {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Resolves the ticket once its work is finished.
    ///
    /// The report is validated before anything is changed. The resolution is
    /// shown at once and reverted if the service rejects it.
    ///
    /// # Errors
    /// A blank report, a timer which is not finished, or any failure of the request
    pub async fn resolve(
        &self,
        ticket_id: TicketId,
        resolution: Resolution,
        report: &str,
    ) -> Result<Option<Ticket>, TicketingError> {
        let command = WorkflowCommand::Resolve {
            resolution,
            report: report.to_string(),
        };
        command.validate().map_err(ApiError::from)?;

        let timer = self
            .timer_repository
            .find(ticket_id)?
            .ok_or(TicketingError::NoTimer(ticket_id))?;
        if !timer.is_finished() {
            return Err(TicketingError::InvalidTransition {
                ticket_id,
                action: "resolve",
                state: timer.state.to_string(),
            });
        }

        let previous = self.cache.get(ticket_id)?;
        let patch = TicketPatch::from_command(&command);
        self.cache.put(ticket_id, patch.clone())?;
        match self.api.send_workflow(ticket_id, &command).await {
            Ok(ticket) => {
                self.cache.confirm(ticket_id, &patch, ticket.as_ref())?;
                Ok(ticket)
            }
            Err(e) => {
                self.cache.restore(ticket_id, previous)?;
                self.problems.record(Some(ticket_id), command.name(), &e);
                Err(e.into())
            }
        }
    }

    async fn transition<F>(&self, ticket_id: TicketId, apply: F) -> Result<WorkTimer, TicketingError>
    where
        F: FnOnce(&mut WorkTimer, DateTime<Utc>) -> Result<WorkflowCommand, TicketingError>,
    {
        let now = self.clock.now();
        let mut timer = self.load_or_create(ticket_id, now)?;
        let command = apply(&mut timer, now)?;
        debug!("Ticket {ticket_id}: {} -> {}", command.name(), timer.state);

        self.timer_repository.save(&timer)?;
        self.cache
            .put(ticket_id, TicketPatch::from_command(&command))?;
        self.save_in_background(ticket_id, &command).await;
        Ok(timer)
    }

    /// The stored timer, or one rebuilt from the cached copy of the ticket
    fn load_or_create(
        &self,
        ticket_id: TicketId,
        now: DateTime<Utc>,
    ) -> Result<WorkTimer, TicketingError> {
        if let Some(timer) = self.timer_repository.find(ticket_id)? {
            return Ok(timer);
        }
        let from_cache = self
            .cache
            .get(ticket_id)?
            .and_then(|cached| cached.view())
            .map(|ticket| WorkTimer::from_ticket(&ticket, now));
        Ok(from_cache.unwrap_or_else(|| WorkTimer::new(ticket_id, now)))
    }

    async fn save_in_background(&self, ticket_id: TicketId, command: &WorkflowCommand) {
        match self.background_api.send_workflow(ticket_id, command).await {
            Ok(ticket) => {
                let sent = TicketPatch::from_command(command);
                if let Err(e) = self.cache.confirm(ticket_id, &sent, ticket.as_ref()) {
                    self.problems.record(Some(ticket_id), command.name(), &e);
                }
            }
            Err(e) => self.problems.record(Some(ticket_id), command.name(), &e),
        }
    }
}

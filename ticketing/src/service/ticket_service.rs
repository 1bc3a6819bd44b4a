//! Ticket actions.
//!
//! Actions which are expected to succeed (accept, assign, comment, status change)
//! are applied optimistically: the cache is updated before the request is sent.
//! A transient failure leaves the change pending, to be replayed later by
//! [`TicketService::flush_pending`]. A rejection by the service reverts it.
//! The other actions (refuse, create, update, delete) only touch the cache once
//! the service has accepted them.
use crate::clock::Clock;
use crate::date::to_local_string;
use crate::error::TicketingError;
use crate::repository::timer_repository::TimerRepository;
use crate::service::cache_service::CacheService;
use crate::service::problem_log::ProblemLogService;
use crate::types::{CachedTicket, TicketPatch};
use futures::{stream, StreamExt};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use ticket_api::models::core::{TicketId, UserId};
use ticket_api::models::status::TicketStatus;
use ticket_api::models::ticket::{NewTicket, Ticket, TicketUpdate};
use ticket_api::models::user::{Role, User};
use ticket_api::models::workflow::{WorkflowCommand, WorkflowPayload};
use ticket_api::{ApiError, TicketApi};

/// Max number of pending changes replayed concurrently
const FLUSH_BUFFER_SIZE: usize = 4;

/// The outcome of an optimistic action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The service accepted the change
    Confirmed,
    /// The service could not be reached; the change is kept locally
    Pending,
}

/// Tickets to display. `stale` is set when the service could not be reached
/// and the tickets come from the local cache.
#[derive(Debug, Clone, Default)]
pub struct TicketList {
    pub tickets: Vec<Ticket>,
    pub stale: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub confirmed: usize,
    pub failed: usize,
}

pub struct TicketService {
    api: TicketApi,
    cache: Arc<CacheService>,
    timer_repository: Arc<dyn TimerRepository>,
    problems: Arc<ProblemLogService>,
    clock: Arc<dyn Clock>,
}

impl TicketService {
    pub fn new(
        api: TicketApi,
        cache: Arc<CacheService>,
        timer_repository: Arc<dyn TimerRepository>,
        problems: Arc<ProblemLogService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            api,
            cache,
            timer_repository,
            problems,
            clock,
        }
    }

    /// Loads the tickets visible to `user`, reconciled with the local cache.
    ///
    /// If the service cannot be reached the cached tickets are returned instead,
    /// flagged as stale.
    ///
    /// # Errors
    /// Authentication and authorisation failures, and any failure when there is
    /// nothing in the cache to fall back on
    pub async fn load_tickets(&self, user: &User) -> Result<TicketList, TicketingError> {
        match self.fetch_for(user).await {
            Ok(server) => {
                debug!("Loaded {} tickets for {:?}", server.len(), user.role);
                Ok(TicketList {
                    tickets: self.cache.reconcile(&server)?,
                    stale: false,
                })
            }
            Err(e) if e.is_transient() => {
                let cached = self.cache.cached_tickets()?;
                if cached.is_empty() {
                    return Err(e.into());
                }
                self.problems.record(None, "load", &e);
                warn!("Showing {} cached tickets", cached.len());
                Ok(TicketList {
                    tickets: cached,
                    stale: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_for(&self, user: &User) -> Result<Vec<Ticket>, ApiError> {
        match user.role {
            Role::Admin => self.api.get_tickets().await,
            Role::ChefProjet => self.api.get_chef_projet_tickets(user.id).await,
            Role::Collaborateur => self.api.get_assigned_tickets(user.id).await,
            Role::Client => self.api.get_my_tickets().await,
        }
    }

    /// A single ticket, from the cache if the service cannot be reached
    ///
    /// # Errors
    /// Any failure of the request, unless the ticket is cached
    pub async fn get_ticket(&self, id: TicketId) -> Result<Ticket, TicketingError> {
        match self.api.get_ticket(id).await {
            Ok(ticket) => {
                let mut merged = self.cache.reconcile(std::slice::from_ref(&ticket))?;
                Ok(merged.pop().unwrap_or(ticket))
            }
            Err(e) if e.is_transient() => self
                .cache
                .get(id)?
                .and_then(|c| c.view())
                .ok_or_else(|| e.into()),
            Err(ApiError::NotFound(_)) => Err(TicketingError::TicketNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn accept(&self, id: TicketId) -> Result<WriteOutcome, TicketingError> {
        self.optimistic(
            id,
            "accept",
            TicketPatch::status(TicketStatus::Accepted),
            self.api.accept(id),
        )
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn assign(&self, id: TicketId, user_id: UserId) -> Result<WriteOutcome, TicketingError> {
        let patch = TicketPatch {
            status: Some(TicketStatus::Assigned),
            assigned_to_id: Some(user_id),
            ..Default::default()
        };
        self.optimistic(id, "assign", patch, self.api.assign(id, user_id))
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn change_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<WriteOutcome, TicketingError> {
        let call = self.api.update_status(id, &status);
        self.optimistic(id, "status", TicketPatch::status(status.clone()), call)
            .await
    }

    /// Appends a line `<date time> <author>: <text>` to the comment log of the ticket
    ///
    /// # Errors
    /// A blank comment, or the current comment log could not be obtained
    pub async fn add_comment(
        &self,
        id: TicketId,
        author: &str,
        text: &str,
    ) -> Result<WriteOutcome, TicketingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TicketingError::BadInput("the comment is blank".to_string()));
        }
        let current = self.get_ticket(id).await?;
        let line = format!("{} {}: {}", to_local_string(self.clock.now()), author, text);
        let log = match current.comment.as_deref().map(str::trim_end) {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{line}"),
            _ => line,
        };
        let patch = TicketPatch {
            comment: Some(log.clone()),
            ..Default::default()
        };
        self.optimistic(id, "comment", patch, self.api.update_comment(id, &log))
            .await
    }

    /// Refuses the ticket. Not applied locally until the service agrees.
    #[allow(clippy::missing_errors_doc)]
    pub async fn refuse(
        &self,
        id: TicketId,
        reason: Option<String>,
    ) -> Result<Option<Ticket>, TicketingError> {
        let command = WorkflowCommand::Refuse { reason };
        match self.api.send_workflow(id, &command).await {
            Ok(ticket) => {
                let refused = TicketPatch::status(TicketStatus::Refused);
                self.cache.put(id, refused.clone())?;
                self.cache.confirm(id, &refused, ticket.as_ref())?;
                Ok(ticket)
            }
            Err(e) => {
                self.problems.record(Some(id), command.name(), &e);
                Err(e.into())
            }
        }
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create(&self, ticket: &NewTicket) -> Result<Ticket, TicketingError> {
        if ticket.title.trim().is_empty() {
            return Err(TicketingError::BadInput("a ticket needs a title".to_string()));
        }
        let created = self.api.create_ticket(ticket).await?;
        self.cache.store_server(&created)?;
        info!("Created ticket {}", created.id);
        Ok(created)
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn update(
        &self,
        id: TicketId,
        update: &TicketUpdate,
    ) -> Result<Option<Ticket>, TicketingError> {
        if update.is_empty() {
            return Err(TicketingError::BadInput("nothing to update".to_string()));
        }
        let updated = self.api.patch_ticket(id, update).await?;
        if let Some(ticket) = &updated {
            self.cache.store_server(ticket)?;
        }
        Ok(updated)
    }

    /// Deletes the ticket on the service, then every local trace of it
    #[allow(clippy::missing_errors_doc)]
    pub async fn delete(&self, id: TicketId) -> Result<(), TicketingError> {
        self.api.delete_ticket(id).await?;
        self.cache.remove(id)?;
        self.timer_repository.remove(id)?;
        info!("Deleted ticket {id}");
        Ok(())
    }

    /// Sends the pending local changes again. Changes which fail stay pending.
    #[allow(clippy::missing_errors_doc)]
    pub async fn flush_pending(&self) -> Result<FlushReport, TicketingError> {
        let pending = self.cache.pending()?;
        if pending.is_empty() {
            return Ok(FlushReport::default());
        }
        info!("Replaying {} pending changes", pending.len());

        let results: Vec<(CachedTicket, Result<(), ApiError>)> = stream::iter(pending)
            .map(|cached| async move {
                let result = self.replay(&cached).await;
                (cached, result)
            })
            .buffer_unordered(FLUSH_BUFFER_SIZE)
            .collect()
            .await;

        let mut report = FlushReport::default();
        for (cached, result) in results {
            match result {
                Ok(()) => {
                    self.cache.confirm(cached.id, &cached.local, None)?;
                    report.confirmed += 1;
                }
                Err(e) => {
                    self.problems.record(Some(cached.id), "replay", &e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn replay(&self, cached: &CachedTicket) -> Result<(), ApiError> {
        let id = cached.id;
        let local = &cached.local;
        if let Some(user_id) = local.assigned_to_id {
            self.api.assign(id, user_id).await?;
        }
        match (&local.status, local.work_payload()) {
            (Some(TicketStatus::Accepted), work) => {
                self.api.accept(id).await?;
                if let Some(payload) = work {
                    let payload = WorkflowPayload {
                        status: None,
                        ..payload
                    };
                    self.api.patch_workflow(id, &payload).await?;
                }
            }
            // The status a work transition implies travels with the work fields
            (_, Some(payload)) => {
                self.api.patch_workflow(id, &payload).await?;
            }
            (Some(status), None) => {
                self.api.update_status(id, status).await?;
            }
            (None, None) => {}
        }
        if let Some(comment) = &local.comment {
            self.api.update_comment(id, comment).await?;
        }
        Ok(())
    }

    async fn optimistic<F>(
        &self,
        id: TicketId,
        action: &str,
        patch: TicketPatch,
        call: F,
    ) -> Result<WriteOutcome, TicketingError>
    where
        F: Future<Output = Result<Option<Ticket>, ApiError>>,
    {
        let previous = self.cache.get(id)?;
        self.cache.put(id, patch.clone())?;
        match call.await {
            Ok(ticket) => {
                self.cache.confirm(id, &patch, ticket.as_ref())?;
                Ok(WriteOutcome::Confirmed)
            }
            Err(e) if e.is_transient() => {
                self.problems.record(Some(id), action, &e);
                Ok(WriteOutcome::Pending)
            }
            Err(e) => {
                self.cache.restore(id, previous)?;
                self.problems.record(Some(id), action, &e);
                Err(e.into())
            }
        }
    }
}

//! The optimistic local cache.
//!
//! Every local change is written here before the corresponding request is sent,
//! so that the tickets survive a restart or an unreachable service. When the
//! service answers with fresh tickets, [`CacheService::reconcile`] decides per
//! ticket whether the pending local change or the server copy wins.
use crate::clock::Clock;
use crate::error::TicketingError;
use crate::repository::cache_repository::CacheRepository;
use crate::types::{CachedTicket, TicketPatch};
use log::{debug, info};
use std::sync::Arc;
use ticket_api::models::core::TicketId;
use ticket_api::models::ticket::Ticket;

pub struct CacheService {
    repo: Arc<dyn CacheRepository>,
    clock: Arc<dyn Clock>,
}

impl CacheService {
    pub fn new(repo: Arc<dyn CacheRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn get(&self, id: TicketId) -> Result<Option<CachedTicket>, TicketingError> {
        self.repo.find(id)
    }

    /// Merges `patch` into the cached record of the ticket, creating it if needed.
    /// The record is marked as pending until [`CacheService::confirm`] is called.
    #[allow(clippy::missing_errors_doc)]
    pub fn put(&self, id: TicketId, patch: TicketPatch) -> Result<CachedTicket, TicketingError> {
        let mut cached = self.repo.find(id)?.unwrap_or_else(|| CachedTicket::new(id));
        cached.merge(patch, self.clock.now());
        self.repo.upsert(&cached)?;
        Ok(cached)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn all(&self) -> Result<Vec<CachedTicket>, TicketingError> {
        self.repo.find_all()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn pending(&self) -> Result<Vec<CachedTicket>, TicketingError> {
        self.repo.find_pending()
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn remove(&self, id: TicketId) -> Result<(), TicketingError> {
        self.repo.remove(id)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn clear(&self) -> Result<(), TicketingError> {
        self.repo.clear()
    }

    /// Marks the changes in `sent` as accepted by the service.
    ///
    /// If the service sent the ticket back it becomes the new snapshot, otherwise
    /// `sent` is folded into the existing snapshot. Local changes made besides
    /// `sent` stay pending.
    #[allow(clippy::missing_errors_doc)]
    pub fn confirm(
        &self,
        id: TicketId,
        sent: &TicketPatch,
        server: Option<&Ticket>,
    ) -> Result<(), TicketingError> {
        let cached = match (self.repo.find(id)?, server) {
            (Some(mut cached), server) => {
                cached.confirm(sent, server);
                cached
            }
            (None, Some(ticket)) => CachedTicket::from_server(ticket),
            (None, None) => return Ok(()),
        };
        debug!("Confirmed cached ticket {id}, still pending: {}", cached.pending);
        self.repo.upsert(&cached)
    }

    /// Puts a record back the way it was before an optimistic update
    #[allow(clippy::missing_errors_doc)]
    pub fn restore(
        &self,
        id: TicketId,
        previous: Option<CachedTicket>,
    ) -> Result<(), TicketingError> {
        match previous {
            Some(cached) => self.repo.upsert(&cached),
            None => self.repo.remove(id),
        }
    }

    /// Stores a ticket received from the service, dropping any local changes
    #[allow(clippy::missing_errors_doc)]
    pub fn store_server(&self, ticket: &Ticket) -> Result<(), TicketingError> {
        self.repo.upsert(&CachedTicket::from_server(ticket))
    }

    /// Merges the tickets received from the service with the cache.
    ///
    /// For every ticket a pending local change made after the server's last
    /// update is applied on top of the server copy and stays pending. In every
    /// other case the server copy wins and replaces the cached record.
    #[allow(clippy::missing_errors_doc)]
    pub fn reconcile(&self, server_tickets: &[Ticket]) -> Result<Vec<Ticket>, TicketingError> {
        let mut merged = Vec::with_capacity(server_tickets.len());
        for server in server_tickets {
            match self.repo.find(server.id)? {
                Some(mut cached) if cached.local_wins_over(server) => {
                    debug!(
                        "Ticket {}: local change from {:?} wins over server copy from {:?}",
                        server.id, cached.local_modified_at, server.updated_at
                    );
                    let mut ticket = server.clone();
                    cached.local.apply_to(&mut ticket);
                    cached.snapshot = Some(server.clone());
                    cached.server_updated_at = server.updated_at;
                    self.repo.upsert(&cached)?;
                    merged.push(ticket);
                }
                previous => {
                    if previous.is_some_and(|c| c.pending) {
                        info!(
                            "Ticket {}: server copy is newer, local change discarded",
                            server.id
                        );
                    }
                    self.repo.upsert(&CachedTicket::from_server(server))?;
                    merged.push(server.clone());
                }
            }
        }
        Ok(merged)
    }

    /// The cached tickets as they should be displayed, used when the service
    /// cannot be reached. Records without a server snapshot are skipped.
    #[allow(clippy::missing_errors_doc)]
    pub fn cached_tickets(&self) -> Result<Vec<Ticket>, TicketingError> {
        Ok(self
            .repo
            .find_all()?
            .iter()
            .filter_map(CachedTicket::view)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::repository::sqlite::tests::test_database_manager;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ticket_api::models::status::TicketStatus;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
    }

    fn cache_service(clock: Arc<ManualClock>) -> CacheService {
        let dbm = test_database_manager().unwrap();
        CacheService::new(dbm.create_cache_repository(), clock)
    }

    fn server_ticket(id: TicketId, status: TicketStatus, updated: DateTime<Utc>) -> Ticket {
        Ticket {
            id,
            title: format!("Ticket {id}"),
            status,
            updated_at: Some(updated),
            ..Default::default()
        }
    }

    #[test]
    fn test_put_then_get_returns_what_was_written() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock);

        let patch = TicketPatch {
            status: Some(TicketStatus::InProgress),
            work_duration: Some(65),
            temporarily_stopped: Some(true),
            comment: Some("2024-05-02 08:00 alice: vu".to_string()),
            ..Default::default()
        };
        cache.put(7, patch.clone())?;

        let cached = cache.get(7)?.unwrap();
        assert_eq!(cached.local, patch);
        assert_eq!(cached.local_modified_at, Some(t0()));
        assert!(cached.pending);
        Ok(())
    }

    #[test]
    fn test_put_merges_into_existing_record() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock.clone());

        cache.put(7, TicketPatch::status(TicketStatus::Accepted))?;
        clock.advance_secs(10);
        cache.put(
            7,
            TicketPatch {
                assigned_to_id: Some(3),
                ..Default::default()
            },
        )?;

        let cached = cache.get(7)?.unwrap();
        assert_eq!(cached.local.status, Some(TicketStatus::Accepted));
        assert_eq!(cached.local.assigned_to_id, Some(3));
        assert_eq!(cached.local_modified_at, Some(t0() + Duration::seconds(10)));
        Ok(())
    }

    #[test]
    fn test_newer_local_change_survives_reload() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock.clone());

        let loaded = server_ticket(42, TicketStatus::Open, t0() - Duration::hours(1));
        cache.reconcile(&[loaded.clone()])?;
        cache.put(42, TicketPatch::status(TicketStatus::Accepted))?;

        let reloaded = cache.reconcile(&[loaded])?;
        assert_eq!(reloaded[0].status, TicketStatus::Accepted);
        assert!(cache.get(42)?.unwrap().pending);
        Ok(())
    }

    #[test]
    fn test_newer_server_change_wins() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock);

        cache.put(42, TicketPatch::status(TicketStatus::Accepted))?;
        let reverted = server_ticket(42, TicketStatus::Open, t0() + Duration::minutes(5));

        let reloaded = cache.reconcile(&[reverted])?;
        assert_eq!(reloaded[0].status, TicketStatus::Open);
        let cached = cache.get(42)?.unwrap();
        assert!(!cached.pending);
        assert!(cached.local.is_empty());
        Ok(())
    }

    #[test]
    fn test_confirm_folds_local_changes() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock);

        cache.store_server(&server_ticket(5, TicketStatus::Open, t0()))?;
        let accept = TicketPatch::status(TicketStatus::Accepted);
        cache.put(5, accept.clone())?;
        cache.confirm(5, &accept, None)?;

        let cached = cache.get(5)?.unwrap();
        assert!(!cached.pending);
        assert_eq!(cached.view().unwrap().status, TicketStatus::Accepted);
        assert!(cache.pending()?.is_empty());
        assert_eq!(cache.cached_tickets()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_confirm_keeps_changes_that_were_not_sent() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock);

        cache.store_server(&server_ticket(6, TicketStatus::Open, t0()))?;
        let assign = TicketPatch {
            assigned_to_id: Some(3),
            ..Default::default()
        };
        cache.put(6, assign.clone())?;
        let accept = TicketPatch::status(TicketStatus::Accepted);
        cache.put(6, accept.clone())?;

        let returned = server_ticket(6, TicketStatus::Accepted, t0() + Duration::seconds(5));
        cache.confirm(6, &accept, Some(&returned))?;

        let cached = cache.get(6)?.unwrap();
        assert!(cached.pending);
        assert_eq!(cached.local, assign);
        assert_eq!(cache.pending()?.len(), 1);

        // The copy just returned by the service does not discard the assignment
        let reloaded = cache.reconcile(&[returned])?;
        assert_eq!(reloaded[0].assigned_to_id, Some(3));
        assert_eq!(reloaded[0].status, TicketStatus::Accepted);
        Ok(())
    }

    #[test]
    fn test_restore_previous_state() -> Result<(), TicketingError> {
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = cache_service(clock);

        let previous = cache.get(9)?;
        cache.put(9, TicketPatch::status(TicketStatus::Refused))?;
        cache.restore(9, previous)?;
        assert!(cache.get(9)?.is_none());
        Ok(())
    }
}

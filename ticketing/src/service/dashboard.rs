//! Figures derived from a list of tickets, plus the list presentation preference.
use crate::error::TicketingError;
use crate::repository::settings_repository::SettingsRepository;
use crate::types::ViewMode;
use std::sync::Arc;
use ticket_api::models::status::TicketStatus;
use ticket_api::models::ticket::Ticket;

const VIEW_MODE_KEY: &str = "tickets_view_mode";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardSummary {
    pub total: usize,
    /// Number of tickets per status, canonical statuses first, in workflow order.
    /// Statuses without tickets are left out.
    pub by_status: Vec<(TicketStatus, usize)>,
    pub running: usize,
    pub paused: usize,
    pub finished: usize,
    /// Sum of the work durations, in seconds
    pub tracked_secs: u64,
}

impl DashboardSummary {
    #[must_use]
    pub fn from_tickets(tickets: &[Ticket]) -> Self {
        let mut by_status: Vec<(TicketStatus, usize)> = TicketStatus::canonical()
            .into_iter()
            .map(|s| (s, 0))
            .collect();
        let mut summary = DashboardSummary {
            total: tickets.len(),
            ..Default::default()
        };

        for ticket in tickets {
            match by_status.iter_mut().find(|(s, _)| *s == ticket.status) {
                Some((_, count)) => *count += 1,
                None => by_status.push((ticket.status.clone(), 1)),
            }
            if ticket.work_finished {
                summary.finished += 1;
            } else if ticket.temporarily_stopped {
                summary.paused += 1;
            } else if ticket.status == TicketStatus::InProgress && ticket.start_time.is_some() {
                summary.running += 1;
            }
            summary.tracked_secs += ticket.work_duration;
        }

        by_status.retain(|(_, count)| *count > 0);
        summary.by_status = by_status;
        summary
    }

    #[must_use]
    pub fn count(&self, status: &TicketStatus) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| s == status)
            .map_or(0, |(_, c)| *c)
    }
}

pub struct DashboardService {
    settings: Arc<dyn SettingsRepository>,
}

impl DashboardService {
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn summary(&self, tickets: &[Ticket]) -> DashboardSummary {
        DashboardSummary::from_tickets(tickets)
    }

    /// The stored preference, the default if none or an unknown one is stored
    #[allow(clippy::missing_errors_doc)]
    pub fn view_mode(&self) -> Result<ViewMode, TicketingError> {
        Ok(self
            .settings
            .get(VIEW_MODE_KEY)?
            .and_then(|v| v.parse().ok())
            .unwrap_or_default())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn set_view_mode(&self, mode: ViewMode) -> Result<(), TicketingError> {
        self.settings.set(VIEW_MODE_KEY, &mode.to_string())
    }
}

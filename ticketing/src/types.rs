use crate::date::{format_hms, seconds_between};
use crate::error::TicketingError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use ticket_api::models::core::{TicketId, UserId};
use ticket_api::models::status::TicketStatus;
use ticket_api::models::ticket::Ticket;
use ticket_api::models::workflow::{WorkflowCommand, WorkflowPayload};

/// State of the work on a ticket.
///
/// ```text
///  Idle --start--> Running --pause--> Paused --resume--> Running
///                     |                  |
///                     +-----finish-------+----> Finished
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkState {
    Idle,
    Running { since: DateTime<Utc> },
    Paused,
    Finished { at: DateTime<Utc> },
}

impl Display for WorkState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkState::Idle => "idle",
            WorkState::Running { .. } => "running",
            WorkState::Paused => "paused",
            WorkState::Finished { .. } => "finished",
        };
        write!(f, "{s}")
    }
}

/// The work timer of a single ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkTimer {
    pub ticket_id: TicketId,
    pub state: WorkState,
    /// Seconds accumulated by all completed running intervals
    pub base_duration_secs: u64,
    pub updated_at: DateTime<Utc>,
}

impl WorkTimer {
    #[must_use]
    pub fn new(ticket_id: TicketId, now: DateTime<Utc>) -> Self {
        Self {
            ticket_id,
            state: WorkState::Idle,
            base_duration_secs: 0,
            updated_at: now,
        }
    }

    /// Rebuilds the timer from the work fields held by the service
    #[must_use]
    pub fn from_ticket(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        let state = if ticket.work_finished {
            WorkState::Finished {
                at: ticket.finish_time.unwrap_or(now),
            }
        } else if ticket.temporarily_stopped {
            WorkState::Paused
        } else {
            match (ticket.start_time, &ticket.status) {
                (Some(since), TicketStatus::InProgress) => WorkState::Running { since },
                _ => WorkState::Idle,
            }
        };
        Self {
            ticket_id: ticket.id,
            state,
            base_duration_secs: ticket.work_duration,
            updated_at: now,
        }
    }

    ///
    /// # Errors
    /// Unless the timer is idle
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<WorkflowCommand, TicketingError> {
        match self.state {
            WorkState::Idle => {
                self.state = WorkState::Running { since: now };
                self.updated_at = now;
                Ok(WorkflowCommand::StartWork { started_at: now })
            }
            _ => Err(self.invalid("start")),
        }
    }

    ///
    /// # Errors
    /// Unless the timer is running
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<WorkflowCommand, TicketingError> {
        match self.state {
            WorkState::Running { since } => {
                self.base_duration_secs += seconds_between(since, now);
                self.state = WorkState::Paused;
                self.updated_at = now;
                Ok(WorkflowCommand::PauseWork {
                    duration_secs: self.base_duration_secs,
                })
            }
            _ => Err(self.invalid("pause")),
        }
    }

    ///
    /// # Errors
    /// Unless the timer is paused
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<WorkflowCommand, TicketingError> {
        match self.state {
            WorkState::Paused => {
                self.state = WorkState::Running { since: now };
                self.updated_at = now;
                Ok(WorkflowCommand::ResumeWork { resumed_at: now })
            }
            _ => Err(self.invalid("resume")),
        }
    }

    /// Freezes the duration and ends the work, from either running or paused
    ///
    /// # Errors
    /// If the work has not been started or is already finished
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<WorkflowCommand, TicketingError> {
        match self.state {
            WorkState::Running { since } => {
                self.base_duration_secs += seconds_between(since, now);
            }
            WorkState::Paused => {}
            WorkState::Idle | WorkState::Finished { .. } => return Err(self.invalid("finish")),
        }
        self.state = WorkState::Finished { at: now };
        self.updated_at = now;
        Ok(WorkflowCommand::FinishWork {
            finished_at: now,
            duration_secs: self.base_duration_secs,
        })
    }

    /// Accumulated duration plus the current running interval, if any
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        match self.state {
            WorkState::Running { since } => self.base_duration_secs + seconds_between(since, now),
            _ => self.base_duration_secs,
        }
    }

    #[must_use]
    pub fn elapsed_hms(&self, now: DateTime<Utc>) -> String {
        format_hms(self.elapsed_secs(now))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, WorkState::Running { .. })
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, WorkState::Finished { .. })
    }

    fn invalid(&self, action: &'static str) -> TicketingError {
        TicketingError::InvalidTransition {
            ticket_id: self.ticket_id,
            action,
            state: self.state.to_string(),
        }
    }
}

/// Ticket fields changed locally and not yet confirmed by the service.
/// Only the fields which are `Some` have been changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporarily_stopped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_finished: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<UserId>,
}

impl TicketPatch {
    #[must_use]
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// The work fields a timer transition changes
    #[must_use]
    pub fn from_command(command: &WorkflowCommand) -> Self {
        let mut patch = Self {
            status: command.target_status(),
            ..Default::default()
        };
        match command {
            WorkflowCommand::StartWork { started_at } => {
                patch.start_time = Some(*started_at);
                patch.temporarily_stopped = Some(false);
                patch.work_finished = Some(false);
            }
            WorkflowCommand::ResumeWork { resumed_at } => {
                patch.start_time = Some(*resumed_at);
                patch.temporarily_stopped = Some(false);
            }
            WorkflowCommand::PauseWork { duration_secs } => {
                patch.work_duration = Some(*duration_secs);
                patch.temporarily_stopped = Some(true);
            }
            WorkflowCommand::RecordDuration { duration_secs } => {
                patch.work_duration = Some(*duration_secs);
            }
            WorkflowCommand::FinishWork {
                finished_at,
                duration_secs,
            } => {
                patch.work_duration = Some(*duration_secs);
                patch.temporarily_stopped = Some(false);
                patch.work_finished = Some(true);
                patch.finish_time = Some(*finished_at);
            }
            WorkflowCommand::Resolve { report, .. } => {
                patch.work_finished = Some(true);
                patch.report = Some(report.trim().to_string());
            }
            WorkflowCommand::Refuse { .. } => {}
        }
        patch
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &TicketPatch::default()
    }

    /// Fields set in `newer` replace those of `self`
    pub fn merge(&mut self, newer: TicketPatch) {
        fn take<T>(field: &mut Option<T>, newer: Option<T>) {
            if newer.is_some() {
                *field = newer;
            }
        }
        take(&mut self.status, newer.status);
        take(&mut self.start_time, newer.start_time);
        take(&mut self.finish_time, newer.finish_time);
        take(&mut self.work_duration, newer.work_duration);
        take(&mut self.temporarily_stopped, newer.temporarily_stopped);
        take(&mut self.work_finished, newer.work_finished);
        take(&mut self.report, newer.report);
        take(&mut self.comment, newer.comment);
        take(&mut self.assigned_to_id, newer.assigned_to_id);
    }

    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(status) = &self.status {
            ticket.status = status.clone();
        }
        if self.start_time.is_some() {
            ticket.start_time = self.start_time;
        }
        if self.finish_time.is_some() {
            ticket.finish_time = self.finish_time;
        }
        if let Some(duration) = self.work_duration {
            ticket.work_duration = duration;
        }
        if let Some(stopped) = self.temporarily_stopped {
            ticket.temporarily_stopped = stopped;
        }
        if let Some(finished) = self.work_finished {
            ticket.work_finished = finished;
        }
        if self.report.is_some() {
            ticket.report.clone_from(&self.report);
        }
        if self.comment.is_some() {
            ticket.comment.clone_from(&self.comment);
        }
        if let Some(user_id) = self.assigned_to_id {
            if ticket.assigned_to_id != Some(user_id) {
                ticket.assigned_to = None;
            }
            ticket.assigned_to_id = Some(user_id);
        }
    }

    fn has_work(&self) -> bool {
        self.start_time.is_some()
            || self.finish_time.is_some()
            || self.work_duration.is_some()
            || self.temporarily_stopped.is_some()
            || self.work_finished.is_some()
    }

    /// The workflow body restoring the work fields of this patch on the service,
    /// together with the status they imply. `None` if no work field is set.
    #[must_use]
    pub fn work_payload(&self) -> Option<WorkflowPayload> {
        if !self.has_work() {
            return None;
        }
        Some(WorkflowPayload {
            status: self.status.clone(),
            start_time: self.start_time,
            work_duration: self.work_duration,
            temporarily_stopped: self.temporarily_stopped,
            work_finished: self.work_finished,
            finish_time: self.finish_time,
            report: None,
        })
    }

    /// The changes left once `sent` has been accepted by the service.
    ///
    /// A field is cleared only if `sent` carried the same value, so a field
    /// changed again in the meantime stays. The work fields only make sense
    /// together and are kept as a group while any of them is left.
    #[must_use]
    pub fn without(&self, sent: &TicketPatch) -> TicketPatch {
        fn rest<T: PartialEq + Clone>(mine: &Option<T>, sent: &Option<T>) -> Option<T> {
            if mine == sent {
                None
            } else {
                mine.clone()
            }
        }
        let mut left = TicketPatch {
            status: rest(&self.status, &sent.status),
            start_time: rest(&self.start_time, &sent.start_time),
            finish_time: rest(&self.finish_time, &sent.finish_time),
            work_duration: rest(&self.work_duration, &sent.work_duration),
            temporarily_stopped: rest(&self.temporarily_stopped, &sent.temporarily_stopped),
            work_finished: rest(&self.work_finished, &sent.work_finished),
            report: rest(&self.report, &sent.report),
            comment: rest(&self.comment, &sent.comment),
            assigned_to_id: rest(&self.assigned_to_id, &sent.assigned_to_id),
        };
        if left.has_work() {
            left.start_time = self.start_time;
            left.finish_time = self.finish_time;
            left.work_duration = self.work_duration;
            left.temporarily_stopped = self.temporarily_stopped;
            left.work_finished = self.work_finished;
        }
        left
    }
}

/// A locally cached ticket: the last copy received from the service plus the
/// local changes made on top of it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedTicket {
    pub id: TicketId,
    pub snapshot: Option<Ticket>,
    #[serde(default)]
    pub local: TicketPatch,
    /// When the local changes were last written
    pub local_modified_at: Option<DateTime<Utc>>,
    /// The `updatedAt` of the snapshot
    pub server_updated_at: Option<DateTime<Utc>>,
    /// The local changes have not been confirmed by the service
    #[serde(default)]
    pub pending: bool,
}

impl CachedTicket {
    #[must_use]
    pub fn new(id: TicketId) -> Self {
        Self {
            id,
            snapshot: None,
            local: TicketPatch::default(),
            local_modified_at: None,
            server_updated_at: None,
            pending: false,
        }
    }

    #[must_use]
    pub fn from_server(ticket: &Ticket) -> Self {
        Self {
            server_updated_at: ticket.updated_at,
            snapshot: Some(ticket.clone()),
            ..Self::new(ticket.id)
        }
    }

    /// Records local changes made at `at`
    pub fn merge(&mut self, patch: TicketPatch, at: DateTime<Utc>) {
        self.local.merge(patch);
        self.local_modified_at = Some(at);
        self.pending = true;
    }

    /// Marks `sent` as accepted by the service. The ticket sent back, if any,
    /// becomes the snapshot; otherwise `sent` is folded into the snapshot.
    /// Local changes `sent` did not carry stay pending on top of it.
    pub fn confirm(&mut self, sent: &TicketPatch, server: Option<&Ticket>) {
        match server {
            Some(ticket) => {
                self.snapshot = Some(ticket.clone());
                self.server_updated_at = ticket.updated_at;
            }
            None => {
                if let Some(snapshot) = self.snapshot.as_mut() {
                    sent.apply_to(snapshot);
                }
            }
        }
        self.local = self.local.without(sent);
        self.pending = !self.local.is_empty();
    }

    /// Pending local changes win over a server copy unless the server copy was
    /// modified after them. A server copy without a timestamp, or the very copy
    /// the changes were made on, never beats a pending change.
    #[must_use]
    pub fn local_wins_over(&self, server: &Ticket) -> bool {
        if !self.pending || self.local.is_empty() {
            return false;
        }
        if server.updated_at.is_some() && server.updated_at == self.server_updated_at {
            return true;
        }
        match (self.local_modified_at, server.updated_at) {
            (Some(local), Some(remote)) => local > remote,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// The ticket as it should be displayed: snapshot with the local changes applied
    #[must_use]
    pub fn view(&self) -> Option<Ticket> {
        let mut ticket = self.snapshot.clone()?;
        self.local.apply_to(&mut ticket);
        Some(ticket)
    }

    #[must_use]
    pub fn status(&self) -> Option<TicketStatus> {
        self.local
            .status
            .clone()
            .or_else(|| self.snapshot.as_ref().map(|t| t.status.clone()))
    }
}

/// How the ticket list is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Cards,
}

impl Display for ViewMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::List => write!(f, "list"),
            ViewMode::Cards => write!(f, "cards"),
        }
    }
}

impl FromStr for ViewMode {
    type Err = TicketingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "list" | "liste" | "table" => Ok(ViewMode::List),
            "cards" | "card" | "cartes" | "grid" => Ok(ViewMode::Cards),
            other => Err(TicketingError::BadInput(format!("unknown view mode '{other}'"))),
        }
    }
}

/// A failed request kept for troubleshooting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemRequest {
    pub id: Option<i64>,
    pub occurred_at: DateTime<Utc>,
    pub ticket_id: Option<TicketId>,
    pub action: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_pause_at_zero_elapsed_keeps_base() {
        let mut timer = WorkTimer {
            base_duration_secs: 120,
            ..WorkTimer::new(1, t0())
        };
        timer.start(t0()).unwrap();
        let cmd = timer.pause(t0()).unwrap();

        assert_eq!(timer.base_duration_secs, 120);
        assert_eq!(cmd, WorkflowCommand::PauseWork { duration_secs: 120 });
    }

    #[test]
    fn test_running_intervals_add_up() {
        let mut timer = WorkTimer {
            base_duration_secs: 10,
            ..WorkTimer::new(1, t0())
        };
        timer.start(t0()).unwrap();
        timer.pause(t0() + Duration::seconds(30)).unwrap();
        timer.resume(t0() + Duration::seconds(100)).unwrap();
        timer.pause(t0() + Duration::seconds(145)).unwrap();

        assert_eq!(timer.base_duration_secs, 10 + 30 + 45);
        assert_eq!(timer.elapsed_secs(t0() + Duration::hours(1)), 85);
    }

    #[test]
    fn test_elapsed_hms_after_65_seconds() {
        let mut timer = WorkTimer::new(7, t0());
        timer.start(t0()).unwrap();
        assert_eq!(timer.elapsed_hms(t0() + Duration::seconds(65)), "00:01:05");
    }

    #[test]
    fn test_illegal_transitions() {
        let mut timer = WorkTimer::new(3, t0());
        assert!(matches!(
            timer.pause(t0()),
            Err(TicketingError::InvalidTransition { action: "pause", .. })
        ));
        assert!(timer.resume(t0()).is_err());
        assert!(timer.finish(t0()).is_err());

        timer.start(t0()).unwrap();
        assert!(timer.start(t0()).is_err());
        timer.finish(t0() + Duration::seconds(5)).unwrap();
        assert!(timer.is_finished());
        assert!(timer.resume(t0()).is_err());
        assert_eq!(timer.elapsed_secs(t0() + Duration::hours(2)), 5);
    }

    #[test]
    fn test_finish_from_paused_keeps_duration() {
        let mut timer = WorkTimer::new(3, t0());
        timer.start(t0()).unwrap();
        timer.pause(t0() + Duration::seconds(40)).unwrap();
        let cmd = timer.finish(t0() + Duration::seconds(400)).unwrap();
        assert_eq!(
            cmd,
            WorkflowCommand::FinishWork {
                finished_at: t0() + Duration::seconds(400),
                duration_secs: 40
            }
        );
    }

    #[test]
    fn test_timer_from_ticket() {
        let ticket = Ticket {
            id: 9,
            status: TicketStatus::InProgress,
            start_time: Some(t0()),
            work_duration: 50,
            ..Default::default()
        };
        let timer = WorkTimer::from_ticket(&ticket, t0() + Duration::seconds(10));
        assert_eq!(timer.state, WorkState::Running { since: t0() });
        assert_eq!(timer.elapsed_secs(t0() + Duration::seconds(10)), 60);

        let paused = Ticket {
            temporarily_stopped: true,
            ..ticket
        };
        assert_eq!(WorkTimer::from_ticket(&paused, t0()).state, WorkState::Paused);
    }

    #[test]
    fn test_patch_merge_keeps_unset_fields() {
        let mut patch = TicketPatch::status(TicketStatus::Accepted);
        patch.merge(TicketPatch {
            comment: Some("vu".to_string()),
            ..Default::default()
        });
        assert_eq!(patch.status, Some(TicketStatus::Accepted));
        assert_eq!(patch.comment.as_deref(), Some("vu"));
    }

    #[test]
    fn test_confirmed_patch_leaves_other_changes_pending() {
        let comment = TicketPatch {
            comment: Some("vu".to_string()),
            ..Default::default()
        };
        let accept = TicketPatch::status(TicketStatus::Accepted);
        let mut cached = CachedTicket::from_server(&Ticket {
            id: 42,
            updated_at: Some(t0()),
            ..Default::default()
        });
        cached.merge(comment.clone(), t0());
        cached.merge(accept.clone(), t0());

        cached.confirm(&accept, None);
        assert!(cached.pending);
        assert_eq!(cached.local, comment);
        assert_eq!(cached.snapshot.as_ref().unwrap().status, TicketStatus::Accepted);

        let returned = Ticket {
            id: 42,
            status: TicketStatus::Accepted,
            updated_at: Some(t0() + Duration::seconds(3)),
            ..Default::default()
        };
        cached.confirm(&comment, Some(&returned));
        assert!(!cached.pending);
        assert!(cached.local.is_empty());
        assert_eq!(cached.server_updated_at, returned.updated_at);
    }

    #[test]
    fn test_changed_field_is_not_cleared_by_an_older_send() {
        let sent = TicketPatch {
            comment: Some("a".to_string()),
            ..Default::default()
        };
        let local = TicketPatch {
            comment: Some("a\nb".to_string()),
            ..Default::default()
        };
        assert_eq!(local.without(&sent), local);
        assert!(sent.without(&sent).is_empty());
    }

    #[test]
    fn test_work_fields_stay_pending_together() {
        let mut local = TicketPatch::from_command(&WorkflowCommand::StartWork { started_at: t0() });
        let pause = TicketPatch::from_command(&WorkflowCommand::PauseWork { duration_secs: 30 });
        local.merge(pause.clone());

        let left = local.without(&pause);
        assert_eq!(left, local);
        let payload = left.work_payload().unwrap();
        assert_eq!(payload.status, Some(TicketStatus::InProgress));
        assert_eq!(payload.start_time, Some(t0()));
        assert_eq!(payload.work_duration, Some(30));
        assert_eq!(payload.temporarily_stopped, Some(true));
        assert_eq!(payload.work_finished, Some(false));
    }

    #[test]
    fn test_work_payload_of_each_pending_combination() {
        let finished_at = t0() + Duration::seconds(90);
        let mut start_finish =
            TicketPatch::from_command(&WorkflowCommand::StartWork { started_at: t0() });
        start_finish.merge(TicketPatch::from_command(&WorkflowCommand::FinishWork {
            finished_at,
            duration_secs: 90,
        }));
        let payload = start_finish.work_payload().unwrap();
        assert_eq!(payload.status, Some(TicketStatus::InProgress));
        assert_eq!(payload.work_finished, Some(true));
        assert_eq!(payload.finish_time, Some(finished_at));
        assert_eq!(payload.temporarily_stopped, Some(false));

        let resumed =
            TicketPatch::from_command(&WorkflowCommand::ResumeWork { resumed_at: t0() });
        let payload = resumed.work_payload().unwrap();
        assert_eq!(payload.status, Some(TicketStatus::InProgress));
        assert_eq!(payload.work_duration, None);

        let autosaved =
            TicketPatch::from_command(&WorkflowCommand::RecordDuration { duration_secs: 12 });
        let payload = autosaved.work_payload().unwrap();
        assert_eq!(payload.status, None);
        assert_eq!(payload.work_duration, Some(12));

        assert!(TicketPatch::status(TicketStatus::Accepted).work_payload().is_none());
    }

    #[test]
    fn test_local_wins_only_when_newer() {
        let server = Ticket {
            id: 42,
            updated_at: Some(t0()),
            ..Default::default()
        };
        let mut cached = CachedTicket::from_server(&server);
        cached.merge(
            TicketPatch::status(TicketStatus::Accepted),
            t0() + Duration::seconds(1),
        );
        assert!(cached.local_wins_over(&server));

        let reverted = Ticket {
            updated_at: Some(t0() + Duration::seconds(2)),
            ..server
        };
        assert!(!cached.local_wins_over(&reverted));
        assert_eq!(cached.view().unwrap().status, TicketStatus::Accepted);
    }

    #[test]
    fn test_view_mode_parse() {
        assert_eq!("Cards".parse::<ViewMode>().unwrap(), ViewMode::Cards);
        assert_eq!("liste".parse::<ViewMode>().unwrap(), ViewMode::List);
        assert!("tiles".parse::<ViewMode>().is_err());
    }
}

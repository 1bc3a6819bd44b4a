//! Typed workflow commands.
//!
//! Every state transition of a ticket's work is sent to the service as one of the
//! [`WorkflowCommand`] variants. A command is validated before it leaves the client
//! and is then turned into the body the service expects.
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::status::TicketStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    Unresolved,
}

impl Resolution {
    #[must_use]
    pub fn status(self) -> TicketStatus {
        match self {
            Resolution::Resolved => TicketStatus::Resolved,
            Resolution::Unresolved => TicketStatus::Unresolved,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowCommand {
    StartWork {
        started_at: DateTime<Utc>,
    },
    PauseWork {
        duration_secs: u64,
    },
    /// Periodic save of the duration of a running timer
    RecordDuration {
        duration_secs: u64,
    },
    ResumeWork {
        resumed_at: DateTime<Utc>,
    },
    FinishWork {
        finished_at: DateTime<Utc>,
        duration_secs: u64,
    },
    Resolve {
        resolution: Resolution,
        report: String,
    },
    Refuse {
        reason: Option<String>,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum InvalidCommand {
    #[error("A resolution report is required")]
    EmptyReport,
    #[error("The refusal reason may not be blank")]
    BlankReason,
}

/// Body of `PATCH /tickets/{id}/workflow`
#[derive(Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporarily_stopped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_finished: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

/// Body of `PUT /tickets/{id}/refuse`
#[derive(Debug, Serialize, PartialEq)]
pub struct RefusePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WorkflowCommand {
    ///
    /// # Errors
    /// Returns the reason why the command may not be sent
    pub fn validate(&self) -> Result<(), InvalidCommand> {
        match self {
            WorkflowCommand::Resolve { report, .. } if report.trim().is_empty() => {
                Err(InvalidCommand::EmptyReport)
            }
            WorkflowCommand::Refuse {
                reason: Some(reason),
            } if reason.trim().is_empty() => Err(InvalidCommand::BlankReason),
            _ => Ok(()),
        }
    }

    /// The status a ticket is in once the command has been applied,
    /// `None` if the command does not change the status.
    #[must_use]
    pub fn target_status(&self) -> Option<TicketStatus> {
        match self {
            WorkflowCommand::StartWork { .. } | WorkflowCommand::ResumeWork { .. } => {
                Some(TicketStatus::InProgress)
            }
            WorkflowCommand::Resolve { resolution, .. } => Some(resolution.status()),
            WorkflowCommand::Refuse { .. } => Some(TicketStatus::Refused),
            WorkflowCommand::PauseWork { .. }
            | WorkflowCommand::RecordDuration { .. }
            | WorkflowCommand::FinishWork { .. } => None,
        }
    }

    /// Builds the workflow body. `Refuse` has its own endpoint and yields `None`.
    #[must_use]
    pub fn payload(&self) -> Option<WorkflowPayload> {
        let payload = match self {
            WorkflowCommand::StartWork { started_at } => WorkflowPayload {
                status: self.target_status(),
                start_time: Some(*started_at),
                temporarily_stopped: Some(false),
                work_finished: Some(false),
                ..Default::default()
            },
            WorkflowCommand::PauseWork { duration_secs } => WorkflowPayload {
                work_duration: Some(*duration_secs),
                temporarily_stopped: Some(true),
                ..Default::default()
            },
            WorkflowCommand::RecordDuration { duration_secs } => WorkflowPayload {
                work_duration: Some(*duration_secs),
                temporarily_stopped: Some(false),
                ..Default::default()
            },
            WorkflowCommand::ResumeWork { resumed_at } => WorkflowPayload {
                status: self.target_status(),
                start_time: Some(*resumed_at),
                temporarily_stopped: Some(false),
                ..Default::default()
            },
            WorkflowCommand::FinishWork {
                finished_at,
                duration_secs,
            } => WorkflowPayload {
                work_duration: Some(*duration_secs),
                temporarily_stopped: Some(false),
                work_finished: Some(true),
                finish_time: Some(*finished_at),
                ..Default::default()
            },
            WorkflowCommand::Resolve { report, .. } => WorkflowPayload {
                status: self.target_status(),
                work_finished: Some(true),
                report: Some(report.trim().to_string()),
                ..Default::default()
            },
            WorkflowCommand::Refuse { .. } => return None,
        };
        Some(payload)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowCommand::StartWork { .. } => "start",
            WorkflowCommand::PauseWork { .. } => "pause",
            WorkflowCommand::RecordDuration { .. } => "record",
            WorkflowCommand::ResumeWork { .. } => "resume",
            WorkflowCommand::FinishWork { .. } => "finish",
            WorkflowCommand::Resolve { .. } => "resolve",
            WorkflowCommand::Refuse { .. } => "refuse",
        }
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::core::{null_as_default, opt_timestamp, EntityRef, TicketId, UserId};
use super::status::TicketStatus;
use super::user::User;

/// Represents a ticket as held by the ticket service
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    #[serde(default, deserialize_with = "null_as_default", alias = "titre")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Free text, e.g. `HAUTE` or `Basse`
    pub priority: Option<String>,
    pub qualification: Option<String>,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default, with = "opt_timestamp", alias = "creationDate")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,

    // Work tracking
    #[serde(default, with = "opt_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "opt_timestamp")]
    pub finish_time: Option<DateTime<Utc>>,
    /// Accumulated work in seconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_duration: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temporarily_stopped: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub work_finished: bool,

    pub report: Option<String>,
    /// Newline delimited comment log
    #[serde(alias = "commentaire")]
    pub comment: Option<String>,
    #[serde(alias = "fichierJoint")]
    pub attachment: Option<String>,

    pub project_id: Option<i64>,
    pub project: Option<EntityRef>,
    pub category_id: Option<i64>,
    pub category: Option<EntityRef>,
    pub assigned_to_id: Option<UserId>,
    pub assigned_to: Option<User>,
}

impl Ticket {
    /// Lines of the free text comment log, oldest first
    pub fn comment_lines(&self) -> impl Iterator<Item = &str> {
        self.comment
            .as_deref()
            .unwrap_or("")
            .lines()
            .filter(|l| !l.trim().is_empty())
    }

    #[must_use]
    pub fn assignee_name(&self) -> Option<String> {
        self.assigned_to.as_ref().map(User::display_name)
    }
}

/// Body of `POST /tickets`
#[derive(Clone, Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// Partial update, `PATCH /tickets/{id}`. Only the fields set are sent.
#[derive(Clone, Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

impl TicketUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &TicketUpdate::default()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusBody<'a> {
    pub status: &'a TicketStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentBody<'a> {
    pub commentaire: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignBody {
    pub user_id: UserId,
}

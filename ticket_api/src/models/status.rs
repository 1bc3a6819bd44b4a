use std::collections::HashMap;
use std::fmt::{self, Formatter};

use lazy_static::lazy_static;
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use super::core::fold;

/// Workflow status of a ticket.
///
/// The ticket service is loose about how it spells a status: French labels with
/// or without accents, English upper case constants and English words all occur.
/// Every spelling is mapped onto one of the canonical values when a ticket is
/// deserialized, and only the canonical French label is ever written back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum TicketStatus {
    /// Ouvert
    #[default]
    Open,
    /// Accepté
    Accepted,
    /// Assigné
    Assigned,
    /// En cours
    InProgress,
    /// Résolu
    Resolved,
    /// Non résolu
    Unresolved,
    /// Refusé
    Refused,
    /// A spelling we do not know about, kept as received
    Other(String),
}

lazy_static! {
    static ref SYNONYMS: HashMap<&'static str, TicketStatus> = {
        let mut m = HashMap::new();
        for s in ["ouvert", "open", "opened", "nouveau", "new"] {
            m.insert(s, TicketStatus::Open);
        }
        for s in ["accepte", "accepted", "accept"] {
            m.insert(s, TicketStatus::Accepted);
        }
        for s in ["assigne", "assigned"] {
            m.insert(s, TicketStatus::Assigned);
        }
        for s in ["en cours", "encours", "in progress", "started", "running"] {
            m.insert(s, TicketStatus::InProgress);
        }
        for s in ["resolu", "resolved", "solved"] {
            m.insert(s, TicketStatus::Resolved);
        }
        for s in ["non resolu", "unresolved", "not resolved", "non resolved"] {
            m.insert(s, TicketStatus::Unresolved);
        }
        for s in ["refuse", "refused", "rejected"] {
            m.insert(s, TicketStatus::Refused);
        }
        m
    };
}

impl TicketStatus {
    /// Maps any known spelling onto its canonical status.
    /// Unknown input is kept verbatim in [`TicketStatus::Other`].
    #[must_use]
    pub fn normalize(raw: &str) -> TicketStatus {
        SYNONYMS
            .get(fold(raw).as_str())
            .cloned()
            .unwrap_or_else(|| TicketStatus::Other(raw.to_string()))
    }

    /// The canonical display label
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            TicketStatus::Open => "Ouvert",
            TicketStatus::Accepted => "Accepté",
            TicketStatus::Assigned => "Assigné",
            TicketStatus::InProgress => "En cours",
            TicketStatus::Resolved => "Résolu",
            TicketStatus::Unresolved => "Non résolu",
            TicketStatus::Refused => "Refusé",
            TicketStatus::Other(raw) => raw,
        }
    }

    /// No further work is expected on a ticket in a terminal status
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TicketStatus::Resolved | TicketStatus::Unresolved | TicketStatus::Refused
        )
    }

    /// All canonical statuses, in workflow order
    #[must_use]
    pub fn canonical() -> [TicketStatus; 7] {
        [
            TicketStatus::Open,
            TicketStatus::Accepted,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
            TicketStatus::Unresolved,
            TicketStatus::Refused,
        ]
    }
}

/// Returns the canonical display label for `raw`, or `raw` unchanged if it is not
/// a known spelling of any status.
#[must_use]
pub fn canonical_label(raw: &str) -> String {
    TicketStatus::normalize(raw).label().to_string()
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<&str> for TicketStatus {
    fn from(value: &str) -> Self {
        TicketStatus::normalize(value)
    }
}

impl Serialize for TicketStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TicketStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StatusVisitor;

        impl<'de> Visitor<'de> for StatusVisitor {
            type Value = TicketStatus;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a ticket status string")
            }

            fn visit_str<E>(self, value: &str) -> Result<TicketStatus, E>
            where
                E: de::Error,
            {
                Ok(TicketStatus::normalize(value))
            }

            // A ticket that has never been through the workflow may come without status
            fn visit_unit<E>(self) -> Result<TicketStatus, E>
            where
                E: de::Error,
            {
                Ok(TicketStatus::Open)
            }

            fn visit_none<E>(self) -> Result<TicketStatus, E>
            where
                E: de::Error,
            {
                Ok(TicketStatus::Open)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_spelling_maps_to_the_same_status() {
        for raw in ["ACCEPTED", "accepted", "Accepté", "ACCEPTÉ", " accepte "] {
            assert_eq!(TicketStatus::normalize(raw), TicketStatus::Accepted, "{raw}");
            assert_eq!(canonical_label(raw), "Accepté");
        }
        for raw in ["IN_PROGRESS", "En cours", "en-cours", "in progress"] {
            assert_eq!(TicketStatus::normalize(raw), TicketStatus::InProgress, "{raw}");
        }
        for raw in ["NON_RESOLU", "Non résolu", "UNRESOLVED"] {
            assert_eq!(TicketStatus::normalize(raw), TicketStatus::Unresolved, "{raw}");
        }
        assert_eq!(TicketStatus::normalize("OPEN"), TicketStatus::Open);
        assert_eq!(TicketStatus::normalize("Refusé"), TicketStatus::Refused);
        assert_eq!(TicketStatus::normalize("RESOLVED"), TicketStatus::Resolved);
        assert_eq!(TicketStatus::normalize("assigné"), TicketStatus::Assigned);
    }

    #[test]
    fn test_canonical_labels_are_fixed_points() {
        for status in TicketStatus::canonical() {
            assert_eq!(TicketStatus::normalize(status.label()), status);
        }
    }

    #[test]
    fn test_unknown_status_is_returned_unchanged() {
        assert_eq!(canonical_label("En attente client"), "En attente client");
        assert_eq!(
            TicketStatus::normalize("En attente client"),
            TicketStatus::Other("En attente client".to_string())
        );
    }

    #[test]
    fn test_serde() {
        let status: TicketStatus = serde_json::from_str(r#""RESOLVED""#).unwrap();
        assert_eq!(status, TicketStatus::Resolved);
        assert_eq!(serde_json::to_string(&status).unwrap(), r#""Résolu""#);

        let missing: TicketStatus = serde_json::from_str("null").unwrap();
        assert_eq!(missing, TicketStatus::Open);
    }

    #[test]
    fn test_terminal() {
        assert!(TicketStatus::Resolved.is_terminal());
        assert!(TicketStatus::Refused.is_terminal());
        assert!(!TicketStatus::InProgress.is_terminal());
    }
}

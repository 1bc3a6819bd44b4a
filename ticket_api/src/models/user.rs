use std::fmt::{self, Formatter};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::core::{fold, null_as_default, UserId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "prenom")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default", alias = "nom")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
}

impl User {
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// The role of a user decides which tickets are visible and which actions are allowed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Admin,
    /// Project manager: accepts, refuses and assigns the tickets of their projects
    ChefProjet,
    /// Assignee performing and timing the resolution work
    Collaborateur,
    /// Reporter of tickets
    #[default]
    Client,
}

impl Role {
    /// Parses the role names used by the ticket service, with or without a `ROLE_` prefix
    #[must_use]
    pub fn parse(raw: &str) -> Option<Role> {
        let folded = fold(raw);
        let name = folded.strip_prefix("role ").unwrap_or(&folded);
        match name {
            "admin" | "administrateur" | "administrator" => Some(Role::Admin),
            "chef projet" | "chef de projet" | "chefprojet" | "project manager" => {
                Some(Role::ChefProjet)
            }
            "collaborateur" | "collaborator" => Some(Role::Collaborateur),
            "client" | "user" | "utilisateur" => Some(Role::Client),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::ChefProjet => "CHEF_PROJET",
            Role::Collaborateur => "COLLABORATEUR",
            Role::Client => "CLIENT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Role::parse(&raw).ok_or_else(|| de::Error::custom(format!("unknown role '{raw}'")))
    }
}

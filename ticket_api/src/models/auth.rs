use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::core::opt_timestamp;
use super::user::User;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest<'a> {
    pub token: &'a str,
    pub new_password: &'a str,
}

/// Response of `/auth/login` and `/auth/refresh`
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
    /// The refresh endpoint may keep the current refresh token and omit it
    pub refresh_token: Option<String>,
    #[serde(default, with = "opt_timestamp", alias = "tokenExpiration")]
    pub expiration: Option<DateTime<Utc>>,
    pub user: Option<User>,
}

/// The authenticated session of the current user
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Option<User>,
}

impl Session {
    /// Creates a session from a login response.
    /// Returns `None` if the service did not hand out a refresh token.
    #[must_use]
    pub fn from_login(response: AuthResponse) -> Option<Session> {
        Some(Session {
            token: response.token,
            refresh_token: response.refresh_token?,
            expires_at: response.expiration,
            user: response.user,
        })
    }

    /// Applies a refresh response, keeping whatever the refresh did not replace
    #[must_use]
    pub fn renewed(&self, response: AuthResponse) -> Session {
        Session {
            token: response.token,
            refresh_token: response
                .refresh_token
                .unwrap_or_else(|| self.refresh_token.clone()),
            expires_at: response.expiration.or(self.expires_at),
            user: response.user.or_else(|| self.user.clone()),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewed_keeps_refresh_token_when_omitted() {
        let session = Session {
            token: "old".to_string(),
            refresh_token: "r1".to_string(),
            expires_at: None,
            user: None,
        };
        let renewed = session.renewed(AuthResponse {
            token: "new".to_string(),
            refresh_token: None,
            expiration: None,
            user: None,
        });
        assert_eq!(renewed.token, "new");
        assert_eq!(renewed.refresh_token, "r1");
    }

    #[test]
    fn test_login_without_refresh_token() {
        let response: AuthResponse = serde_json::from_str(r#"{"token": "t"}"#).unwrap();
        assert!(Session::from_login(response).is_none());
    }
}

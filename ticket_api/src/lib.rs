//!
//! `ticket_api` is a typed client of the ticket management REST service.
//!
//! All requests go through [`TicketApi::request`], which attaches the bearer token
//! of the current session, renews the session once when the service answers
//! `401 Unauthorized`, and retries idempotent requests failing with a transient error.
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use models::{
    auth::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RefreshRequest,
        ResetPasswordRequest, Session,
    },
    core::{TicketId, UserId},
    status::TicketStatus,
    ticket::{AssignBody, CommentBody, NewTicket, StatusBody, Ticket, TicketUpdate},
    workflow::{InvalidCommand, RefusePayload, WorkflowCommand, WorkflowPayload},
};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use session::{SessionStore, SessionStoreError};
use thiserror::Error;
use url::{ParseError, Url};

pub mod builder;
pub mod config;
pub mod models;
pub mod session;

pub use builder::TicketApiBuilder;

type Result<T> = std::result::Result<T, ApiError>;

const LOGIN: &str = "auth/login";
const REFRESH: &str = "auth/refresh";
const CHANGE_PASSWORD: &str = "auth/change-password";
const FORGOT_PASSWORD: &str = "auth/forgot-password";
const RESET_PASSWORD: &str = "auth/reset-password";

/// Resources reached without a bearer token
const PUBLIC_RESOURCES: [&str; 4] = [LOGIN, REFRESH, FORGOT_PASSWORD, RESET_PASSWORD];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authorized")]
    Unauthorized,
    #[error("The session has expired, please log in again")]
    SessionExpired,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Access denied")]
    Forbidden,
    #[error("Not found: '{0}'")]
    NotFound(String),
    #[error("Request rejected ({code}): {message}")]
    Fault { code: StatusCode, message: String },
    #[error("Server error ({code}): {message}")]
    Server { code: StatusCode, message: String },
    #[error("The request timed out")]
    Timeout,
    #[error("Internal error in reqwest library: {0}")]
    Request(reqwest::Error),
    #[error("Could not serialize/deserialize: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] ParseError),
    #[error("Invalid workflow command: {0}")]
    InvalidCommand(#[from] InvalidCommand),
    #[error(transparent)]
    SessionStore(#[from] SessionStoreError),
}

impl ApiError {
    /// Transient failures may succeed if the request is sent again later
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout | ApiError::Request(_) | ApiError::Server { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Request(error)
        }
    }
}

/// Error body of the ticket service, either field may be missing
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    fn describe(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                message: Some(m), ..
            }) => m,
            Ok(ErrorBody { error: Some(e), .. }) => e,
            _ => body.trim().to_string(),
        }
    }
}

/// Fixed count, fixed delay retry of idempotent requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Workflow bodies carry absolute values, so sending one twice has the same effect
/// as sending it once. Only resource creation is excluded from retries.
fn is_idempotent(method: &Method) -> bool {
    *method != Method::POST
}

fn requires_token(resource: &str) -> bool {
    !PUBLIC_RESOURCES.iter().any(|p| resource.starts_with(p))
}

#[derive(Clone)]
pub struct TicketApi {
    base: Url,
    client: Client,
    retry: RetryPolicy,
    sessions: Arc<dyn SessionStore>,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

impl std::fmt::Debug for TicketApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketApi")
            .field("base", &self.base.as_str())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl TicketApi {
    pub(crate) fn with_parts(
        base: Url,
        client: Client,
        retry: RetryPolicy,
        sessions: Arc<dyn SessionStore>,
    ) -> TicketApi {
        TicketApi {
            base,
            client,
            retry,
            sessions,
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// A client with its own request timeout, sharing the session store and
    /// the refresh coordination of `self`
    ///
    /// # Errors
    /// If the underlying HTTP client could not be created
    pub fn with_request_timeout(&self, timeout: Duration) -> Result<TicketApi> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(TicketApi {
            client,
            ..self.clone()
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    async fn request<D>(&self, method: Method, resource: &str, body: Option<Vec<u8>>) -> Result<D>
    where
        D: DeserializeOwned,
    {
        let (url, status, text) = self.exchange(method, resource, body).await?;
        Self::check(status, &text, &url)?;
        let data = if text.trim().is_empty() { "null" } else { &text };
        Ok(serde_json::from_str::<D>(data)?)
    }

    /// Like [`TicketApi::request`] but for resources whose response body is of no interest
    async fn request_no_content(
        &self,
        method: Method,
        resource: &str,
        body: Option<Vec<u8>>,
    ) -> Result<()> {
        let (url, status, text) = self.exchange(method, resource, body).await?;
        Self::check(status, &text, &url)
    }

    /// Sends the request, renewing the session and retrying once if the token was refused
    async fn exchange(
        &self,
        method: Method,
        resource: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(Url, StatusCode, String)> {
        let url = self.base.join(resource.trim_start_matches('/'))?;
        let authenticated = requires_token(resource);
        let token = if authenticated {
            let session = self.sessions.load()?.ok_or(ApiError::NotLoggedIn)?;
            Some(session.token)
        } else {
            None
        };

        let (status, text) = self
            .send_with_retry(&method, &url, body.as_deref(), token.as_deref())
            .await?;

        if status == StatusCode::UNAUTHORIZED && authenticated {
            info!("{method} {url} refused with 401, renewing the session");
            let renewed = self.refresh_session(token.as_deref()).await?;
            let (status, text) = self
                .send_with_retry(&method, &url, body.as_deref(), Some(&renewed))
                .await?;
            return Ok((url, status, text));
        }
        Ok((url, status, text))
    }

    async fn send_with_retry(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        token: Option<&str>,
    ) -> Result<(StatusCode, String)> {
        let attempts = if is_idempotent(method) {
            self.retry.attempts.max(1)
        } else {
            1
        };
        let mut attempt = 1;
        loop {
            let outcome = self.send_once(method, url, body, token).await;
            let transient = match &outcome {
                Ok((status, _)) => status.is_server_error(),
                Err(e) => e.is_transient(),
            };
            if !transient || attempt >= attempts {
                return outcome;
            }
            warn!("{method} {url} failed (attempt {attempt} of {attempts}), retrying");
            attempt += 1;
            tokio::time::sleep(self.retry.delay).await;
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        token: Option<&str>,
    ) -> Result<(StatusCode, String)> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }
        debug!("request {method} {url}");

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!("status {:?} body '{:?}'", status, text);
        Ok((status, text))
    }

    /// Obtains a new access token with the refresh token of the current session.
    ///
    /// Concurrent callers are serialised; a caller whose refused token has already
    /// been replaced by another caller reuses the replacement. If the service rejects
    /// the refresh, the session store is cleared.
    async fn refresh_session(&self, refused_token: Option<&str>) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        let Some(session) = self.sessions.load()? else {
            return Err(ApiError::SessionExpired);
        };
        if refused_token.is_some_and(|t| t != session.token) {
            debug!("Session already renewed by a concurrent request");
            return Ok(session.token);
        }

        let url = self.base.join(REFRESH)?;
        let body = serde_json::to_vec(&RefreshRequest {
            refresh_token: &session.refresh_token,
        })?;
        let renewed = match self.send_once(&Method::POST, &url, Some(&body), None).await {
            Ok((status, text)) if status.is_success() => {
                serde_json::from_str::<AuthResponse>(&text)
                    .ok()
                    .map(|auth| session.renewed(auth))
            }
            Ok((status, _)) => {
                warn!("Session refresh refused with {status}");
                None
            }
            Err(e) => {
                warn!("Session refresh failed: {e}");
                None
            }
        };

        if let Some(renewed) = renewed {
            self.sessions.save(&renewed)?;
            info!("Session renewed");
            Ok(renewed.token)
        } else {
            self.sessions.clear()?;
            Err(ApiError::SessionExpired)
        }
    }

    fn check(status: StatusCode, body: &str, url: &Url) -> Result<()> {
        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url.to_string())),
            client_err if client_err.is_client_error() => Err(ApiError::Fault {
                code: status,
                message: ErrorBody::describe(body),
            }),
            server_err if server_err.is_server_error() => Err(ApiError::Server {
                code: status,
                message: ErrorBody::describe(body),
            }),
            _ => Ok(()),
        }
    }

    async fn get<D>(&self, resource: &str) -> Result<D>
    where
        D: DeserializeOwned,
    {
        self.request::<D>(Method::GET, resource, None).await
    }

    async fn send<D, S>(&self, method: Method, resource: &str, body: &S) -> Result<D>
    where
        D: DeserializeOwned,
        S: Serialize,
    {
        let data = serde_json::to_vec(body)?;
        self.request::<D>(method, resource, Some(data)).await
    }

    // -----------------------
    // Tickets

    #[allow(clippy::missing_errors_doc)]
    pub async fn get_tickets(&self) -> Result<Vec<Ticket>> {
        self.get::<Vec<Ticket>>("tickets").await
    }

    /// Tickets reported by the current user
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_my_tickets(&self) -> Result<Vec<Ticket>> {
        self.get::<Vec<Ticket>>("tickets/mes-tickets").await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn get_assigned_tickets(&self, user_id: UserId) -> Result<Vec<Ticket>> {
        self.get::<Vec<Ticket>>(&format!("tickets/assigned/{user_id}"))
            .await
    }

    /// Tickets of the projects managed by `chef_projet_id`
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_chef_projet_tickets(&self, chef_projet_id: UserId) -> Result<Vec<Ticket>> {
        self.get::<Vec<Ticket>>(&format!("tickets/chef-projet/{chef_projet_id}"))
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn get_ticket(&self, id: TicketId) -> Result<Ticket> {
        self.get::<Ticket>(&format!("tickets/{id}")).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket> {
        self.send::<Ticket, _>(Method::POST, "tickets", ticket).await
    }

    /// Replaces the ticket. Returns the stored ticket if the service sends it back.
    #[allow(clippy::missing_errors_doc)]
    pub async fn update_ticket(&self, ticket: &Ticket) -> Result<Option<Ticket>> {
        self.send(Method::PUT, &format!("tickets/{}", ticket.id), ticket)
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn patch_ticket(&self, id: TicketId, update: &TicketUpdate) -> Result<Option<Ticket>> {
        self.send(Method::PATCH, &format!("tickets/{id}"), update)
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn delete_ticket(&self, id: TicketId) -> Result<()> {
        self.request_no_content(Method::DELETE, &format!("tickets/{id}"), None)
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn update_status(&self, id: TicketId, status: &TicketStatus) -> Result<Option<Ticket>> {
        self.send(
            Method::PATCH,
            &format!("tickets/{id}/status"),
            &StatusBody { status },
        )
        .await
    }

    /// Replaces the comment log of the ticket with `comments`
    #[allow(clippy::missing_errors_doc)]
    pub async fn update_comment(&self, id: TicketId, comments: &str) -> Result<Option<Ticket>> {
        self.send(
            Method::PATCH,
            &format!("tickets/{id}/comment"),
            &CommentBody {
                commentaire: comments,
            },
        )
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn assign(&self, id: TicketId, user_id: UserId) -> Result<Option<Ticket>> {
        self.send(
            Method::PATCH,
            &format!("tickets/{id}/assign"),
            &AssignBody { user_id },
        )
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn accept(&self, id: TicketId) -> Result<Option<Ticket>> {
        self.request(Method::PUT, &format!("tickets/{id}/accept"), None)
            .await
    }

    /// Validates and sends a workflow command.
    ///
    /// # Errors
    /// [`ApiError::InvalidCommand`] if the command does not validate, in which
    /// case nothing is sent, or any error of the underlying request.
    pub async fn send_workflow(
        &self,
        id: TicketId,
        command: &WorkflowCommand,
    ) -> Result<Option<Ticket>> {
        command.validate()?;
        debug!("Sending workflow command '{}' for ticket {id}", command.name());
        match command {
            WorkflowCommand::Refuse { reason } => {
                self.send(
                    Method::PUT,
                    &format!("tickets/{id}/refuse"),
                    &RefusePayload {
                        reason: reason.as_ref().map(|r| r.trim().to_string()),
                    },
                )
                .await
            }
            other => {
                let payload = other
                    .payload()
                    .ok_or(ApiError::InvalidCommand(InvalidCommand::EmptyReport))?;
                self.patch_workflow(id, &payload).await
            }
        }
    }

    /// Sends a workflow body as is, i.e. several transitions folded into one
    #[allow(clippy::missing_errors_doc)]
    pub async fn patch_workflow(
        &self,
        id: TicketId,
        payload: &WorkflowPayload,
    ) -> Result<Option<Ticket>> {
        self.send(Method::PATCH, &format!("tickets/{id}/workflow"), payload)
            .await
    }

    // -----------------------
    // Authentication

    /// Logs in and stores the new session
    ///
    /// # Errors
    /// [`ApiError::Unauthorized`] for bad credentials, or any request error
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .send::<AuthResponse, _>(Method::POST, LOGIN, &LoginRequest { email, password })
            .await?;
        let session = Session::from_login(response).ok_or_else(|| ApiError::Fault {
            code: StatusCode::OK,
            message: "login response without refresh token".to_string(),
        })?;
        self.sessions.save(&session)?;
        Ok(session)
    }

    /// Forgets the current session. The service keeps no server side session.
    ///
    /// # Errors
    /// If the session store could not be cleared
    pub fn logout(&self) -> Result<()> {
        self.sessions.clear()?;
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let body = serde_json::to_vec(&ChangePasswordRequest {
            current_password,
            new_password,
        })?;
        self.request_no_content(Method::POST, CHANGE_PASSWORD, Some(body))
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let body = serde_json::to_vec(&ForgotPasswordRequest { email })?;
        self.request_no_content(Method::POST, FORGOT_PASSWORD, Some(body))
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let body = serde_json::to_vec(&ResetPasswordRequest {
            token,
            new_password,
        })?;
        self.request_no_content(Method::POST, RESET_PASSWORD, Some(body))
            .await
    }
}

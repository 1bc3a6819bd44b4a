use crate::clock::Clock;
use crate::error::TicketingError;
use log::info;
use std::sync::Arc;
use ticket_api::models::auth::Session;
use ticket_api::models::user::User;
use ticket_api::session::SessionStore;
use ticket_api::TicketApi;

/// Owner of the session of the current user: tokens, expiry and user profile
pub struct SessionService {
    api: TicketApi,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(api: TicketApi, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { api, store, clock }
    }

    /// Logs in and keeps the new session
    #[allow(clippy::missing_errors_doc)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, TicketingError> {
        let session = self.api.login(email.trim(), password).await?;
        info!(
            "Logged in as {}",
            session
                .user
                .as_ref()
                .map_or_else(|| email.to_string(), User::display_name)
        );
        Ok(session)
    }

    /// Forgets every trace of the session
    #[allow(clippy::missing_errors_doc)]
    pub fn logout(&self) -> Result<(), TicketingError> {
        self.api.logout()?;
        info!("Logged out");
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn current_session(&self) -> Result<Option<Session>, TicketingError> {
        Ok(self.store.load()?)
    }

    /// The logged in user
    ///
    /// # Errors
    /// [`TicketingError::NotLoggedIn`] if there is no session or it holds no user
    pub fn current_user(&self) -> Result<User, TicketingError> {
        self.store
            .load()?
            .and_then(|s| s.user)
            .ok_or(TicketingError::NotLoggedIn)
    }

    /// True if the access token is known to have expired. It may still be
    /// renewed with the refresh token on the next request.
    #[allow(clippy::missing_errors_doc)]
    pub fn is_token_expired(&self) -> Result<bool, TicketingError> {
        Ok(self
            .store
            .load()?
            .is_some_and(|s| s.is_expired(self.clock.now())))
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), TicketingError> {
        if self.store.load()?.is_none() {
            return Err(TicketingError::NotLoggedIn);
        }
        Self::check_password(new_password)?;
        self.api
            .change_password(current_password, new_password)
            .await?;
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), TicketingError> {
        if !email.contains('@') {
            return Err(TicketingError::BadInput(format!(
                "'{email}' is not an email address"
            )));
        }
        self.api.forgot_password(email.trim()).await?;
        Ok(())
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), TicketingError> {
        Self::check_password(new_password)?;
        self.api.reset_password(token.trim(), new_password).await?;
        Ok(())
    }

    fn check_password(password: &str) -> Result<(), TicketingError> {
        if password.trim().is_empty() {
            return Err(TicketingError::BadInput(
                "the new password may not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

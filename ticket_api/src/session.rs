use std::sync::Mutex;

use thiserror::Error;

use crate::models::auth::Session;

#[derive(Error, Debug)]
#[error("Session store failure: {0}")]
pub struct SessionStoreError(pub String);

/// Storage of the current session (access token, refresh token, user).
///
/// The client reads the access token from the store before every authenticated
/// request, writes the renewed session after a token refresh and clears the store
/// when the refresh token is rejected.
pub trait SessionStore: Send + Sync {
    ///
    /// # Errors
    /// If the underlying storage could not be read
    fn load(&self) -> Result<Option<Session>, SessionStoreError>;

    ///
    /// # Errors
    /// If the underlying storage could not be written
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Removes every trace of the current session
    ///
    /// # Errors
    /// If the underlying storage could not be written
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// Keeps the session in memory only, for the lifetime of the process
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(session: Option<Session>) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let guard = self
            .session
            .lock()
            .map_err(|_| SessionStoreError("lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| SessionStoreError("lock poisoned".to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| SessionStoreError("lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

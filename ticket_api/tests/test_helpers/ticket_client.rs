use std::sync::Arc;

use ticket_api::models::auth::Session;
use ticket_api::session::{MemorySessionStore, SessionStore};
use ticket_api::{RetryPolicy, TicketApi};

/// A session as handed out by the login endpoint
pub fn test_session(token: &str) -> Session {
    Session {
        token: token.to_string(),
        refresh_token: "refresh-token".to_string(),
        expires_at: None,
        user: None,
    }
}

/// Creates a client talking to the mock server, without retries
pub fn create_ticket_client(url: &str, session: Option<Session>) -> (TicketApi, Arc<dyn SessionStore>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(session));
    let client = TicketApi::builder()
        .host(url)
        .retry(RetryPolicy::none())
        .session_store(store.clone())
        .build()
        .expect("Error initializing the ticket client");
    (client, store)
}

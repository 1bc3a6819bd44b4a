use mockito::{Mock, ServerGuard};
use std::sync::Arc;
use ticketing::clock::ManualClock;
use ticketing::config::AppConfiguration;
use ticketing::{error::TicketingError, ApplicationRuntime, ApplicationRuntimeBuilder};

use super::fixtures::{login_body, t0};

/// Configuration pointing at the mock server, without retries
pub fn test_config(url: &str) -> AppConfiguration {
    let mut config = AppConfiguration::default();
    config.server.api.url = url.to_string();
    config.server.api.retry_attempts = 1;
    config.server.api.retry_delay_ms = 0;
    config
}

/// Creates a test runtime with an in-memory database and a clock standing still at `t0()`
pub fn create_test_runtime(
    url: &str,
) -> Result<(Arc<ApplicationRuntime>, Arc<ManualClock>), TicketingError> {
    let _ = env_logger::builder().is_test(true).try_init();

    let clock = Arc::new(ManualClock::new(t0()));
    let runtime = ApplicationRuntimeBuilder::new()
        .with_config(test_config(url))
        .use_in_memory_db()
        .clock(clock.clone())
        .build()?;

    Ok((Arc::new(runtime), clock))
}

/// Mocks the login endpoint for a user with the given role name
pub async fn mock_login(server: &mut ServerGuard, user_id: i64, role: &str) -> Mock {
    server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_body(login_body(user_id, role))
        .create_async()
        .await
}

/// Creates a test runtime with an administrator logged in
pub async fn create_logged_in_runtime(
    server: &mut ServerGuard,
) -> Result<(Arc<ApplicationRuntime>, Arc<ManualClock>), TicketingError> {
    let (runtime, clock) = create_test_runtime(&server.url())?;
    let _login = mock_login(server, 1, "ADMIN").await;
    runtime
        .session_service()
        .login("admin@example.org", "secret")
        .await?;
    Ok((runtime, clock))
}

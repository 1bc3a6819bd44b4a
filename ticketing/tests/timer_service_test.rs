// ticketing/tests/timer_service_test.rs

use mockito::{Matcher, Server};
use ticket_api::models::status::TicketStatus;
use ticket_api::models::workflow::Resolution;
use ticketing::error::TicketingError;
use ticketing::types::WorkState;
use ticketing::ApplicationRuntimeBuilder;

mod test_helpers;
use test_helpers::common::{create_logged_in_runtime, create_test_runtime, test_config};
use test_helpers::fixtures::{t0, ticket_json, TEST_TICKET_ID};

/// Puts the server copy of the test ticket in the local cache
fn seed_ticket(runtime: &ticketing::ApplicationRuntime, status: &str) -> Result<(), TicketingError> {
    let ticket = serde_json::from_value(ticket_json(TEST_TICKET_ID, status))?;
    runtime.cache_service().store_server(&ticket)
}

#[tokio::test]
async fn test_start_pause_resume_finish() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let (runtime, clock) = create_logged_in_runtime(&mut server).await?;
    seed_ticket(&runtime, "Accepté")?;

    let start = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "status": "En cours",
            "temporarilyStopped": false,
            "workFinished": false
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let pause = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::Json(serde_json::json!({
            "workDuration": 65,
            "temporarilyStopped": true
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let timers = runtime.timer_service();
    let timer = timers.start(TEST_TICKET_ID).await?;
    assert_eq!(timer.state, WorkState::Running { since: t0() });

    clock.advance_secs(65);
    assert_eq!(timers.elapsed(TEST_TICKET_ID)?.hms, "00:01:05");

    let paused = timers.pause(TEST_TICKET_ID).await?;
    assert_eq!(paused.base_duration_secs, 65);
    start.assert_async().await;
    pause.assert_async().await;

    // Time spent paused is not counted
    clock.advance_secs(600);
    assert_eq!(timers.elapsed(TEST_TICKET_ID)?.secs, 65);

    let _rest = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .with_status(200)
        .create_async()
        .await;
    timers.resume(TEST_TICKET_ID).await?;
    clock.advance_secs(35);
    let finished = timers.finish(TEST_TICKET_ID).await?;
    assert_eq!(finished.base_duration_secs, 100);
    assert!(finished.is_finished());

    let ticket = runtime
        .cache_service()
        .get(TEST_TICKET_ID)?
        .and_then(|cached| cached.view())
        .unwrap();
    assert!(ticket.work_finished);
    assert_eq!(ticket.work_duration, 100);
    assert_eq!(ticket.status, TicketStatus::InProgress);
    Ok(())
}

#[tokio::test]
async fn test_background_save_failure_is_swallowed() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let (runtime, clock) = create_logged_in_runtime(&mut server).await?;

    let _down = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .with_status(503)
        .create_async()
        .await;

    let timers = runtime.timer_service();
    timers.start(TEST_TICKET_ID).await?;
    clock.advance_secs(30);
    let paused = timers.pause(TEST_TICKET_ID).await?;

    assert_eq!(paused.state, WorkState::Paused);
    let cached = runtime.cache_service().get(TEST_TICKET_ID)?.unwrap();
    assert!(cached.pending);
    assert_eq!(cached.local.temporarily_stopped, Some(true));

    let problems = runtime.problem_log().recent(10)?;
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].action, "pause");
    assert_eq!(problems[1].action, "start");
    Ok(())
}

#[tokio::test]
async fn test_illegal_transition_sends_nothing() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let (runtime, _clock) = create_test_runtime(&server.url())?;
    let never = server
        .mock("PATCH", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let result = runtime.timer_service().pause(TEST_TICKET_ID).await;
    assert!(matches!(
        result,
        Err(TicketingError::InvalidTransition { action: "pause", .. })
    ));
    never.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_resolve_requires_finished_work_and_a_report() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let (runtime, clock) = create_logged_in_runtime(&mut server).await?;
    seed_ticket(&runtime, "Accepté")?;
    let _workflow = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .with_status(200)
        .create_async()
        .await;

    let timers = runtime.timer_service();
    timers.start(TEST_TICKET_ID).await?;

    let blank = timers.resolve(TEST_TICKET_ID, Resolution::Resolved, "  ").await;
    assert!(matches!(blank, Err(TicketingError::Api(_))));

    let early = timers
        .resolve(TEST_TICKET_ID, Resolution::Resolved, "Toner remplacé")
        .await;
    assert!(matches!(
        early,
        Err(TicketingError::InvalidTransition { action: "resolve", .. })
    ));

    clock.advance_secs(300);
    timers.finish(TEST_TICKET_ID).await?;
    timers
        .resolve(TEST_TICKET_ID, Resolution::Resolved, "Toner remplacé")
        .await?;

    let cached = runtime.cache_service().get(TEST_TICKET_ID)?.unwrap();
    assert!(!cached.pending);
    assert_eq!(cached.status(), Some(TicketStatus::Resolved));
    assert_eq!(
        cached.view().and_then(|t| t.report).as_deref(),
        Some("Toner remplacé")
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_resolution_is_reverted() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let (runtime, clock) = create_logged_in_runtime(&mut server).await?;
    seed_ticket(&runtime, "Accepté")?;
    let _work = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::Regex("temporarilyStopped".to_string()))
        .with_status(200)
        .create_async()
        .await;
    let _resolve = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::Regex("report".to_string()))
        .with_status(409)
        .with_body(r#"{"error": "Ticket déjà clôturé"}"#)
        .create_async()
        .await;

    let timers = runtime.timer_service();
    timers.start(TEST_TICKET_ID).await?;
    clock.advance_secs(60);
    timers.finish(TEST_TICKET_ID).await?;

    let result = timers
        .resolve(TEST_TICKET_ID, Resolution::Unresolved, "Pièce manquante")
        .await;
    assert!(result.is_err());

    let cached = runtime.cache_service().get(TEST_TICKET_ID)?.unwrap();
    assert_eq!(cached.status(), Some(TicketStatus::InProgress));
    assert!(cached.local.report.is_none());
    assert_eq!(runtime.problem_log().recent(10)?[0].action, "resolve");
    Ok(())
}

#[tokio::test]
async fn test_timer_survives_restart() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let _workflow = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .with_status(200)
        .create_async()
        .await;
    let db = std::env::temp_dir().join(format!("tickets-timer-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&db);

    let clock = std::sync::Arc::new(ticketing::clock::ManualClock::new(t0()));
    {
        let runtime = ApplicationRuntimeBuilder::new()
            .with_config(test_config(&server.url()))
            .use_database(&db)
            .clock(clock.clone())
            .build()?;
        runtime.timer_service().start(TEST_TICKET_ID).await?;
    }

    clock.advance_secs(3 * 3600 + 5);
    let runtime = ApplicationRuntimeBuilder::new()
        .with_config(test_config(&server.url()))
        .use_database(&db)
        .clock(clock.clone())
        .build()?;
    let elapsed = runtime.timer_service().elapsed(TEST_TICKET_ID)?;
    assert_eq!(elapsed.hms, "03:00:05");

    drop(runtime);
    let _ = std::fs::remove_file(&db);
    Ok(())
}

#[tokio::test]
async fn test_autosave_sends_the_running_duration() -> Result<(), TicketingError> {
    let mut server = Server::new_async().await;
    let (runtime, clock) = create_logged_in_runtime(&mut server).await?;
    seed_ticket(&runtime, "Accepté")?;

    let _start = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::PartialJson(serde_json::json!({"status": "En cours"})))
        .with_status(200)
        .create_async()
        .await;
    let autosave = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::Json(serde_json::json!({
            "workDuration": 45,
            "temporarilyStopped": false
        })))
        .with_status(200)
        .expect(2)
        .create_async()
        .await;
    let pause = server
        .mock("PATCH", "/api/tickets/42/workflow")
        .match_body(Matcher::Json(serde_json::json!({
            "workDuration": 45,
            "temporarilyStopped": true
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let timers = runtime.timer_service();
    timers.start(TEST_TICKET_ID).await?;
    clock.advance_secs(45);

    assert!(timers.autosave(TEST_TICKET_ID).await?);
    assert_eq!(timers.autosave_all().await?, 1);
    autosave.assert_async().await;

    let cached = runtime.cache_service().get(TEST_TICKET_ID)?.unwrap();
    assert!(!cached.pending);
    assert_eq!(cached.view().unwrap().work_duration, 45);

    // A paused timer has nothing to save
    timers.pause(TEST_TICKET_ID).await?;
    pause.assert_async().await;
    assert!(!timers.autosave(TEST_TICKET_ID).await?);
    assert_eq!(timers.autosave_all().await?, 0);
    autosave.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_autosave_without_timer() -> Result<(), TicketingError> {
    let server = Server::new_async().await;
    let (runtime, _clock) = create_test_runtime(&server.url())?;

    let result = runtime.timer_service().autosave(TEST_TICKET_ID).await;
    assert!(matches!(result, Err(TicketingError::NoTimer(TEST_TICKET_ID))));
    assert_eq!(runtime.timer_service().autosave_all().await?, 0);
    Ok(())
}

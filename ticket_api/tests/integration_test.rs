mod test_helpers;

use mockito::{Matcher, Server};
use ticket_api::models::status::TicketStatus;
use ticket_api::session::SessionStore;
use ticket_api::ApiError;

use crate::test_helpers::ticket_client::{create_ticket_client, test_session};

#[tokio::test]
async fn test_statuses_are_normalized_on_load() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let _tickets = server
        .mock("GET", "/api/tickets")
        .with_status(200)
        .with_body(
            r#"[
                {"id": 1, "titre": "A", "status": "IN_PROGRESS"},
                {"id": 2, "titre": "B", "status": "en-cours"},
                {"id": 3, "titre": "C", "status": "Résolu"},
                {"id": 4, "titre": "D", "status": "En attente client"}
            ]"#,
        )
        .create_async()
        .await;

    let (client, _store) = create_ticket_client(&server.url(), Some(test_session("t1")));
    let tickets = client.get_tickets().await?;

    assert_eq!(tickets[0].status, TicketStatus::InProgress);
    assert_eq!(tickets[1].status, TicketStatus::InProgress);
    assert_eq!(tickets[2].status, TicketStatus::Resolved);
    assert_eq!(
        tickets[3].status,
        TicketStatus::Other("En attente client".to_string())
    );
    assert_eq!(tickets[3].status.label(), "En attente client");
    Ok(())
}

/// Two requests refused at the same time share a single token refresh
#[tokio::test]
async fn test_concurrent_401_refresh_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let _refused = server
        .mock("GET", Matcher::Regex(r"^/api/tickets/\d+$".to_string()))
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh")
        .with_status(200)
        .with_body(r#"{"token": "fresh"}"#)
        .expect(1)
        .create_async()
        .await;
    let _one = server
        .mock("GET", "/api/tickets/1")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_body(r#"{"id": 1, "titre": "A", "status": "Ouvert"}"#)
        .create_async()
        .await;
    let _two = server
        .mock("GET", "/api/tickets/2")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_body(r#"{"id": 2, "titre": "B", "status": "Ouvert"}"#)
        .create_async()
        .await;

    let (client, store) = create_ticket_client(&server.url(), Some(test_session("stale")));
    let (first, second) = tokio::join!(client.get_ticket(1), client.get_ticket(2));

    assert_eq!(first?.id, 1);
    assert_eq!(second?.id, 2);
    refresh.assert_async().await;

    let session = store.load()?.unwrap();
    assert_eq!(session.token, "fresh");
    assert_eq!(session.refresh_token, "refresh-token");
    Ok(())
}

#[tokio::test]
async fn test_not_logged_in() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = Server::new_async().await;
    let tickets = server
        .mock("GET", "/api/tickets/mes-tickets")
        .expect(0)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh")
        .expect(0)
        .create_async()
        .await;

    let (client, _store) = create_ticket_client(&server.url(), None);
    let result = client.get_my_tickets().await;

    assert!(matches!(result, Err(ApiError::NotLoggedIn)));
    tickets.assert_async().await;
    refresh.assert_async().await;
    Ok(())
}

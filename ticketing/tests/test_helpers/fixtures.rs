use chrono::{DateTime, TimeZone, Utc};

/// Constants for test data
pub const TEST_TICKET_ID: i64 = 42;

/// The instant every test clock starts at
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap()
}

/// A ticket as the service would send it, last updated an hour before `t0()`
pub fn ticket_json(id: i64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "titre": format!("Ticket {id}"),
        "description": "Imprimante en panne",
        "priority": "HAUTE",
        "status": status,
        "createdAt": "2024-05-01T08:00:00",
        "updatedAt": "2024-05-02T09:00:00",
        "workDuration": 0,
        "temporarilyStopped": false,
        "workFinished": false
    })
}

pub fn tickets_body(tickets: &[(i64, &str)]) -> String {
    serde_json::Value::Array(
        tickets
            .iter()
            .map(|(id, status)| ticket_json(*id, status))
            .collect(),
    )
    .to_string()
}

pub fn login_body(user_id: i64, role: &str) -> String {
    serde_json::json!({
        "token": "access-token",
        "refreshToken": "refresh-token",
        "user": {
            "id": user_id,
            "email": "user@example.org",
            "prenom": "Camille",
            "nom": "Durand",
            "role": role
        }
    })
    .to_string()
}

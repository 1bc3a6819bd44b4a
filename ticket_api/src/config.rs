use serde::{Deserialize, Serialize};

/// Connection parameters of the ticket service, as found in the `[server]` section
/// of the application configuration
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ApiClientConfiguration {
    /// Base url of the service, the `/api` prefix is appended by the client
    pub url: String,
    /// Timeout of foreground requests (loading lists, explicit actions)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout of background saves of the work timer
    #[serde(default = "default_background_timeout")]
    pub background_timeout_secs: u64,
    /// Number of attempts for idempotent requests failing with a transient error
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for ApiClientConfiguration {
    fn default() -> Self {
        ApiClientConfiguration {
            url: "http://localhost:8080".into(),
            request_timeout_secs: default_request_timeout(),
            background_timeout_secs: default_background_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_request_timeout() -> u64 {
    8
}

fn default_background_timeout() -> u64 {
    5
}

fn default_retry_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    500
}

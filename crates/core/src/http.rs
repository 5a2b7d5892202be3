use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{NotesError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared HTTP client; every request made through it is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("ytnotes/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}

/// Pull `error.message` out of a Google API error body.
pub fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

/// Consume a non-success response into a one-line description.
pub(crate) async fn failure_message(response: Response) -> (u16, String) {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    let message = upstream_message(&body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{status}: {}", body.trim())
        }
    });
    (status.as_u16(), message)
}

pub(crate) fn transport_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    }
}

/// Map a transport failure of a model call.
pub(crate) fn model_transport(err: reqwest::Error) -> NotesError {
    NotesError::ModelRequest(transport_error(err))
}

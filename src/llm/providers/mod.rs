pub mod ollama;
pub mod remote;

use crate::llm::LlmError;
use std::time::Duration;

/// HTTP client shared by the providers; the timeout bounds the whole request.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Connection(e.to_string()))
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(timeout.as_secs())
    } else {
        LlmError::Connection(err.to_string())
    }
}

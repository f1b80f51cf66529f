use aggmon_common::error::FetchError;
use reqwest::StatusCode;

/// Fold a reqwest transport error into the fixed failure taxonomy.
///
/// This is the single place transport failures are classified; callers
/// never inspect reqwest errors themselves. The original cause is logged
/// here since `FetchError` carries only the fixed message.
pub fn map_transport_error(err: &reqwest::Error) -> FetchError {
    tracing::debug!(error = %err, "API request failed");
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::ConnectionRefused
    } else if err.is_decode() {
        FetchError::InvalidPayload
    } else {
        FetchError::RequestFailed
    }
}

/// Classify a non-success HTTP status.
pub fn map_status(status: StatusCode) -> FetchError {
    match status {
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
        StatusCode::NOT_FOUND => FetchError::NotFound,
        _ => {
            tracing::debug!(status = %status, "API returned non-success status");
            FetchError::RequestFailed
        }
    }
}

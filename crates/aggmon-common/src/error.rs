/// Transport-level failures surfaced by the data-retrieval collaborators.
///
/// Each variant's display text is the short fixed message the check prints
/// when the failure terminates the invocation; transport detail is logged,
/// not carried.
///
/// # Examples
///
/// ```
/// use aggmon_common::error::FetchError;
///
/// assert_eq!(FetchError::Timeout.to_string(), "Connection timed out");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The API endpoint refused the connection.
    #[error("Connection refused")]
    ConnectionRefused,

    /// The configured per-call timeout elapsed.
    #[error("Connection timed out")]
    Timeout,

    /// The API rejected the supplied credentials.
    #[error("Missing or incorrect API credentials")]
    Unauthorized,

    /// Any other non-success HTTP response.
    #[error("Request failed")]
    RequestFailed,

    /// The response body could not be decoded.
    #[error("API returned invalid JSON")]
    InvalidPayload,

    /// The requested resource does not exist.
    #[error("Resource not found")]
    NotFound,
}

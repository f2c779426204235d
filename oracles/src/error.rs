use thiserror::Error;

/// Failure to obtain an answer from an external collaborator.
///
/// A definitive "no" (proof rejected, balance zero, not finalized) is never
/// an error; these variants all mean "the question went unanswered".
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("node returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl OracleError {
    /// Classify a transport error from `reqwest`.
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OracleError::Timeout(e.to_string())
        } else if e.is_connect() {
            OracleError::Unreachable(format!("connection failed: {e}"))
        } else {
            OracleError::RequestFailed(e.to_string())
        }
    }
}

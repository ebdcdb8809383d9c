//! Solver client error types.

/// Errors from the solver HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// Request failed (connection refused, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The solver answered with a status other than 200
    #[error("solver returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body is not a valid response document
    #[error("failed to parse solver response: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },
}

use thiserror::Error;

/// Errors returned by the Company-Currency Gateway client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Connection or protocol failure.
    #[error("Gateway transport failure: {0}")]
    Transport(String),

    #[error("Gateway request timed out")]
    Timeout,

    /// Non-success HTTP status without a usable body.
    #[error("Gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The gateway answered with a body that could not be read.
    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway call cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

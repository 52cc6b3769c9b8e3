use ledgerflow_core::EngineError;
use thiserror::Error;

/// Error type for the SDK proxy client
#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP request could not be sent or the response not read
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The proxy answered with a non-success HTTP status
    #[error("Unexpected HTTP status {status}: {body}")]
    Status {
        /// The HTTP status code
        status: u16,
        /// The response body, for diagnostics
        body: String,
    },

    /// The proxy reported a domain failure
    #[error("Proxy error: {0}")]
    Api(String),

    /// The response body could not be decoded
    #[error("Response decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<ClientError> for EngineError {
    fn from(err: ClientError) -> Self {
        EngineError::StepExecution(err.to_string())
    }
}

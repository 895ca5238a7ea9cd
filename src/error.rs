// Error types shared by the library modules.
// - `ApiError` covers every HTTP exchange with the provider.
// - `OAuthError` covers the handshake (listener, token responses).
// - `StoreError` covers writes to the cached token file.
// The command layer wraps these in `anyhow::Error` with extra context.

use std::path::PathBuf;
use std::time::Duration;

/// Failure while talking to the Splitwise API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid URL for endpoint `{endpoint}`: {source}")]
    Url {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status code for {endpoint}: {status} - {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} was rejected by the server: {errors}")]
    Rejected { endpoint: String, errors: String },
}

impl ApiError {
    /// HTTP status code, when the failure was an unexpected response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure during the OAuth 1.0a handshake.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("could not start callback listener on port {port}: {reason}")]
    Bind { port: u16, reason: String },

    #[error("token response is missing `{0}`")]
    MissingField(&'static str),

    #[error("no authorization received within {}s", .0.as_secs())]
    CallbackTimeout(Duration),

    #[error("callback listener stopped before receiving a verifier")]
    ListenerClosed,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failure while persisting the access token.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),
}

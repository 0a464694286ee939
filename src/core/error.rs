//! Error taxonomy for fetching and merging price data

use thiserror::Error;

/// Failures raised while talking to the remote price source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Client error with status code {code}: {body}")]
    ClientError { code: u16, body: String },

    /// Status code 0 stands for a transport failure with no known status.
    #[error("Server error with status code {code}: {body}")]
    ServerError { code: u16, body: String },

    #[error("Network connectivity issue: {0}")]
    Connectivity(String),

    #[error("The server returned an unknown response type")]
    MalformedResponse,
}

impl TransportError {
    pub fn unknown() -> Self {
        TransportError::ServerError {
            code: 0,
            body: "No data provided.".to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to decode the response: {0}")]
    Decoding(String),

    #[error("No valid price data found")]
    EmptyResult,
}

/// Whether retrying an operation could plausibly change its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

/// Default classifier: 5xx, unknown transport failures and lost connectivity
/// are worth retrying, everything else is not.
pub fn classify(error: &SyncError) -> ErrorClass {
    match error {
        SyncError::Transport(TransportError::ServerError { .. })
        | SyncError::Transport(TransportError::Connectivity(_)) => ErrorClass::Transient,
        SyncError::Transport(_) | SyncError::Decoding(_) | SyncError::EmptyResult => {
            ErrorClass::Permanent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let transient = [
            TransportError::ServerError {
                code: 503,
                body: String::new(),
            },
            TransportError::unknown(),
            TransportError::Connectivity("connection reset".to_string()),
        ];
        for err in transient {
            assert_eq!(classify(&err.into()), ErrorClass::Transient);
        }

        let permanent: Vec<SyncError> = vec![
            TransportError::InvalidRequest("bad url".to_string()).into(),
            TransportError::ClientError {
                code: 429,
                body: String::new(),
            }
            .into(),
            TransportError::MalformedResponse.into(),
            SyncError::Decoding("missing field `prices`".to_string()),
            SyncError::EmptyResult,
        ];
        for err in permanent {
            assert_eq!(classify(&err), ErrorClass::Permanent, "{err}");
        }
    }

    #[test]
    fn test_messages_carry_status_code() {
        let err: SyncError = TransportError::ServerError {
            code: 500,
            body: "oops".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Server error with status code 500: oops");
    }
}

use crate::response::RemoteResponse;
use http::StatusCode;

/// Failure of a remote operation.
///
/// Whenever a response was received it is carried along, so callers can feed
/// its rate-limit headers to the budget before acting on the error.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The server answered with a non-success status the operation does not
    /// map to a domain value.
    #[error("{operation} failed with status {}", .response.status())]
    Status {
        /// Operation label, e.g. `repo.get`.
        operation: &'static str,
        /// The response surface, headers included.
        response: RemoteResponse,
    },
    /// The exchange failed below the HTTP layer.
    #[error("{operation} transport failure: {message}")]
    Transport {
        /// Operation label.
        operation: &'static str,
        /// Transport error description.
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("{operation} returned a malformed payload: {message}")]
    Decode {
        /// Operation label.
        operation: &'static str,
        /// Decode error description.
        message: String,
        /// The response surface, when the exchange completed.
        response: Option<RemoteResponse>,
    },
}

impl RemoteError {
    /// The response surface, when one was received.
    pub fn response(&self) -> Option<&RemoteResponse> {
        match self {
            Self::Status { response, .. } => Some(response),
            Self::Transport { .. } => None,
            Self::Decode { response, .. } => response.as_ref(),
        }
    }

    /// The response status, when one was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(RemoteResponse::status)
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

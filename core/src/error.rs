//! Error types for the GraphQL client.
//!
//! # Design
//! Every local failure lands in one `ClientError` enum, grouped by
//! [`ErrorKind`] into the three families a caller has to tell apart:
//! argument validation (raised at the builder call site, before any network
//! access), transport (the exchange itself failed, including any non-200
//! status) and decode (the body or a typed extraction could not be read).
//!
//! Errors reported by the GraphQL server are not here. They are data on
//! [`Response`](crate::Response) and never abort a call.

use thiserror::Error;

/// Boxed cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by the builder chain, `invoke()` and typed extraction.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A builder received a malformed URI or a non-positive timeout.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server answered with a status other than 200.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The exchange failed before a status was received: connection
    /// refused, timeout elapsed, proxy unreachable.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// The response body, or a value inside it, could not be decoded.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request envelope or a variable could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A typed extraction named a field the data object does not carry.
    #[error("field `{0}` not found in response data")]
    FieldNotFound(String),

    /// A typed extraction was attempted on a response without data.
    #[error("response carries no data")]
    NoData,
}

/// The family a [`ClientError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Transport,
    Decode,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidArgument(_) | ClientError::SerializationError(_) => {
                ErrorKind::Argument
            }
            ClientError::HttpError { .. } | ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::DeserializationError(_)
            | ClientError::FieldNotFound(_)
            | ClientError::NoData => ErrorKind::Decode,
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(err: impl Into<BoxError>) -> Self {
        ClientError::Transport(err.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ClientError::InvalidArgument(msg.into())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::DeserializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_is_transport_and_carries_status() {
        let err = ClientError::HttpError {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn decode_family() {
        assert_eq!(ClientError::NoData.kind(), ErrorKind::Decode);
        assert_eq!(ClientError::FieldNotFound("person".into()).kind(), ErrorKind::Decode);
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::DeserializationError(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn invalid_argument_is_argument_kind() {
        let err = ClientError::invalid("Illegal URI target value: 123");
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.to_string(), "invalid argument: Illegal URI target value: 123");
    }
}

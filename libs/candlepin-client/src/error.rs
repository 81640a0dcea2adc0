//! Client error types.

use candlepin_http::{HttpError, StatusCode};
use thiserror::Error;

/// Error type for Candlepin client operations.
///
/// Validation variants are raised before any network I/O. An HTTP error
/// status is never an error by itself; it only becomes
/// [`ClientError::UnexpectedStatus`] when the caller asks for the content of
/// a successful response.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    /// Supplied option keys the operation does not declare
    #[error("unknown parameter(s): {}", .keys.join(", "))]
    UnknownParameter { keys: Vec<String> },

    /// Required options that are null or failed their check
    #[error("missing or invalid value for parameter(s): {}", .keys.join(", "))]
    MissingRequiredParameter { keys: Vec<String> },

    /// Keys requested from an option set that does not contain them
    #[error("missing key(s): {}", .keys.join(", "))]
    MissingKey { keys: Vec<String> },

    /// Conflicting or malformed constructor/operation arguments
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Transport field absent when the connection was built
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Response status outside 2xx where a success was required
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// Response body did not have the expected shape
    #[error("cannot decode response: {0}")]
    Decode(String),

    /// Transport-level failure (refused, TLS, timeout, ...)
    #[error(transparent)]
    Http(HttpError),
}

impl From<HttpError> for ClientError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Configuration(msg) => ClientError::Configuration(msg),
            other => ClientError::Http(other),
        }
    }
}

impl ClientError {
    pub(crate) fn unknown<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClientError::UnknownParameter {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn missing_required<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClientError::MissingRequiredParameter {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_parameter_lists_all_keys() {
        let err = ClientError::unknown(["bogus", "other"]);
        assert_eq!(err.to_string(), "unknown parameter(s): bogus, other");
    }

    #[test]
    fn test_transport_configuration_becomes_client_configuration() {
        let err: ClientError =
            HttpError::Configuration("client certificate authentication requires private_key".into())
                .into();
        assert!(matches!(err, ClientError::Configuration(ref msg) if msg.contains("private_key")));
    }

    #[test]
    fn test_other_transport_errors_are_wrapped() {
        let err: ClientError = HttpError::Timeout(std::time::Duration::from_secs(3)).into();
        assert!(matches!(err, ClientError::Http(HttpError::Timeout(_))));
    }
}

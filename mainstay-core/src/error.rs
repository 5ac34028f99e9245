//! Transport failures and the closed error taxonomy.
//!
//! Every terminal failure in the pipeline is normalized into exactly one
//! [`ErrorKind`]. The mapping is total: any transport failure and any HTTP
//! status code has exactly one kind, with [`ErrorKind::UnexpectedError`] as
//! the fallback for unmapped codes.

use http::StatusCode;
use thiserror::Error;

/// A failure raised by the transport layer.
///
/// The pipeline does not define transport internals; implementations of
/// [`Upstream`](crate::Upstream) surface their failures through this enum
/// so the retry stage can classify them without knowing the transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established in time.
    #[error("connection timed out")]
    ConnectTimeout,
    /// Request body could not be sent in time.
    #[error("request send timed out")]
    SendTimeout,
    /// Response was not received in time.
    #[error("response receive timed out")]
    ReceiveTimeout,
    /// TLS certificate validation failed.
    #[error("bad server certificate")]
    BadCertificate,
    /// The request was cancelled at a suspension point.
    #[error("request cancelled")]
    Cancelled,
    /// No network connectivity.
    #[error("no internet connection")]
    Offline,
    /// The server could not be reached.
    #[error("server unreachable: {0}")]
    Unreachable(String),
    /// Any other transport failure.
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns true for transient conditions eligible for backoff retry.
    ///
    /// Timeouts and unreachable-server failures are transient; cancellation,
    /// certificate problems, and confirmed offline state are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectTimeout
                | TransportError::SendTimeout
                | TransportError::ReceiveTimeout
                | TransportError::Unreachable(_)
        )
    }
}

/// The closed taxonomy every terminal failure maps into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Connection could not be established in time.
    ConnectionTimeout,
    /// Request could not be sent in time.
    SendTimeout,
    /// Response was not received in time.
    ReceiveTimeout,
    /// TLS certificate validation failed.
    BadCertificate,
    /// The request was cancelled.
    RequestCancelled,
    /// No network connectivity was available.
    NoInternetConnection,
    /// The server could not be reached.
    ServerUnreachable,
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 409.
    Conflict,
    /// HTTP 422.
    ValidationFailed,
    /// HTTP 429.
    TooManyRequests,
    /// HTTP 500, and the fallback for unmapped 5xx codes.
    InternalServerError,
    /// HTTP 502.
    BadGateway,
    /// HTTP 503.
    ServiceUnavailable,
    /// HTTP 504.
    GatewayTimeout,
    /// Fallback for anything unmapped.
    UnexpectedError,
}

impl ErrorKind {
    /// Maps an HTTP status code to its kind.
    ///
    /// Total over all status codes: specifically-mapped codes get their own
    /// kind, other 5xx codes fall back to
    /// [`ErrorKind::InternalServerError`], and everything else falls back
    /// to [`ErrorKind::UnexpectedError`].
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ErrorKind::BadRequest,
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::ValidationFailed,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::TooManyRequests,
            StatusCode::INTERNAL_SERVER_ERROR => ErrorKind::InternalServerError,
            StatusCode::BAD_GATEWAY => ErrorKind::BadGateway,
            StatusCode::SERVICE_UNAVAILABLE => ErrorKind::ServiceUnavailable,
            StatusCode::GATEWAY_TIMEOUT => ErrorKind::GatewayTimeout,
            status if status.is_server_error() => ErrorKind::InternalServerError,
            _ => ErrorKind::UnexpectedError,
        }
    }

    /// Maps a transport failure to its kind.
    pub fn from_transport(error: &TransportError) -> Self {
        match error {
            TransportError::ConnectTimeout => ErrorKind::ConnectionTimeout,
            TransportError::SendTimeout => ErrorKind::SendTimeout,
            TransportError::ReceiveTimeout => ErrorKind::ReceiveTimeout,
            TransportError::BadCertificate => ErrorKind::BadCertificate,
            TransportError::Cancelled => ErrorKind::RequestCancelled,
            TransportError::Offline => ErrorKind::NoInternetConnection,
            TransportError::Unreachable(_) => ErrorKind::ServerUnreachable,
            TransportError::Other(_) => ErrorKind::UnexpectedError,
        }
    }

    /// A generic human-readable message for the kind.
    ///
    /// Used when no message could be extracted from a response body. Never
    /// a raw transport-internal string.
    pub const fn generic_message(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionTimeout => "The connection timed out. Please try again.",
            ErrorKind::SendTimeout => "The request took too long to send. Please try again.",
            ErrorKind::ReceiveTimeout => "The server took too long to respond. Please try again.",
            ErrorKind::BadCertificate => "A secure connection could not be established.",
            ErrorKind::RequestCancelled => "The request was cancelled.",
            ErrorKind::NoInternetConnection => "No internet connection. Check your network.",
            ErrorKind::ServerUnreachable => "The server could not be reached.",
            ErrorKind::BadRequest => "The request was invalid.",
            ErrorKind::Unauthorized => "You are not signed in or your session has expired.",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::Conflict => "The request conflicts with the current state.",
            ErrorKind::ValidationFailed => "Some of the submitted data was invalid.",
            ErrorKind::TooManyRequests => "Too many requests. Please slow down.",
            ErrorKind::InternalServerError => "The server encountered an internal error.",
            ErrorKind::BadGateway => "The server received an invalid upstream response.",
            ErrorKind::ServiceUnavailable => "The service is temporarily unavailable.",
            ErrorKind::GatewayTimeout => "The upstream server timed out.",
            ErrorKind::UnexpectedError => "An unexpected error occurred.",
        }
    }
}

/// A terminal, normalized failure returned to the caller.
///
/// Carries the [`ErrorKind`], a human-readable message (extracted from the
/// response body when possible, otherwise the kind's generic message), an
/// optional structured detail payload, and the underlying status code when
/// the failure came from an HTTP response. Never retried once constructed.
#[derive(Debug, Clone, Error)]
#[error("{message} ({kind:?})")]
pub struct ErrorRecord {
    /// Taxonomy kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Optional structured payload extracted from the response body.
    pub detail: Option<serde_json::Value>,
    /// Underlying HTTP status, when the failure came from a response.
    pub status: Option<StatusCode>,
}

impl ErrorRecord {
    /// Creates a record with the kind's generic message.
    pub fn new(kind: ErrorKind) -> Self {
        ErrorRecord {
            kind,
            message: kind.generic_message().to_string(),
            detail: None,
            status: None,
        }
    }

    /// Overrides the human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attaches a structured detail payload.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Attaches the underlying status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_status_mappings() {
        let cases = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Forbidden),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (422, ErrorKind::ValidationFailed),
            (429, ErrorKind::TooManyRequests),
            (500, ErrorKind::InternalServerError),
            (502, ErrorKind::BadGateway),
            (503, ErrorKind::ServiceUnavailable),
            (504, ErrorKind::GatewayTimeout),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ErrorKind::from_status(status), kind, "status {code}");
        }
    }

    #[test]
    fn unmapped_5xx_falls_back_to_internal_server_error() {
        for code in [501, 505, 507, 511] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(
                ErrorKind::from_status(status),
                ErrorKind::InternalServerError
            );
        }
    }

    #[test]
    fn status_mapping_is_total() {
        // Every representable status code maps to exactly one kind.
        for code in 100..=999 {
            if let Ok(status) = StatusCode::from_u16(code) {
                let _ = ErrorKind::from_status(status);
            }
        }
    }

    #[test]
    fn transport_mapping_is_total() {
        let cases = [
            (TransportError::ConnectTimeout, ErrorKind::ConnectionTimeout),
            (TransportError::SendTimeout, ErrorKind::SendTimeout),
            (TransportError::ReceiveTimeout, ErrorKind::ReceiveTimeout),
            (TransportError::BadCertificate, ErrorKind::BadCertificate),
            (TransportError::Cancelled, ErrorKind::RequestCancelled),
            (TransportError::Offline, ErrorKind::NoInternetConnection),
            (
                TransportError::Unreachable("dns".into()),
                ErrorKind::ServerUnreachable,
            ),
            (
                TransportError::Other("boom".into()),
                ErrorKind::UnexpectedError,
            ),
        ];
        for (error, kind) in cases {
            assert_eq!(ErrorKind::from_transport(&error), kind, "{error}");
        }
    }

    #[test]
    fn retryable_transport_errors() {
        assert!(TransportError::ConnectTimeout.is_retryable());
        assert!(TransportError::SendTimeout.is_retryable());
        assert!(TransportError::ReceiveTimeout.is_retryable());
        assert!(TransportError::Unreachable("refused".into()).is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::BadCertificate.is_retryable());
        assert!(!TransportError::Offline.is_retryable());
        assert!(!TransportError::Other("boom".into()).is_retryable());
    }

    #[test]
    fn record_display_uses_message() {
        let record = ErrorRecord::new(ErrorKind::NotFound).with_status(StatusCode::NOT_FOUND);
        assert!(record.to_string().contains("not found"));
    }
}

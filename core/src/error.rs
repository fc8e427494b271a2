//! Error taxonomy for the search client.
//!
//! # Design
//! Every failure a caller can observe is a `RequestError` tagged with an
//! `ErrorKind`. The kind alone decides the retry policy through
//! `ErrorKind::category` and the user-facing text through
//! `ErrorKind::message`; no other part of the crate makes either decision.
//! The originating request travels with the error, while the response and the
//! underlying cause are kept for diagnostics only and take no part in
//! equality.
//!
//! Setup problems that happen before any request exists (bad base URL,
//! unreadable config, missing runtime) are reported through `Error` instead.

use std::fmt;
use std::sync::Arc;

use crate::http::{HttpRequest, ResponseDescriptor};

/// Discriminant identifying why a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Security,
    BadRequest,
    ConnectionLost,
    DeviceOffline,
    DnsLookupFailed,
    ResourceNotFound,
    UrlParsing,
    CallCancelled,
    Unauthorized,
    DecodingFailed,
    EncodingFailed,
    MalformedData,
    TimedOut,
    ServerUnavailable,
    ServerCertificate,
    Unknown,
    UrlResponse,
}

/// Coarse recovery classification derived from an `ErrorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Retryable,
    NonRetryable,
    RequiresLogout,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 17] = [
        ErrorKind::Security,
        ErrorKind::BadRequest,
        ErrorKind::ConnectionLost,
        ErrorKind::DeviceOffline,
        ErrorKind::DnsLookupFailed,
        ErrorKind::ResourceNotFound,
        ErrorKind::UrlParsing,
        ErrorKind::CallCancelled,
        ErrorKind::Unauthorized,
        ErrorKind::DecodingFailed,
        ErrorKind::EncodingFailed,
        ErrorKind::MalformedData,
        ErrorKind::TimedOut,
        ErrorKind::ServerUnavailable,
        ErrorKind::ServerCertificate,
        ErrorKind::Unknown,
        ErrorKind::UrlResponse,
    ];

    /// Retry policy for this kind.
    ///
    /// `CallCancelled` counts as retryable even though the caller initiated
    /// it.
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorKind::ConnectionLost
            | ErrorKind::DeviceOffline
            | ErrorKind::CallCancelled
            | ErrorKind::DnsLookupFailed
            | ErrorKind::TimedOut
            | ErrorKind::Unknown
            | ErrorKind::ServerUnavailable => ErrorCategory::Retryable,
            ErrorKind::ResourceNotFound
            | ErrorKind::UrlParsing
            | ErrorKind::DecodingFailed
            | ErrorKind::EncodingFailed
            | ErrorKind::Security
            | ErrorKind::BadRequest
            | ErrorKind::MalformedData
            | ErrorKind::ServerCertificate
            | ErrorKind::UrlResponse => ErrorCategory::NonRetryable,
            ErrorKind::Unauthorized => ErrorCategory::RequiresLogout,
        }
    }

    /// Text a presentation layer may show for this kind. Empty for
    /// `CallCancelled`.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::CallCancelled => "",
            ErrorKind::BadRequest => "Bad request",
            ErrorKind::ConnectionLost => "Your internet connection was lost",
            ErrorKind::DeviceOffline => "Cannot connect to the network",
            ErrorKind::DnsLookupFailed => "Error encountered while sending your request",
            ErrorKind::Unauthorized => "You must log in to continue",
            ErrorKind::DecodingFailed | ErrorKind::MalformedData => {
                "Error encountered with data returned from the server"
            }
            ErrorKind::EncodingFailed | ErrorKind::UrlParsing => {
                "Error encountered while preparing your request"
            }
            ErrorKind::ResourceNotFound => "Could not locate the resource you requested",
            ErrorKind::Security | ErrorKind::ServerCertificate => "An unidentified error occurred",
            ErrorKind::ServerUnavailable => {
                "We are unable to reach our servers. Please try again in a few minutes."
            }
            ErrorKind::TimedOut => "Response not returned in a timely manner",
            ErrorKind::Unknown => "An unknown error occurred",
            ErrorKind::UrlResponse => "Response was not an HTTP response",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Security => "security",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::ConnectionLost => "connection_lost",
            ErrorKind::DeviceOffline => "device_offline",
            ErrorKind::DnsLookupFailed => "dns_lookup_failed",
            ErrorKind::ResourceNotFound => "resource_not_found",
            ErrorKind::UrlParsing => "url_parsing",
            ErrorKind::CallCancelled => "call_cancelled",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::DecodingFailed => "decoding_failed",
            ErrorKind::EncodingFailed => "encoding_failed",
            ErrorKind::MalformedData => "malformed_data",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::ServerUnavailable => "server_unavailable",
            ErrorKind::ServerCertificate => "server_certificate",
            ErrorKind::Unknown => "unknown",
            ErrorKind::UrlResponse => "url_response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared handle to the error that caused a `RequestError`.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A classified request failure.
#[derive(Clone)]
pub struct RequestError {
    pub kind: ErrorKind,
    /// The request that produced this error.
    pub request: HttpRequest,
    /// The response, if one was received.
    pub response: Option<ResponseDescriptor>,
    pub cause: Option<Cause>,
}

impl RequestError {
    pub fn new(kind: ErrorKind, request: HttpRequest) -> Self {
        Self {
            kind,
            request,
            response: None,
            cause: None,
        }
    }

    pub fn with_response(mut self, response: ResponseDescriptor) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn url_conversion(request: HttpRequest) -> Self {
        Self::new(ErrorKind::UrlParsing, request)
    }

    pub fn encoding<E>(request: HttpRequest, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(ErrorKind::EncodingFailed, request).with_cause(cause)
    }

    pub fn connection_lost(request: HttpRequest) -> Self {
        Self::new(ErrorKind::ConnectionLost, request)
    }

    pub fn json_decoding(request: HttpRequest, cause: serde_json::Error) -> Self {
        Self::new(ErrorKind::DecodingFailed, request).with_cause(cause)
    }

    pub fn cancelled(request: HttpRequest) -> Self {
        Self::new(ErrorKind::CallCancelled, request)
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn message(&self) -> &'static str {
        self.kind.message()
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }
}

impl PartialEq for RequestError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.request == other.request
    }
}

impl Eq for RequestError {}

impl fmt::Debug for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestError")
            .field("kind", &self.kind)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("cause", &self.cause.as_ref().map(|cause| cause.to_string()))
            .finish()
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} failed: {}",
            self.request.method, self.request.url, self.kind
        )?;
        if let Some(status) = self.status() {
            write!(f, " (HTTP {status})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Errors raised while setting the client up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no tokio runtime available: {0}")]
    Runtime(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::http::TransportError;
    use crate::http::TransportErrorCode;

    fn request(url: &str) -> HttpRequest {
        HttpRequest::get(url)
    }

    #[test]
    fn every_kind_lands_in_exactly_one_category() {
        let retryable: HashSet<ErrorKind> = [
            ErrorKind::ConnectionLost,
            ErrorKind::DeviceOffline,
            ErrorKind::CallCancelled,
            ErrorKind::DnsLookupFailed,
            ErrorKind::TimedOut,
            ErrorKind::Unknown,
            ErrorKind::ServerUnavailable,
        ]
        .into();
        let non_retryable: HashSet<ErrorKind> = [
            ErrorKind::ResourceNotFound,
            ErrorKind::UrlParsing,
            ErrorKind::DecodingFailed,
            ErrorKind::EncodingFailed,
            ErrorKind::Security,
            ErrorKind::BadRequest,
            ErrorKind::MalformedData,
            ErrorKind::ServerCertificate,
            ErrorKind::UrlResponse,
        ]
        .into();

        assert_eq!(ErrorKind::ALL.len(), 17);
        assert_eq!(ErrorKind::ALL.iter().collect::<HashSet<_>>().len(), 17);
        assert_eq!(retryable.len() + non_retryable.len() + 1, ErrorKind::ALL.len());
        assert!(retryable.is_disjoint(&non_retryable));

        for kind in ErrorKind::ALL {
            let expected = if retryable.contains(&kind) {
                ErrorCategory::Retryable
            } else if non_retryable.contains(&kind) {
                ErrorCategory::NonRetryable
            } else {
                assert_eq!(kind, ErrorKind::Unauthorized);
                ErrorCategory::RequiresLogout
            };
            assert_eq!(kind.category(), expected, "{kind}");
        }
    }

    #[test]
    fn cancelled_has_no_user_facing_message() {
        assert_eq!(ErrorKind::CallCancelled.message(), "");
        for kind in ErrorKind::ALL {
            if kind != ErrorKind::CallCancelled {
                assert!(!kind.message().is_empty(), "{kind} has no message");
            }
        }
    }

    #[test]
    fn equality_ignores_response_and_cause() {
        let a = RequestError::new(ErrorKind::Unknown, request("http://a.test"));
        let b = RequestError::new(ErrorKind::Unknown, request("http://a.test"))
            .with_response(ResponseDescriptor::new("http://a.test", 502))
            .with_cause(TransportError::new(TransportErrorCode::Other, "boom"));
        assert_eq!(a, b);
    }

    #[test]
    fn equality_requires_same_kind_and_request() {
        let base = RequestError::new(ErrorKind::Unknown, request("http://a.test"));
        assert_ne!(base, RequestError::new(ErrorKind::TimedOut, request("http://a.test")));
        assert_ne!(base, RequestError::new(ErrorKind::Unknown, request("http://b.test")));
    }

    #[test]
    fn source_exposes_cause() {
        use std::error::Error as _;

        let err = RequestError::new(ErrorKind::Unknown, request("http://a.test"))
            .with_cause(TransportError::new(TransportErrorCode::TimedOut, "slow"));
        assert_eq!(err.source().unwrap().to_string(), "TimedOut: slow");
        assert!(RequestError::cancelled(request("http://a.test")).source().is_none());
    }

    #[test]
    fn display_includes_status_when_present() {
        let err = RequestError::new(ErrorKind::ResourceNotFound, request("http://a.test/search"))
            .with_response(ResponseDescriptor::new("http://a.test/search", 404));
        assert_eq!(
            err.to_string(),
            "GET http://a.test/search failed: resource_not_found (HTTP 404)"
        );
    }

    #[test]
    fn helper_constructors_pick_expected_kinds() {
        let req = request("http://a.test");
        assert_eq!(RequestError::url_conversion(req.clone()).kind, ErrorKind::UrlParsing);
        assert_eq!(RequestError::connection_lost(req.clone()).kind, ErrorKind::ConnectionLost);
        assert_eq!(RequestError::cancelled(req.clone()).kind, ErrorKind::CallCancelled);

        let json_err = serde_json::from_str::<u8>("x").unwrap_err();
        let decoding = RequestError::json_decoding(req.clone(), json_err);
        assert_eq!(decoding.kind, ErrorKind::DecodingFailed);
        assert!(decoding.cause.is_some());

        let encoding = RequestError::encoding(
            req,
            TransportError::new(TransportErrorCode::Other, "body"),
        );
        assert_eq!(encoding.category(), ErrorCategory::NonRetryable);
    }
}

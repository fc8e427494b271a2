//! HTTP transport types shared by the validator, transports and the loader.
//!
//! # Design
//! Requests and responses are plain data. `HttpRequest` is the opaque
//! descriptor a caller hands to the loader; nothing in the core inspects it
//! beyond what a transport needs to put it on the wire. A transport reports
//! what happened as a `TransportOutcome`, which keeps "no response",
//! "non-HTTP response" and "HTTP response" apart so the validator can tell
//! them apart.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross the FFI
//! boundary and thread boundaries without lifetime concerns.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Two requests are equal when method, URL, headers and body all match.
/// `RequestError` equality relies on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A bodiless `GET` for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Read-only snapshot of an HTTP response: status line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseDescriptor {
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            headers: Vec::new(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Whatever protocol-level response the transport received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResponse {
    Http(ResponseDescriptor),
    /// A response from a non-HTTP scheme (e.g. `file:`), which carries no
    /// status code.
    Other { url: String },
}

impl TransportResponse {
    pub fn as_http(&self) -> Option<&ResponseDescriptor> {
        match self {
            TransportResponse::Http(response) => Some(response),
            TransportResponse::Other { .. } => None,
        }
    }
}

/// Low-level failure codes a transport can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorCode {
    InsecureConnection,
    BadServerResponse,
    BadUrl,
    CannotDecodeRawData,
    CannotDecodeContentData,
    CannotParseResponse,
    UnsupportedUrl,
    CannotFindHost,
    CannotConnectToHost,
    AuthenticationRequired,
    Cancelled,
    NetworkConnectionLost,
    TimedOut,
    ResourceUnavailable,
    NotConnectedToInternet,
    FileDoesNotExist,
    DecodingFailedMidStream,
    DecodingFailedToComplete,
    DnsLookupFailed,
    DataNotAllowed,
    ServerCertificateUntrusted,
    ServerCertificateHasBadDate,
    ServerCertificateNotYetValid,
    /// Anything the transport could not attribute to a known code.
    Other,
}

/// A transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct TransportError {
    pub code: TransportErrorCode,
    pub message: String,
}

impl TransportError {
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// The raw result of a single network operation, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOutcome {
    pub bytes: Option<Vec<u8>>,
    pub response: Option<TransportResponse>,
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    /// An HTTP response with a body and no error.
    pub fn http(response: ResponseDescriptor, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            response: Some(TransportResponse::Http(response)),
            error: None,
        }
    }

    /// A failure before any response arrived.
    pub fn failed(error: TransportError) -> Self {
        Self {
            bytes: None,
            response: None,
            error: Some(error),
        }
    }
}

/// A response confirmed to be exactly status 200 with a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSuccess {
    pub bytes: Vec<u8>,
    pub response: ResponseDescriptor,
}

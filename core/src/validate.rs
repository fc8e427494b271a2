//! Turns raw transport outcomes into validated payloads or classified errors.
//!
//! Both entry points are pure functions of their inputs. Only an HTTP
//! response with status exactly 200 and a body is a success; every other
//! status, 2xx included, is a failure.

use tracing::debug;

use crate::error::{ErrorKind, RequestError};
use crate::http::{
    HttpRequest, TransportError, TransportErrorCode, TransportResponse, ValidatedSuccess,
};

/// Classify a transport failure that may have come with a response.
///
/// Without an HTTP response the kind is always `Unknown`.
pub fn classify_transport_failure(
    request: &HttpRequest,
    response: Option<&TransportResponse>,
    error: TransportError,
) -> RequestError {
    let Some(response) = response.and_then(TransportResponse::as_http) else {
        return RequestError::new(ErrorKind::Unknown, request.clone()).with_cause(error);
    };
    RequestError::new(kind_for_code(error.code), request.clone())
        .with_response(response.clone())
        .with_cause(error)
}

/// Map a low-level transport code to an `ErrorKind`.
pub fn kind_for_code(code: TransportErrorCode) -> ErrorKind {
    match code {
        TransportErrorCode::InsecureConnection => ErrorKind::Security,
        TransportErrorCode::BadServerResponse => ErrorKind::MalformedData,
        TransportErrorCode::BadUrl => ErrorKind::UrlParsing,
        TransportErrorCode::CannotDecodeRawData
        | TransportErrorCode::CannotDecodeContentData
        | TransportErrorCode::CannotParseResponse
        | TransportErrorCode::DecodingFailedMidStream
        | TransportErrorCode::DecodingFailedToComplete => ErrorKind::DecodingFailed,
        TransportErrorCode::UnsupportedUrl => ErrorKind::Unknown,
        TransportErrorCode::CannotFindHost => ErrorKind::ServerUnavailable,
        TransportErrorCode::CannotConnectToHost => ErrorKind::ConnectionLost,
        TransportErrorCode::AuthenticationRequired => ErrorKind::Unauthorized,
        TransportErrorCode::Cancelled | TransportErrorCode::DataNotAllowed => {
            ErrorKind::CallCancelled
        }
        TransportErrorCode::NetworkConnectionLost => ErrorKind::ConnectionLost,
        TransportErrorCode::TimedOut => ErrorKind::TimedOut,
        TransportErrorCode::ResourceUnavailable | TransportErrorCode::FileDoesNotExist => {
            ErrorKind::ResourceNotFound
        }
        TransportErrorCode::NotConnectedToInternet => ErrorKind::DeviceOffline,
        TransportErrorCode::DnsLookupFailed => ErrorKind::DnsLookupFailed,
        TransportErrorCode::ServerCertificateUntrusted
        | TransportErrorCode::ServerCertificateHasBadDate
        | TransportErrorCode::ServerCertificateNotYetValid => ErrorKind::ServerCertificate,
        TransportErrorCode::Other => ErrorKind::Unknown,
    }
}

/// Map a status code to the failure kind it represents, or `None` for 200.
pub fn kind_for_status(status: u16) -> Option<ErrorKind> {
    match status {
        200 => None,
        401 | 403 => Some(ErrorKind::Unauthorized),
        404 => Some(ErrorKind::ResourceNotFound),
        500 => Some(ErrorKind::ServerUnavailable),
        400 => Some(ErrorKind::BadRequest),
        408 => Some(ErrorKind::TimedOut),
        _ => Some(ErrorKind::Unknown),
    }
}

/// Validate what a transport returned for `request`.
pub fn validate(
    request: &HttpRequest,
    bytes: Option<Vec<u8>>,
    response: Option<TransportResponse>,
    error: Option<TransportError>,
) -> Result<ValidatedSuccess, RequestError> {
    let fail = |kind: ErrorKind| {
        let err = RequestError::new(kind, request.clone());
        match error.clone() {
            Some(cause) => err.with_cause(cause),
            None => err,
        }
    };

    let Some(TransportResponse::Http(response)) = response else {
        debug!(url = %request.url, "no HTTP response");
        return Err(fail(ErrorKind::Unknown));
    };

    let Some(bytes) = bytes else {
        debug!(url = %request.url, status = response.status, "response without body");
        return Err(fail(ErrorKind::MalformedData).with_response(response));
    };

    match kind_for_status(response.status) {
        None => Ok(ValidatedSuccess { bytes, response }),
        Some(kind) => {
            debug!(url = %request.url, status = response.status, %kind, "rejected response");
            Err(fail(kind).with_response(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::http::ResponseDescriptor;

    const URL: &str = "http://any-url.test/search?name=san";

    fn request() -> HttpRequest {
        HttpRequest::get(URL)
    }

    fn http(status: u16) -> TransportResponse {
        TransportResponse::Http(ResponseDescriptor::new(URL, status))
    }

    fn non_http() -> TransportResponse {
        TransportResponse::Other {
            url: "file:///any".to_string(),
        }
    }

    fn any_error() -> TransportError {
        TransportError::new(TransportErrorCode::Other, "any error")
    }

    fn any_bytes() -> Vec<u8> {
        b"any data".to_vec()
    }

    #[test]
    fn status_200_with_body_succeeds() {
        let body = vec![b'x'; 200];
        let success = validate(&request(), Some(body.clone()), Some(http(200)), None).unwrap();
        assert_eq!(success.bytes, body);
        assert_eq!(success.response, ResponseDescriptor::new(URL, 200));
    }

    #[test]
    fn status_200_with_empty_body_still_succeeds() {
        let success = validate(&request(), Some(Vec::new()), Some(http(200)), None).unwrap();
        assert!(success.bytes.is_empty());
    }

    #[test]
    fn every_invalid_representation_fails() {
        let cases: Vec<(Option<Vec<u8>>, Option<TransportResponse>, Option<TransportError>)> = vec![
            (None, None, None),
            (None, Some(non_http()), None),
            (None, Some(http(200)), None),
            (Some(any_bytes()), None, None),
            (Some(any_bytes()), None, Some(any_error())),
            (None, Some(non_http()), Some(any_error())),
            (None, Some(http(200)), Some(any_error())),
            (Some(any_bytes()), Some(non_http()), Some(any_error())),
            (Some(any_bytes()), Some(non_http()), None),
            (None, None, Some(any_error())),
        ];
        for (i, (bytes, response, error)) in cases.into_iter().enumerate() {
            let result = validate(&request(), bytes, response, error);
            assert!(result.is_err(), "case {i} unexpectedly succeeded");
        }
    }

    #[test]
    fn missing_or_non_http_response_is_unknown() {
        let err = validate(&request(), Some(any_bytes()), None, Some(any_error())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.response.is_none());
        assert!(err.cause.is_some());

        let err = validate(&request(), Some(any_bytes()), Some(non_http()), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.cause.is_none());
    }

    #[test]
    fn missing_body_is_malformed_data() {
        let err = validate(&request(), None, Some(http(200)), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedData);
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn status_table_is_exact() {
        let table = [
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Unauthorized),
            (404, ErrorKind::ResourceNotFound),
            (500, ErrorKind::ServerUnavailable),
            (400, ErrorKind::BadRequest),
            (408, ErrorKind::TimedOut),
            (199, ErrorKind::Unknown),
            (201, ErrorKind::Unknown),
            (204, ErrorKind::Unknown),
            (300, ErrorKind::Unknown),
            (502, ErrorKind::Unknown),
            (503, ErrorKind::Unknown),
            (600, ErrorKind::Unknown),
        ];
        for (status, expected) in table {
            let err = validate(&request(), Some(any_bytes()), Some(http(status)), None).unwrap_err();
            assert_eq!(err.kind, expected, "status {status}");
            assert_eq!(err.status(), Some(status));
            assert_eq!(err.request, request());
        }
    }

    #[test]
    fn unauthorized_requires_logout() {
        let err = validate(&request(), Some(any_bytes()), Some(http(403)), None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RequiresLogout);
    }

    #[test]
    fn failures_keep_the_transport_error_as_cause() {
        let err = validate(&request(), Some(any_bytes()), Some(http(500)), Some(any_error()))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerUnavailable);
        assert_eq!(err.cause.unwrap().to_string(), "Other: any error");
    }

    #[test]
    fn classify_without_http_response_is_unknown() {
        let err = classify_transport_failure(
            &request(),
            None,
            TransportError::new(TransportErrorCode::TimedOut, "slow"),
        );
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert!(err.response.is_none());

        let err = classify_transport_failure(
            &request(),
            Some(&non_http()),
            TransportError::new(TransportErrorCode::TimedOut, "slow"),
        );
        assert_eq!(err.kind, ErrorKind::Unknown);
    }

    #[test]
    fn classify_maps_codes_with_http_response() {
        let table = [
            (TransportErrorCode::InsecureConnection, ErrorKind::Security),
            (TransportErrorCode::BadServerResponse, ErrorKind::MalformedData),
            (TransportErrorCode::BadUrl, ErrorKind::UrlParsing),
            (TransportErrorCode::CannotParseResponse, ErrorKind::DecodingFailed),
            (TransportErrorCode::DecodingFailedMidStream, ErrorKind::DecodingFailed),
            (TransportErrorCode::UnsupportedUrl, ErrorKind::Unknown),
            (TransportErrorCode::CannotFindHost, ErrorKind::ServerUnavailable),
            (TransportErrorCode::CannotConnectToHost, ErrorKind::ConnectionLost),
            (TransportErrorCode::AuthenticationRequired, ErrorKind::Unauthorized),
            (TransportErrorCode::Cancelled, ErrorKind::CallCancelled),
            (TransportErrorCode::DataNotAllowed, ErrorKind::CallCancelled),
            (TransportErrorCode::NetworkConnectionLost, ErrorKind::ConnectionLost),
            (TransportErrorCode::TimedOut, ErrorKind::TimedOut),
            (TransportErrorCode::ResourceUnavailable, ErrorKind::ResourceNotFound),
            (TransportErrorCode::FileDoesNotExist, ErrorKind::ResourceNotFound),
            (TransportErrorCode::NotConnectedToInternet, ErrorKind::DeviceOffline),
            (TransportErrorCode::DnsLookupFailed, ErrorKind::DnsLookupFailed),
            (TransportErrorCode::ServerCertificateUntrusted, ErrorKind::ServerCertificate),
            (TransportErrorCode::ServerCertificateHasBadDate, ErrorKind::ServerCertificate),
            (TransportErrorCode::ServerCertificateNotYetValid, ErrorKind::ServerCertificate),
            (TransportErrorCode::Other, ErrorKind::Unknown),
        ];
        for (code, expected) in table {
            let err = classify_transport_failure(
                &request(),
                Some(&http(200)),
                TransportError::new(code, "x"),
            );
            assert_eq!(err.kind, expected, "{code:?}");
            assert_eq!(err.status(), Some(200));
            assert!(err.cause.is_some());
        }
    }
}

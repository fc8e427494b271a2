//! `Transport` backed by `ureq`.
//!
//! ureq is blocking, so each request runs on tokio's blocking pool. Status
//! codes are returned as data (`http_status_as_error(false)`) so the
//! validator sees every response; only genuine transport failures become
//! `TransportError`s.

use std::future::Future;
use std::io;
use std::time::Duration;

use tracing::debug;

use crate::config::ClientConfig;
use crate::http::{
    HttpMethod, HttpRequest, ResponseDescriptor, TransportError, TransportErrorCode,
    TransportOutcome, TransportResponse,
};
use crate::transport::Transport;

#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.timeout())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn fetch(&self, request: &HttpRequest) -> impl Future<Output = TransportOutcome> + Send {
        let agent = self.agent.clone();
        let request = request.clone();
        async move {
            match tokio::task::spawn_blocking(move || execute(&agent, &request)).await {
                Ok(outcome) => outcome,
                Err(e) => TransportOutcome::failed(TransportError::new(
                    TransportErrorCode::Other,
                    e.to_string(),
                )),
            }
        }
    }
}

fn with_headers<B>(
    builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    headers
        .iter()
        .fold(builder, |builder, (name, value)| builder.header(name.as_str(), value.as_str()))
}

fn execute(agent: &ureq::Agent, request: &HttpRequest) -> TransportOutcome {
    let headers = &request.headers;
    let body = request.body.as_deref();
    let result = match request.method {
        HttpMethod::Get => with_headers(agent.get(&request.url), headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(&request.url), headers).call(),
        HttpMethod::Post => {
            let builder = with_headers(agent.post(&request.url), headers);
            match body {
                Some(body) => builder.send(body),
                None => builder.send_empty(),
            }
        }
        HttpMethod::Put => {
            let builder = with_headers(agent.put(&request.url), headers);
            match body {
                Some(body) => builder.send(body),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            debug!(url = %request.url, error = %e, "ureq request failed");
            return TransportOutcome::failed(map_error(&e));
        }
    };

    let descriptor = ResponseDescriptor {
        url: request.url.clone(),
        status: response.status().as_u16(),
        headers: response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect(),
    };

    match response.body_mut().read_to_vec() {
        Ok(bytes) => TransportOutcome::http(descriptor, bytes),
        Err(e) => TransportOutcome {
            bytes: None,
            response: Some(TransportResponse::Http(descriptor)),
            error: Some(map_error(&e)),
        },
    }
}

fn map_error(error: &ureq::Error) -> TransportError {
    let code = match error {
        ureq::Error::Timeout(_) => TransportErrorCode::TimedOut,
        ureq::Error::HostNotFound => TransportErrorCode::CannotFindHost,
        ureq::Error::ConnectionFailed => TransportErrorCode::CannotConnectToHost,
        ureq::Error::BadUri(_) => TransportErrorCode::BadUrl,
        ureq::Error::Io(e) => io_code(e.kind()),
        _ => TransportErrorCode::Other,
    };
    TransportError::new(code, error.to_string())
}

fn io_code(kind: io::ErrorKind) -> TransportErrorCode {
    match kind {
        io::ErrorKind::TimedOut => TransportErrorCode::TimedOut,
        io::ErrorKind::ConnectionRefused => TransportErrorCode::CannotConnectToHost,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => TransportErrorCode::NetworkConnectionLost,
        io::ErrorKind::NotConnected => TransportErrorCode::NotConnectedToInternet,
        io::ErrorKind::NotFound => TransportErrorCode::FileDoesNotExist,
        _ => TransportErrorCode::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_transport_codes() {
        assert_eq!(io_code(io::ErrorKind::TimedOut), TransportErrorCode::TimedOut);
        assert_eq!(
            io_code(io::ErrorKind::ConnectionRefused),
            TransportErrorCode::CannotConnectToHost
        );
        assert_eq!(
            io_code(io::ErrorKind::ConnectionReset),
            TransportErrorCode::NetworkConnectionLost
        );
        assert_eq!(io_code(io::ErrorKind::Other), TransportErrorCode::Other);
    }

    #[test]
    fn ureq_errors_map_to_transport_codes() {
        assert_eq!(
            map_error(&ureq::Error::HostNotFound).code,
            TransportErrorCode::CannotFindHost
        );
        assert_eq!(
            map_error(&ureq::Error::ConnectionFailed).code,
            TransportErrorCode::CannotConnectToHost
        );
        let io = ureq::Error::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(map_error(&io).code, TransportErrorCode::NetworkConnectionLost);
    }
}

//! Networking core for the university search app.
//!
//! # Overview
//! Issues HTTP requests, validates responses, classifies failures and decodes
//! the remote university list into typed values. The presentation layer sits
//! outside this crate and consumes it directly or through `unisearch-ffi`.
//!
//! # Design
//! - `error` owns the failure taxonomy: `ErrorKind` decides retry policy and
//!   user-facing text, `RequestError` carries the request that failed.
//! - `validate` is pure: raw outcome in, `ValidatedSuccess` or
//!   `RequestError` out. Only status 200 is success.
//! - `transport` runs requests asynchronously on tokio behind the
//!   `TransportClient` trait. The raw `Transport` is injectable, so tests
//!   script outcomes instead of intercepting the network.
//! - `loader` decodes results and suppresses delivery once it has been
//!   dropped.
//! - `client` builds search requests; the core never inspects a request it
//!   is asked to send.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod loader;
pub mod transport;
pub mod types;
pub mod ureq_transport;
pub mod validate;

pub use client::SearchClient;
pub use config::ClientConfig;
pub use error::{Error, ErrorCategory, ErrorKind, RequestError};
pub use http::{
    HttpMethod, HttpRequest, ResponseDescriptor, TransportError, TransportErrorCode,
    TransportOutcome, TransportResponse, ValidatedSuccess,
};
pub use loader::UniversityLoader;
pub use transport::{
    CancelHandle, Completion, HttpTransportClient, Pending, Transport, TransportClient,
};
pub use types::{RemoteUniversity, University};
pub use ureq_transport::UreqTransport;
pub use validate::{classify_transport_failure, validate};

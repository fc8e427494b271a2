//! Typed loader for the university search resource.
//!
//! # Design
//! `UniversityLoader` sends through a `TransportClient` and decodes the
//! validated body. The in-flight completion holds only a `Weak` reference to
//! a liveness token owned by the loader; once the loader is dropped the
//! upgrade fails and the caller's completion is never invoked. The network
//! call itself is left to finish. Calls are independent of each other: a new
//! `search` never cancels an earlier one.

use std::sync::{Arc, Weak};

use tracing::{trace, warn};

use crate::error::{ErrorKind, RequestError};
use crate::http::HttpRequest;
use crate::transport::{pending, CancelHandle, Pending, TransportClient};
use crate::types::{RemoteUniversity, University};

pub struct UniversityLoader<C> {
    client: C,
    alive: Arc<()>,
}

impl<C: TransportClient> UniversityLoader<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            alive: Arc::new(()),
        }
    }

    /// Fetch and decode the universities for `request`.
    ///
    /// `completion` receives exactly one result, unless this loader is
    /// dropped first, in which case it is never called.
    pub fn search<F>(&self, request: HttpRequest, completion: F) -> CancelHandle
    where
        F: FnOnce(Result<Vec<University>, RequestError>) + Send + 'static,
    {
        let alive: Weak<()> = Arc::downgrade(&self.alive);
        let original = request.clone();
        self.client.send(
            request,
            Box::new(move |result| {
                let Some(_alive) = alive.upgrade() else {
                    trace!(url = %original.url, "loader released, dropping result");
                    return;
                };
                completion(result.and_then(|success| decode(&original, &success.bytes)));
            }),
        )
    }

    /// Like `search`, but hands the result back through a future that
    /// resolves to `None` if the loader is released first.
    pub fn search_pending(&self, request: HttpRequest) -> (CancelHandle, Pending<Vec<University>>) {
        let (completion, pending) = pending();
        (self.search(request, completion), pending)
    }
}

/// Decode a search response body into universities.
///
/// Any decode failure is reported as `Unknown` with the serde error as cause.
pub fn decode(request: &HttpRequest, bytes: &[u8]) -> Result<Vec<University>, RequestError> {
    match serde_json::from_slice::<Vec<RemoteUniversity>>(bytes) {
        Ok(remote) => Ok(remote.into_iter().map(University::from).collect()),
        Err(e) => {
            warn!(url = %request.url, error = %e, "could not decode search response");
            Err(RequestError::new(ErrorKind::Unknown, request.clone()).with_cause(e))
        }
    }
}

//! Asynchronous request execution with cancellation.
//!
//! # Design
//! Two seams split the network call:
//! - `Transport` performs the raw I/O and reports a `TransportOutcome`. It is
//!   the injection point for tests and for alternative HTTP stacks.
//! - `TransportClient` is what the loader talks to. `send` returns a
//!   `CancelHandle` right away and later invokes the completion exactly once.
//!
//! `HttpTransportClient` bridges the two by spawning one task per call on a
//! tokio runtime and racing the transport against the call's cancel signal.
//! A transport failure with no response is reported as `Unknown`; the finer
//! `classify_transport_failure` mapping is intentionally not applied here.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, RequestError};
use crate::http::{HttpRequest, TransportOutcome, ValidatedSuccess};
use crate::validate::validate;

/// Callback receiving the single result of a call.
pub type Completion<T> = Box<dyn FnOnce(Result<T, RequestError>) + Send + 'static>;

/// Raw network access.
pub trait Transport: Send + Sync + 'static {
    /// Perform one network operation for `request`.
    fn fetch(&self, request: &HttpRequest) -> impl Future<Output = TransportOutcome> + Send;
}

/// Issues requests and delivers validated results.
pub trait TransportClient: Send + Sync {
    /// Start one network operation for `request`. `completion` is invoked
    /// exactly once, on a thread chosen by the implementation.
    fn send(&self, request: HttpRequest, completion: Completion<ValidatedSuccess>) -> CancelHandle;

    /// Like `send`, but hands the result back through a future.
    fn send_pending(&self, request: HttpRequest) -> (CancelHandle, Pending<ValidatedSuccess>) {
        let (completion, pending) = pending();
        (self.send(request, completion), pending)
    }
}

impl<C: TransportClient + ?Sized> TransportClient for Arc<C> {
    fn send(&self, request: HttpRequest, completion: Completion<ValidatedSuccess>) -> CancelHandle {
        (**self).send(request, completion)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Aborts an in-flight call. Clones share the same signal.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; has no effect once the call has
    /// already delivered its result.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::AcqRel) {
            self.state.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once `cancel` has been called. Every waiter on every clone
    /// is woken.
    pub async fn cancelled(&self) {
        // Register before checking the flag so a concurrent cancel is not missed.
        let mut notified = std::pin::pin!(self.state.notify.notified());
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Future side of a `Completion`.
///
/// Resolves to `None` if the completion was dropped without being invoked,
/// which is what happens when a loader is released mid-call.
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, RequestError>>,
}

impl<T> Future for Pending<T> {
    type Output = Option<Result<T, RequestError>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// Create a linked completion/future pair.
pub fn pending<T: Send + 'static>() -> (Completion<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    let completion: Completion<T> = Box::new(move |result| {
        // The receiver may already be gone; nobody is waiting then.
        let _ = tx.send(result);
    });
    (completion, Pending { rx })
}

/// Interpret a transport outcome the way `HttpTransportClient` does.
pub fn resolve_outcome(
    request: &HttpRequest,
    outcome: TransportOutcome,
) -> Result<ValidatedSuccess, RequestError> {
    let TransportOutcome {
        bytes,
        response,
        error,
    } = outcome;
    match (response, error) {
        (None, Some(error)) => {
            debug!(url = %request.url, %error, "transport failed before a response");
            Err(RequestError::new(ErrorKind::Unknown, request.clone()).with_cause(error))
        }
        (response, error) => validate(request, bytes, response, error),
    }
}

/// `TransportClient` that runs a `Transport` on a tokio runtime.
#[derive(Debug)]
pub struct HttpTransportClient<T> {
    transport: Arc<T>,
    runtime: Handle,
}

impl<T: Transport> HttpTransportClient<T> {
    pub fn new(transport: T, runtime: Handle) -> Self {
        Self {
            transport: Arc::new(transport),
            runtime,
        }
    }

    /// Bind to the runtime of the calling context.
    pub fn with_current_runtime(transport: T) -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;
        Ok(Self::new(transport, runtime))
    }
}

impl<T: Transport> TransportClient for HttpTransportClient<T> {
    /// If the runtime behind the handle has shut down, the call is dropped
    /// and `completion` never runs; a `Pending` then resolves to `None`.
    fn send(&self, request: HttpRequest, completion: Completion<ValidatedSuccess>) -> CancelHandle {
        let handle = CancelHandle::new();
        let signal = handle.clone();
        let transport = Arc::clone(&self.transport);

        debug!(method = %request.method, url = %request.url, "sending request");
        let delivery = Delivery::new(completion, &request.url);
        self.runtime.spawn(async move {
            let result = tokio::select! {
                outcome = transport.fetch(&request) => resolve_outcome(&request, outcome),
                () = signal.cancelled() => {
                    debug!(url = %request.url, "request cancelled");
                    Err(RequestError::cancelled(request.clone()))
                }
            };
            delivery.deliver(result);
        });
        handle
    }
}

/// Runs a completion at most once and logs calls dropped before delivering.
struct Delivery<T> {
    completion: Option<Completion<T>>,
    url: String,
}

impl<T> Delivery<T> {
    fn new(completion: Completion<T>, url: &str) -> Self {
        Self {
            completion: Some(completion),
            url: url.to_string(),
        }
    }

    fn deliver(mut self, result: Result<T, RequestError>) {
        if let Some(completion) = self.completion.take() {
            completion(result);
        }
    }
}

impl<T> Drop for Delivery<T> {
    fn drop(&mut self) {
        if self.completion.is_some() {
            warn!(url = %self.url, "call dropped without a result, runtime is shut down");
        }
    }
}

//! C-ABI wrapper around `unisearch-core`.
//!
//! # Overview
//! Exposes university search through `extern "C"` functions in two shapes:
//! hosts that own their networking build a request, execute it themselves
//! and hand the outcome back for validation and decoding; hosts that do not
//! create a loader that runs requests on its own runtime and reports through
//! a callback.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - A single `FfiSearchResult` envelope conveys decoded universities and
//!   classified errors uniformly on both paths.
//! - The C caller owns all returned pointers and must call the matching
//!   `uni_free_*` / `*_free` function to release them.

pub mod types;

use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;
use tracing_subscriber::EnvFilter;
use unisearch_core::loader::decode;
use unisearch_core::transport::resolve_outcome;
use unisearch_core::{
    classify_transport_failure, ClientConfig, Error, ErrorKind, HttpRequest, HttpTransportClient,
    ResponseDescriptor, SearchClient, TransportError, TransportResponse, UniversityLoader,
    UreqTransport,
};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `SearchClient` bound to `base_url`.
///
/// Returns null if `base_url` is null, is not an absolute http(s) URL, or if
/// an internal panic occurs. The caller must free the returned pointer with
/// `uni_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn uni_client_new(base_url: *const c_char) -> *mut FfiSearchClient {
    catch_unwind(|| {
        let Some(url) = (unsafe { read_c_str(base_url) }) else {
            return std::ptr::null_mut();
        };
        match SearchClient::new(url) {
            Ok(client) => Box::into_raw(Box::new(FfiSearchClient { inner: client })),
            Err(e) => {
                warn!(error = %e, "rejected base url");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `uni_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn uni_client_free(client: *mut FfiSearchClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Host-driven search
// ---------------------------------------------------------------------------

/// Build the HTTP request that searches universities by name.
///
/// Returns null if `client` or `query` is null.
/// The caller must free the returned pointer with `uni_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn uni_build_search(
    client: *const FfiSearchClient,
    query: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(query) = (unsafe { read_c_str(query) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_search(query))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Validate and decode what the host's transport produced for `request`.
///
/// `request` must be the pointer returned by `uni_build_search`; it is
/// borrowed, not freed. Returns an `FfiSearchResult` with status `NullArg`
/// if either pointer is null. The caller must free the result with
/// `uni_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn uni_parse_search(
    request: *const FfiHttpRequest,
    response: *const FfiHttpResponse,
) -> *mut FfiSearchResult {
    catch_unwind(|| {
        if request.is_null() {
            return FfiSearchResult::null_arg("request");
        }
        if response.is_null() {
            return FfiSearchResult::null_arg("response");
        }
        let request = unsafe { &*request }.to_core();
        let outcome = unsafe { &*response }.to_outcome(&request.url);
        let result =
            resolve_outcome(&request, outcome).and_then(|success| decode(&request, &success.bytes));
        FfiSearchResult::from_result(result)
    })
    .unwrap_or_else(|_| FfiSearchResult::panic("panic in uni_parse_search"))
}

// ---------------------------------------------------------------------------
// Loader lifecycle
// ---------------------------------------------------------------------------

fn new_loader(config: ClientConfig) -> Result<FfiLoader, Error> {
    let client = SearchClient::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("unisearch")
        .build()
        .map_err(|e| Error::Runtime(e.to_string()))?;
    let transport =
        HttpTransportClient::new(UreqTransport::from_config(&config), runtime.handle().clone());
    Ok(FfiLoader {
        runtime: Some(runtime),
        client,
        loader: Some(UniversityLoader::new(transport)),
        gate: Arc::default(),
    })
}

/// Create a loader that performs requests on its own background runtime.
///
/// `config_json` is a JSON object with optional `base_url`, `timeout_secs`
/// and `user_agent` fields. When null, configuration is read from the
/// `UNISEARCH_*` environment variables. Returns null on invalid
/// configuration. The caller must free the loader with `uni_loader_free`.
#[unsafe(no_mangle)]
pub extern "C" fn uni_loader_new(config_json: *const c_char) -> *mut FfiLoader {
    catch_unwind(|| {
        let config = if config_json.is_null() {
            ClientConfig::from_env()
        } else {
            match unsafe { read_c_str(config_json) } {
                Some(json) => ClientConfig::from_json(json),
                None => Err(Error::Config("config is not valid UTF-8".to_string())),
            }
        };
        match config.and_then(new_loader) {
            Ok(loader) => Box::into_raw(Box::new(loader)),
            Err(e) => {
                warn!(error = %e, "failed to create loader");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a loader created by `uni_loader_new`. Safe to call with null.
///
/// Searches still in flight are abandoned. If a callback is already running
/// on another thread, this waits for it to return, so no callback runs once
/// this returns and `user_data` may be released. Called from inside a
/// callback, it only prevents further callbacks.
#[unsafe(no_mangle)]
pub extern "C" fn uni_loader_free(loader: *mut FfiLoader) {
    if !loader.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(loader) });
        }));
    }
}

/// Search universities by name on the loader's runtime.
///
/// `callback` is invoked exactly once, on a runtime thread, with a result the
/// host must free with `uni_free_result`, unless the loader is freed first.
/// `user_data` is passed through untouched and must be safe to use from
/// that thread. Returns a cancel handle (free it with
/// `uni_cancel_handle_free`), or null if `loader`, `query` or `callback` is
/// null, in which case the callback is not invoked.
#[unsafe(no_mangle)]
pub extern "C" fn uni_loader_search(
    loader: *const FfiLoader,
    query: *const c_char,
    callback: Option<FfiSearchCallback>,
    user_data: *mut c_void,
) -> *mut FfiCancelHandle {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(callback), false) = (callback, loader.is_null()) else {
            return std::ptr::null_mut();
        };
        let Some(query) = (unsafe { read_c_str(query) }) else {
            return std::ptr::null_mut();
        };
        let ffi = unsafe { &*loader };
        let Some(loader) = ffi.loader.as_ref() else {
            return std::ptr::null_mut();
        };
        let host = HostCallback::new(callback, user_data, Arc::clone(&ffi.gate));
        let handle = loader.search(ffi.client.build_search(query), move |result| {
            host.invoke(result)
        });
        Box::into_raw(Box::new(FfiCancelHandle { inner: handle }))
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Cancel the search behind `handle`. Idempotent; safe to call with null or
/// after the search has completed.
#[unsafe(no_mangle)]
pub extern "C" fn uni_cancel(handle: *const FfiCancelHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| unsafe { &*handle }.inner.cancel()));
    }
}

/// Free a cancel handle. Does not cancel the search. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn uni_cancel_handle_free(handle: *mut FfiCancelHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(handle) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Retry category of an error kind.
#[unsafe(no_mangle)]
pub extern "C" fn uni_error_category(kind: FfiErrorKind) -> FfiErrorCategory {
    ErrorKind::from(kind).category().into()
}

/// User-facing message for an error kind. Empty for `CallCancelled`.
///
/// The caller must free the returned string with `uni_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn uni_error_message(kind: FfiErrorKind) -> *mut c_char {
    catch_unwind(|| to_c_string(ErrorKind::from(kind).message()))
        .unwrap_or(std::ptr::null_mut())
}

/// Classify a transport failure code reported by the host.
///
/// `code` uses the `FfiTransportErrorCode` values; unrecognized values are
/// treated as `Other`. Negative codes mean there was no failure and yield
/// `Unknown`, as does any failure that came without an HTTP response.
#[unsafe(no_mangle)]
pub extern "C" fn uni_classify_transport_failure(
    code: i32,
    has_http_response: bool,
) -> FfiErrorKind {
    catch_unwind(|| {
        let Some(code) = transport_code_from_raw(code) else {
            return FfiErrorKind::Unknown;
        };
        // The classification only looks at whether a response exists.
        let request = HttpRequest::get("");
        let response =
            has_http_response.then(|| TransportResponse::Http(ResponseDescriptor::new("", 0)));
        classify_transport_failure(&request, response.as_ref(), TransportError::new(code, ""))
            .kind
            .into()
    })
    .unwrap_or(FfiErrorKind::Unknown)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `uni_build_search`. Safe to call
/// with null.
#[unsafe(no_mangle)]
pub extern "C" fn uni_free_request(req: *mut FfiHttpRequest) {
    if !req.is_null() {
        let _ = catch_unwind(|| FfiHttpRequest::free(req));
    }
}

/// Free an `FfiSearchResult` and everything it owns. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn uni_free_result(result: *mut FfiSearchResult) {
    if !result.is_null() {
        let _ = catch_unwind(|| FfiSearchResult::free(result));
    }
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn uni_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG` (default
/// `info`). Returns false if a global subscriber was already installed, so
/// calling it more than once is harmless.
#[unsafe(no_mangle)]
pub extern "C" fn uni_init_logging() -> bool {
    catch_unwind(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

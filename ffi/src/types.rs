//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length pairs instead of
//! `Vec`, and enums with explicit discriminants. Arrays handed to C are boxed
//! slices so that length and capacity always agree when they come back to be
//! freed. Conversion functions live here to keep `lib.rs` focused on the
//! `extern "C"` surface.

use std::cell::Cell;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::runtime::Runtime;
use tracing::trace;
use unisearch_core::{
    CancelHandle, ErrorCategory, ErrorKind, HttpMethod, HttpRequest, HttpTransportClient,
    RequestError, ResponseDescriptor, SearchClient, TransportError, TransportErrorCode,
    TransportOutcome, TransportResponse, University, UniversityLoader, UreqTransport,
};

/// Opaque handle to a `SearchClient`, used by hosts that do their own I/O.
pub struct FfiSearchClient {
    pub(crate) inner: SearchClient,
}

/// Opaque handle to a loader that performs I/O on its own runtime.
///
/// Dropping it closes the delivery gate first, which waits for host
/// callbacks already running on other threads. No callback runs after
/// `uni_loader_free` returns.
pub struct FfiLoader {
    pub(crate) runtime: Option<Runtime>,
    pub(crate) client: SearchClient,
    pub(crate) loader: Option<UniversityLoader<HttpTransportClient<UreqTransport>>>,
    pub(crate) gate: Arc<DeliveryGate>,
}

impl Drop for FfiLoader {
    fn drop(&mut self) {
        self.gate.close();
        self.loader.take();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

thread_local! {
    static IN_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// Lets host callbacks run until the loader is freed.
///
/// Callbacks hold the read side while they run; `close` takes the write
/// side, so it returns only once every running callback has finished.
#[derive(Debug, Default)]
pub(crate) struct DeliveryGate {
    closed: AtomicBool,
    running: RwLock<()>,
}

impl DeliveryGate {
    /// Run `f` unless the gate is closed. Returns whether it ran.
    pub(crate) fn deliver(&self, f: impl FnOnce()) -> bool {
        let _running = self.running.read().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        let outer = IN_CALLBACK.with(|flag| flag.replace(true));
        f();
        IN_CALLBACK.with(|flag| flag.set(outer));
        true
    }

    /// Stop further deliveries and wait for running ones. From inside a
    /// callback it cannot wait on itself, so it only stops further ones.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if IN_CALLBACK.with(Cell::get) {
            return;
        }
        drop(self.running.write().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Opaque handle used to cancel an in-flight search.
pub struct FfiCancelHandle {
    pub(crate) inner: CancelHandle,
}

/// Callback invoked once per search with a result the host must free with
/// `uni_free_result`.
pub type FfiSearchCallback = extern "C" fn(result: *mut FfiSearchResult, user_data: *mut c_void);

/// Host callback plus its context pointer, moved onto a runtime worker.
pub(crate) struct HostCallback {
    callback: FfiSearchCallback,
    user_data: *mut c_void,
    gate: Arc<DeliveryGate>,
}

// SAFETY: the host promises that `user_data` may be used from any thread,
// as documented on `uni_loader_search`.
unsafe impl Send for HostCallback {}

impl HostCallback {
    pub(crate) fn new(
        callback: FfiSearchCallback,
        user_data: *mut c_void,
        gate: Arc<DeliveryGate>,
    ) -> Self {
        Self {
            callback,
            user_data,
            gate,
        }
    }

    pub(crate) fn invoke(self, result: Result<Vec<University>, RequestError>) {
        let delivered = self.gate.deliver(|| {
            (self.callback)(FfiSearchResult::from_result(result), self.user_data);
        });
        if !delivered {
            trace!("loader freed, dropping search result");
        }
    }
}

/// Copy `s` into a C string, dropping interior NULs.
pub(crate) fn to_c_string(s: impl Into<String>) -> *mut c_char {
    let mut s: String = s.into();
    s.retain(|c| c != '\0');
    CString::new(s).unwrap_or_default().into_raw()
}

/// Read a borrowed C string. Null and invalid UTF-8 read as `None`.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn read_c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Free a string created by `to_c_string`. Null is ignored.
pub(crate) fn free_c_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

fn into_raw_slice<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    (Box::into_raw(items.into_boxed_slice()) as *mut T, len)
}

/// # Safety
/// `ptr`/`len` must come from `into_raw_slice`.
unsafe fn from_raw_slice<T>(ptr: *mut T, len: u32) -> Option<Box<[T]>> {
    if ptr.is_null() || len == 0 {
        return None;
    }
    Some(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len as usize)) })
}

fn string_array(items: Vec<String>) -> (*mut *mut c_char, u32) {
    into_raw_slice(items.into_iter().map(to_c_string).collect())
}

fn free_string_array(ptr: *mut *mut c_char, len: u32) {
    if let Some(items) = unsafe { from_raw_slice(ptr, len) } {
        for item in items.iter() {
            free_c_string(*item);
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Delete => HttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `uni_build_search`. The host executes it and reports the outcome
/// through `uni_parse_search`, passing this same request back.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: u32,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let (headers, headers_len) = into_raw_slice(
            req.headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect(),
        );
        let (body, body_len) = into_raw_slice(req.body.unwrap_or_default());
        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: to_c_string(req.url),
            headers,
            headers_len,
            body,
            body_len,
        }))
    }

    /// Read the request back into a core `HttpRequest`.
    pub(crate) fn to_core(&self) -> HttpRequest {
        let text = |ptr: *mut c_char| unsafe { read_c_str(ptr) }.unwrap_or_default().to_string();
        let headers = if self.headers.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(self.headers, self.headers_len as usize) }
                .iter()
                .map(|h| (text(h.key), text(h.value)))
                .collect()
        };
        let body = (!self.body.is_null()).then(|| {
            unsafe { std::slice::from_raw_parts(self.body, self.body_len as usize) }.to_vec()
        });
        HttpRequest {
            method: self.method.into(),
            url: text(self.url),
            headers,
            body,
        }
    }

    /// Release everything `from_core` allocated.
    pub(crate) fn free(ptr: *mut Self) {
        let req = unsafe { Box::from_raw(ptr) };
        free_c_string(req.url);
        if let Some(headers) = unsafe { from_raw_slice(req.headers, req.headers_len) } {
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
        drop(unsafe { from_raw_slice(req.body, req.body_len) });
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// Transport failure codes a host can report. `None` (-1) means no error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTransportErrorCode {
    None = -1,
    InsecureConnection = 0,
    BadServerResponse = 1,
    BadUrl = 2,
    CannotDecodeRawData = 3,
    CannotDecodeContentData = 4,
    CannotParseResponse = 5,
    UnsupportedUrl = 6,
    CannotFindHost = 7,
    CannotConnectToHost = 8,
    AuthenticationRequired = 9,
    Cancelled = 10,
    NetworkConnectionLost = 11,
    TimedOut = 12,
    ResourceUnavailable = 13,
    NotConnectedToInternet = 14,
    FileDoesNotExist = 15,
    DecodingFailedMidStream = 16,
    DecodingFailedToComplete = 17,
    DnsLookupFailed = 18,
    DataNotAllowed = 19,
    ServerCertificateUntrusted = 20,
    ServerCertificateHasBadDate = 21,
    ServerCertificateNotYetValid = 22,
    Other = 23,
}

/// Interpret a raw transport code from C. Negative means no error; values
/// outside the table map to `Other`.
pub(crate) fn transport_code_from_raw(raw: i32) -> Option<TransportErrorCode> {
    let code = match raw {
        i32::MIN..=-1 => return None,
        0 => TransportErrorCode::InsecureConnection,
        1 => TransportErrorCode::BadServerResponse,
        2 => TransportErrorCode::BadUrl,
        3 => TransportErrorCode::CannotDecodeRawData,
        4 => TransportErrorCode::CannotDecodeContentData,
        5 => TransportErrorCode::CannotParseResponse,
        6 => TransportErrorCode::UnsupportedUrl,
        7 => TransportErrorCode::CannotFindHost,
        8 => TransportErrorCode::CannotConnectToHost,
        9 => TransportErrorCode::AuthenticationRequired,
        10 => TransportErrorCode::Cancelled,
        11 => TransportErrorCode::NetworkConnectionLost,
        12 => TransportErrorCode::TimedOut,
        13 => TransportErrorCode::ResourceUnavailable,
        14 => TransportErrorCode::NotConnectedToInternet,
        15 => TransportErrorCode::FileDoesNotExist,
        16 => TransportErrorCode::DecodingFailedMidStream,
        17 => TransportErrorCode::DecodingFailedToComplete,
        18 => TransportErrorCode::DnsLookupFailed,
        19 => TransportErrorCode::DataNotAllowed,
        20 => TransportErrorCode::ServerCertificateUntrusted,
        21 => TransportErrorCode::ServerCertificateHasBadDate,
        22 => TransportErrorCode::ServerCertificateNotYetValid,
        _ => TransportErrorCode::Other,
    };
    Some(code)
}

/// What the host's transport produced for an `FfiHttpRequest`.
///
/// The host fills this in (typically on the stack) and passes a pointer to
/// `uni_parse_search`. The FFI layer reads but does not free these fields.
/// `body` may be null to report that no body arrived.
#[repr(C)]
pub struct FfiHttpResponse {
    pub has_response: bool,
    pub is_http: bool,
    pub status: u16,
    pub body: *const u8,
    pub body_len: usize,
    pub transport_error: i32,
    pub transport_error_message: *const c_char,
}

impl FfiHttpResponse {
    pub(crate) fn to_outcome(&self, url: &str) -> TransportOutcome {
        let bytes = (!self.body.is_null())
            .then(|| unsafe { std::slice::from_raw_parts(self.body, self.body_len) }.to_vec());
        let response = self.has_response.then(|| {
            if self.is_http {
                TransportResponse::Http(ResponseDescriptor::new(url, self.status))
            } else {
                TransportResponse::Other {
                    url: url.to_string(),
                }
            }
        });
        let error = transport_code_from_raw(self.transport_error).map(|code| {
            let message = unsafe { read_c_str(self.transport_error_message) }.unwrap_or_default();
            TransportError::new(code, message)
        });
        TransportOutcome {
            bytes,
            response,
            error,
        }
    }
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorKind {
    Security = 0,
    BadRequest = 1,
    ConnectionLost = 2,
    DeviceOffline = 3,
    DnsLookupFailed = 4,
    ResourceNotFound = 5,
    UrlParsing = 6,
    CallCancelled = 7,
    Unauthorized = 8,
    DecodingFailed = 9,
    EncodingFailed = 10,
    MalformedData = 11,
    TimedOut = 12,
    ServerUnavailable = 13,
    ServerCertificate = 14,
    Unknown = 15,
    UrlResponse = 16,
}

impl From<ErrorKind> for FfiErrorKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Security => FfiErrorKind::Security,
            ErrorKind::BadRequest => FfiErrorKind::BadRequest,
            ErrorKind::ConnectionLost => FfiErrorKind::ConnectionLost,
            ErrorKind::DeviceOffline => FfiErrorKind::DeviceOffline,
            ErrorKind::DnsLookupFailed => FfiErrorKind::DnsLookupFailed,
            ErrorKind::ResourceNotFound => FfiErrorKind::ResourceNotFound,
            ErrorKind::UrlParsing => FfiErrorKind::UrlParsing,
            ErrorKind::CallCancelled => FfiErrorKind::CallCancelled,
            ErrorKind::Unauthorized => FfiErrorKind::Unauthorized,
            ErrorKind::DecodingFailed => FfiErrorKind::DecodingFailed,
            ErrorKind::EncodingFailed => FfiErrorKind::EncodingFailed,
            ErrorKind::MalformedData => FfiErrorKind::MalformedData,
            ErrorKind::TimedOut => FfiErrorKind::TimedOut,
            ErrorKind::ServerUnavailable => FfiErrorKind::ServerUnavailable,
            ErrorKind::ServerCertificate => FfiErrorKind::ServerCertificate,
            ErrorKind::Unknown => FfiErrorKind::Unknown,
            ErrorKind::UrlResponse => FfiErrorKind::UrlResponse,
        }
    }
}

impl From<FfiErrorKind> for ErrorKind {
    fn from(kind: FfiErrorKind) -> Self {
        match kind {
            FfiErrorKind::Security => ErrorKind::Security,
            FfiErrorKind::BadRequest => ErrorKind::BadRequest,
            FfiErrorKind::ConnectionLost => ErrorKind::ConnectionLost,
            FfiErrorKind::DeviceOffline => ErrorKind::DeviceOffline,
            FfiErrorKind::DnsLookupFailed => ErrorKind::DnsLookupFailed,
            FfiErrorKind::ResourceNotFound => ErrorKind::ResourceNotFound,
            FfiErrorKind::UrlParsing => ErrorKind::UrlParsing,
            FfiErrorKind::CallCancelled => ErrorKind::CallCancelled,
            FfiErrorKind::Unauthorized => ErrorKind::Unauthorized,
            FfiErrorKind::DecodingFailed => ErrorKind::DecodingFailed,
            FfiErrorKind::EncodingFailed => ErrorKind::EncodingFailed,
            FfiErrorKind::MalformedData => ErrorKind::MalformedData,
            FfiErrorKind::TimedOut => ErrorKind::TimedOut,
            FfiErrorKind::ServerUnavailable => ErrorKind::ServerUnavailable,
            FfiErrorKind::ServerCertificate => ErrorKind::ServerCertificate,
            FfiErrorKind::Unknown => ErrorKind::Unknown,
            FfiErrorKind::UrlResponse => ErrorKind::UrlResponse,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCategory {
    Retryable = 0,
    NonRetryable = 1,
    RequiresLogout = 2,
}

impl From<ErrorCategory> for FfiErrorCategory {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Retryable => FfiErrorCategory::Retryable,
            ErrorCategory::NonRetryable => FfiErrorCategory::NonRetryable,
            ErrorCategory::RequiresLogout => FfiErrorCategory::RequiresLogout,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Outcome of an FFI call that produces a `FfiSearchResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    /// The request failed; `error_kind` and `error_category` are meaningful.
    RequestFailed = 1,
    NullArg = 2,
    Panic = 3,
}

/// A university exposed to C. `state_province` may be null.
#[repr(C)]
pub struct FfiUniversity {
    pub id: *mut c_char,
    pub alpha_two_code: *mut c_char,
    pub country: *mut c_char,
    pub name: *mut c_char,
    pub state_province: *mut c_char,
    pub domains: *mut *mut c_char,
    pub domains_len: u32,
    pub web_pages: *mut *mut c_char,
    pub web_pages_len: u32,
}

impl FfiUniversity {
    fn from_core(u: University) -> Self {
        let (domains, domains_len) = string_array(u.domains);
        let (web_pages, web_pages_len) = string_array(u.web_pages);
        FfiUniversity {
            id: to_c_string(u.id.to_string()),
            alpha_two_code: to_c_string(u.alpha_two_code),
            country: to_c_string(u.country),
            name: to_c_string(u.name),
            state_province: u.state_province.map_or(std::ptr::null_mut(), to_c_string),
            domains,
            domains_len,
            web_pages,
            web_pages_len,
        }
    }

    /// Free the fields of an `FfiUniversity` (but not the struct itself).
    fn free_fields(&self) {
        free_c_string(self.id);
        free_c_string(self.alpha_two_code);
        free_c_string(self.country);
        free_c_string(self.name);
        free_c_string(self.state_province);
        free_string_array(self.domains, self.domains_len);
        free_string_array(self.web_pages, self.web_pages_len);
    }
}

/// Result envelope for searches.
///
/// On success `status` is `Ok`, `error_message` is null and `universities`
/// points to `len` items (null when the list is empty). On a request failure
/// `status` is `RequestFailed`, `error_kind`/`error_category` classify it,
/// `error_message` holds the user-facing text (empty for cancellation) and
/// `http_status` is the response status or 0.
#[repr(C)]
pub struct FfiSearchResult {
    pub status: FfiStatus,
    pub error_kind: FfiErrorKind,
    pub error_category: FfiErrorCategory,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub universities: *mut FfiUniversity,
    pub len: u32,
}

impl FfiSearchResult {
    fn boxed(
        status: FfiStatus,
        kind: ErrorKind,
        message: Option<String>,
        http_status: u16,
        universities: Vec<University>,
    ) -> *mut Self {
        let (items, len) =
            into_raw_slice(universities.into_iter().map(FfiUniversity::from_core).collect());
        Box::into_raw(Box::new(FfiSearchResult {
            status,
            error_kind: kind.into(),
            error_category: kind.category().into(),
            error_message: message.map_or(std::ptr::null_mut(), to_c_string),
            http_status,
            universities: items,
            len,
        }))
    }

    pub(crate) fn from_result(result: Result<Vec<University>, RequestError>) -> *mut Self {
        match result {
            Ok(universities) => Self::ok(universities),
            Err(e) => Self::from_error(&e),
        }
    }

    pub(crate) fn ok(universities: Vec<University>) -> *mut Self {
        // error_kind is not meaningful on success
        Self::boxed(FfiStatus::Ok, ErrorKind::Unknown, None, 0, universities)
    }

    pub(crate) fn from_error(err: &RequestError) -> *mut Self {
        Self::boxed(
            FfiStatus::RequestFailed,
            err.kind,
            Some(err.message().to_string()),
            err.status().unwrap_or(0),
            Vec::new(),
        )
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        let msg = format!("null argument: {name}");
        Self::boxed(FfiStatus::NullArg, ErrorKind::Unknown, Some(msg), 0, Vec::new())
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiStatus::Panic, ErrorKind::Unknown, Some(msg.to_string()), 0, Vec::new())
    }

    pub(crate) fn free(ptr: *mut Self) {
        let result = unsafe { Box::from_raw(ptr) };
        free_c_string(result.error_message);
        if let Some(items) = unsafe { from_raw_slice(result.universities, result.len) } {
            for item in items.iter() {
                item.free_fields();
            }
        }
    }
}

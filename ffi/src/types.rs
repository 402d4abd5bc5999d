//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`.
//! Envelopes cross the boundary as JSON strings rather than structs, since
//! their `data` is arbitrary JSON anyway.

use std::ffi::CString;
use std::os::raw::c_char;

use habitica_core::{HttpMethod, HttpRequest};

/// Opaque handle to a `HabiticaTools`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiHabiticaTools {
    pub(crate) inner: habitica_core::HabiticaTools,
}

/// Owned C string from a Rust string. Interior NULs are dropped rather than
/// failing the call.
pub(crate) fn c_string(s: String) -> *mut c_char {
    let cleaned = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(cleaned).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
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

/// A key-value pair of C strings, used for headers and query parameters.
#[repr(C)]
pub struct FfiKeyValue {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `habitica_build_request`. The C caller executes the request
/// (encoding `query` onto `url`), then passes the response back through
/// `habitica_parse_response`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub query: *mut FfiKeyValue,
    pub query_len: u32,
    pub headers: *mut FfiKeyValue,
    pub headers_len: u32,
    /// Null when the request has no body.
    pub body: *mut c_char,
    pub timeout_ms: u64,
}

fn pairs_into_raw(pairs: Vec<(String, String)>) -> (*mut FfiKeyValue, u32) {
    if pairs.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let raw: Box<[FfiKeyValue]> = pairs
        .into_iter()
        .map(|(k, v)| FfiKeyValue {
            key: c_string(k),
            value: c_string(v),
        })
        .collect();
    let len = raw.len() as u32;
    (Box::into_raw(raw) as *mut FfiKeyValue, len)
}

/// Release pairs produced by `pairs_into_raw`.
///
/// # Safety
/// `ptr`/`len` must come from `pairs_into_raw` and not have been freed.
pub(crate) unsafe fn free_pairs(ptr: *mut FfiKeyValue, len: u32) {
    if ptr.is_null() || len == 0 {
        return;
    }
    let pairs = unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len as usize)) };
    for pair in pairs.iter() {
        if !pair.key.is_null() {
            drop(unsafe { CString::from_raw(pair.key) });
        }
        if !pair.value.is_null() {
            drop(unsafe { CString::from_raw(pair.value) });
        }
    }
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let (query, query_len) = pairs_into_raw(req.query);
        let (headers, headers_len) = pairs_into_raw(req.headers);
        let body = match req.body {
            Some(b) => c_string(b),
            None => std::ptr::null_mut(),
        };
        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            query,
            query_len,
            headers,
            headers_len,
            body,
            timeout_ms: req.timeout.as_millis() as u64,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request, then
/// passes a pointer to `habitica_parse_response`. The FFI layer reads but
/// does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    /// May be null for an empty body.
    pub body: *const c_char,
}

//! C-ABI wrapper around `habitica-core`.
//!
//! # Overview
//! Lets a host agent framework written in any language call Habitica tools by
//! name with JSON arguments and get the JSON envelope back. Two modes:
//! - `habitica_call` validates, performs the HTTP round-trip in Rust, and
//!   returns the envelope.
//! - `habitica_build_request` / `habitica_parse_response` split the call so
//!   the host can execute the request itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Envelope-returning functions always return an owned JSON string, even for
//!   null arguments or panics; the caller frees it with `habitica_free_string`.
//! - Construction returns null on configuration errors, which are logged.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use habitica_core::tools::failure;
use habitica_core::{ApiError, Envelope, HabiticaConfig, HabiticaTools, HttpResponse, Operation, ValidationError};
use serde_json::Value;

use types::*;

/// Borrow a C string as `&str`. `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn envelope_string(envelope: Envelope) -> *mut c_char {
    c_string(envelope.to_json_string())
}

fn rejected(message: impl Into<String>) -> ApiError {
    ValidationError::Constraint(message.into()).into()
}

/// Operation name for log lines, readable even when the pointer is not.
fn operation_label(operation: *const c_char) -> String {
    unsafe { read_str(operation) }.unwrap_or("<null>").to_string()
}

/// Log and encode a failure for the call named by `operation`.
fn fail(operation: *const c_char, error: ApiError) -> *mut c_char {
    envelope_string(failure(&operation_label(operation), error))
}

/// Parse tool arguments. A null pointer means "no arguments".
fn parse_args(args_json: *const c_char) -> Result<Value, ApiError> {
    if args_json.is_null() {
        return Ok(Value::Null);
    }
    let raw = unsafe { read_str(args_json) }.ok_or_else(|| rejected("Arguments must be valid UTF-8."))?;
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| rejected(format!("Arguments must be valid JSON: {e}")))
}

fn resolve_operation(operation: *const c_char) -> Result<Operation, ApiError> {
    let name = unsafe { read_str(operation) }.ok_or_else(|| rejected("null argument: operation"))?;
    Ok(Operation::from_name(name)?)
}

/// Operation and arguments, or the error that stops the call before it starts.
fn resolve_call<'a>(
    tools: *const FfiHabiticaTools,
    operation: *const c_char,
    args_json: *const c_char,
) -> Result<(&'a FfiHabiticaTools, Operation, Value), ApiError> {
    if tools.is_null() {
        return Err(rejected("null argument: tools"));
    }
    let op = resolve_operation(operation)?;
    let args = parse_args(args_json)?;
    Ok((unsafe { &*tools }, op, args))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Install a stderr log subscriber filtered at `level` (`HABITICA_LOG`
/// overrides). Returns false if one was already installed or `level` is null.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_init_logging(level: *const c_char) -> bool {
    catch_unwind(|| match unsafe { read_str(level) } {
        Some(level) => habitica_core::logging::init(level),
        None => false,
    })
    .unwrap_or(false)
}

/// Create tools bound to explicit credentials. `base_url` may be null for the
/// public Habitica API.
///
/// Returns null if a credential is null or empty, or the config is invalid.
/// The caller must free the returned pointer with `habitica_tools_free`.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_tools_new(
    user_id: *const c_char,
    api_key: *const c_char,
    base_url: *const c_char,
) -> *mut FfiHabiticaTools {
    catch_unwind(|| {
        let user_id = unsafe { read_str(user_id) }.unwrap_or_default();
        let api_key = unsafe { read_str(api_key) }.unwrap_or_default();
        let config = HabiticaConfig::new(user_id, api_key).and_then(|config| {
            match unsafe { read_str(base_url) } {
                Some(url) => config.with_base_url(url),
                None => Ok(config),
            }
        });
        match config {
            Ok(config) => Box::into_raw(Box::new(FfiHabiticaTools {
                inner: HabiticaTools::new(config),
            })),
            Err(e) => {
                tracing::error!(error = %e, "habitica tools configuration rejected");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create tools from `HABITICA_*` environment variables. Returns null if the
/// credentials are missing.
///
/// Also installs the stderr subscriber at `HABITICA_LOG_LEVEL` unless the host
/// already has one.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_tools_from_env() -> *mut FfiHabiticaTools {
    catch_unwind(|| match HabiticaTools::from_env() {
        Ok(inner) => {
            habitica_core::logging::init_from(inner.client().config());
            Box::into_raw(Box::new(FfiHabiticaTools { inner }))
        }
        Err(e) => {
            tracing::error!(error = %e, "habitica tools configuration rejected");
            std::ptr::null_mut()
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free tools created by `habitica_tools_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_tools_free(tools: *mut FfiHabiticaTools) {
    if !tools.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(tools) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Run one tool operation and return its JSON envelope.
///
/// `args_json` may be null for operations without arguments. Never returns
/// null; free the result with `habitica_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_call(
    tools: *const FfiHabiticaTools,
    operation: *const c_char,
    args_json: *const c_char,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| match resolve_call(tools, operation, args_json) {
        Ok((tools, op, args)) => envelope_string(tools.inner.call(op, &args)),
        Err(e) => fail(operation, e),
    }))
    .unwrap_or_else(|_| fail(operation, ApiError::Transport("panic in habitica_call".to_string())))
}

/// Validate arguments and describe the request without sending it.
///
/// On failure returns null and, if `out_error` is non-null, stores the JSON
/// error envelope there (free with `habitica_free_string`). Free a non-null
/// result with `habitica_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_build_request(
    tools: *const FfiHabiticaTools,
    operation: *const c_char,
    args_json: *const c_char,
    out_error: *mut *mut c_char,
) -> *mut FfiHttpRequest {
    let report = |error: ApiError| -> *mut FfiHttpRequest {
        let envelope = fail(operation, error);
        if out_error.is_null() {
            habitica_free_string(envelope);
        } else {
            unsafe { *out_error = envelope };
        }
        std::ptr::null_mut()
    };
    catch_unwind(AssertUnwindSafe(|| {
        let built = resolve_call(tools, operation, args_json)
            .and_then(|(tools, op, args)| tools.inner.client().build(op, &args));
        match built {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(e) => report(e),
        }
    }))
    .unwrap_or_else(|_| report(ApiError::Transport("panic in habitica_build_request".to_string())))
}

/// Turn a host-executed response into the JSON envelope for `operation`.
///
/// A null `response` pointer is reported as a request failure. Never returns
/// null; free the result with `habitica_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_parse_response(
    tools: *const FfiHabiticaTools,
    operation: *const c_char,
    response: *const FfiHttpResponse,
) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        let (tools, op, _) = match resolve_call(tools, operation, std::ptr::null()) {
            Ok(resolved) => resolved,
            Err(e) => return fail(operation, e),
        };
        if response.is_null() {
            return fail(operation, ApiError::Transport("no response".to_string()));
        }
        let resp = unsafe { &*response };
        let core_resp = HttpResponse {
            status: resp.status,
            headers: Vec::new(),
            body: unsafe { read_str(resp.body) }.unwrap_or_default().to_string(),
        };
        match tools.inner.client().parse(op, core_resp) {
            Ok(data) => envelope_string(Envelope::ok(data)),
            Err(e) => fail(operation, e),
        }
    }))
    .unwrap_or_else(|_| fail(operation, ApiError::Transport("panic in habitica_parse_response".to_string())))
}

/// JSON array describing every operation: name, method, path, required
/// fields and enumerated choices. Free with `habitica_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_operations() -> *mut c_char {
    catch_unwind(|| {
        let described: Vec<Value> = Operation::ALL
            .into_iter()
            .map(|op| op.call_site().describe())
            .collect();
        c_string(Value::from(described).to_string())
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `habitica_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.body.is_null() {
            drop(unsafe { CString::from_raw(req.body) });
        }
        unsafe {
            free_pairs(req.query, req.query_len);
            free_pairs(req.headers, req.headers_len);
        }
    }));
}

/// Free a string returned by any `habitica_*` function. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn habitica_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { CString::from_raw(s) });
        }));
    }
}

//! Stateless request builder and response parser for the Habitica API.
//!
//! # Design
//! `HabiticaClient` holds only the immutable configuration. Every operation
//! goes through the same two steps: `build` validates arguments against the
//! operation's `CallSite` and produces an `HttpRequest`; `parse` turns an
//! `HttpResponse` into envelope data or an `ApiError`. No I/O happens here.

use serde_json::Value;

use crate::config::HabiticaConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::operations::{CallSite, Operation, ResponseShape};
use crate::validate::Args;

#[derive(Debug, Clone)]
pub struct HabiticaClient {
    config: HabiticaConfig,
}

impl HabiticaClient {
    pub fn new(config: HabiticaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HabiticaConfig {
        &self.config
    }

    /// Headers attached to every request.
    pub fn static_headers(&self) -> Vec<(String, String)> {
        vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("x-api-user".to_string(), self.config.user_id.clone()),
            ("x-api-key".to_string(), self.config.api_key.clone()),
            ("x-client".to_string(), self.config.client_id()),
        ]
    }

    /// Validate `args` for `op` and describe the request to send.
    pub fn build(&self, op: Operation, args: &Value) -> Result<HttpRequest, ApiError> {
        let site = op.call_site();
        let args = Args::new(args)?;
        let prepared = site.prepare(&args)?;
        let path = site.render_path(&prepared.path_params)?;

        let body = prepared
            .body
            .map(|b| serde_json::to_string(&b))
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;

        Ok(HttpRequest {
            method: site.method,
            url: format!("{}{path}", self.config.base_url),
            query: prepared.query,
            headers: self.static_headers(),
            body,
            timeout: self.config.timeout(),
        })
    }

    /// Interpret the response to a request built for `op`.
    pub fn parse(&self, op: Operation, response: HttpResponse) -> Result<Value, ApiError> {
        let site = op.call_site();
        check_status(site, &response)?;
        match site.response {
            ResponseShape::Text => Ok(Value::String(response.body)),
            ResponseShape::Unwrap => {
                if response.body.trim().is_empty() {
                    return Ok(Value::Null);
                }
                let mut parsed: Value = serde_json::from_str(&response.body)
                    .map_err(|e| ApiError::Deserialization(e.to_string()))?;
                match parsed.as_object_mut().and_then(|m| m.remove("data")) {
                    Some(inner) => Ok(inner),
                    None => Ok(parsed),
                }
            }
        }
    }
}

/// Map non-2xx statuses to `NotFound` or `Http`.
fn check_status(site: &CallSite, response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    let upstream = upstream_message(&response.body);
    if response.status == 404 {
        if let Some(fallback) = site.not_found {
            return Err(ApiError::NotFound(upstream.unwrap_or_else(|| fallback.to_string())));
        }
    }
    let message = upstream.unwrap_or_else(|| {
        let body = response.body.trim();
        if body.is_empty() {
            "no response body".to_string()
        } else {
            body.to_string()
        }
    });
    Err(ApiError::Http {
        status: response.status,
        message,
    })
}

/// Habitica error bodies look like `{"success":false,"error":"NotFound","message":"..."}`.
fn upstream_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

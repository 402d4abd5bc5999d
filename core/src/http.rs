//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain data. `HabiticaClient` builds
//! `HttpRequest` values and parses `HttpResponse` values without touching the
//! network; a `Transport` executes the round-trip in between. Hosts that do
//! their own I/O (see the FFI crate) skip the transport entirely.
//!
//! Non-2xx statuses are returned as data, not as transport errors, so status
//! interpretation stays in one place (`HabiticaClient::parse`).

use std::time::Duration;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute with path parameters already substituted. Query pairs are
/// kept unencoded; the transport encodes them.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a query parameter by exact name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes one `HttpRequest`.
///
/// Implementations return `Err(ApiError::Transport)` only when no response
/// was obtained (connection refused, timeout, unreadable body). A response with
/// any status code is `Ok`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Upper bound on a response body. Full user exports exceed ureq's 10 MB default.
pub const MAX_RESPONSE_BYTES: u64 = 128 * 1024 * 1024;

/// Blocking transport backed by `ureq`.
///
/// An agent is configured per request so the descriptor's timeout is honoured
/// exactly. Status codes are never turned into errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(timeout: Duration) -> ureq::Agent {
        ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent()
    }
}

fn decorate<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = Self::agent(request.timeout);
        let url = request.url.as_str();

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => decorate(agent.get(url), request).call(),
            (HttpMethod::Delete, _) => decorate(agent.delete(url), request).call(),
            (HttpMethod::Post, Some(body)) => decorate(agent.post(url), request).send(body.as_bytes()),
            (HttpMethod::Post, None) => decorate(agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(body)) => decorate(agent.put(url), request).send(body.as_bytes()),
            (HttpMethod::Put, None) => decorate(agent.put(url), request).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()
            .map_err(|e| ApiError::Transport(format!("could not read response body: {e}")))?;

        Ok(HttpResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "https://habitica.com/api/v3/user".to_string(),
            query: vec![("userFields".to_string(), "stats".to_string())],
            headers: vec![("x-api-user".to_string(), "u-1".to_string())],
            body: None,
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request();
        assert_eq!(req.header("X-API-USER"), Some("u-1"));
        assert_eq!(req.header("x-api-key"), None);
    }

    #[test]
    fn query_lookup_is_exact() {
        let req = request();
        assert_eq!(req.query_param("userFields"), Some("stats"));
        assert_eq!(req.query_param("userfields"), None);
    }

    #[test]
    fn method_names() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }

    /// Serve one response with a `len`-byte body on a fresh port.
    fn serve_body(len: usize) -> std::net::SocketAddr {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            let mut buf = [0u8; 1024];
            while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&vec![b'x'; len]).unwrap();
        });
        addr
    }

    #[test]
    fn bodies_beyond_ten_megabytes_are_read() {
        let len = 12 * 1024 * 1024;
        let mut req = request();
        req.url = format!("http://{}/export/userdata.json", serve_body(len));
        let response = UreqTransport.execute(&req).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), len);
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let mut req = request();
        req.url = format!("http://{addr}/api/v3/user");
        req.timeout = Duration::from_secs(2);
        let err = UreqTransport.execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}

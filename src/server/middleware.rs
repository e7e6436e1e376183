//! Request middleware
//!
//! Middleware entries run in registration order before the matched handler.
//! Each entry either lets the request continue or halts it with a response;
//! once an entry halts, later entries and the handler are skipped.

use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Outcome of a middleware entry.
#[derive(Debug)]
pub enum Flow {
    Continue,
    Halt(Response),
}

pub trait Middleware: Send + Sync {
    fn handle(&self, request: &Parts) -> Flow;
}

impl<F> Middleware for F
where
    F: Fn(&Parts) -> Flow + Send + Sync,
{
    fn handle(&self, request: &Parts) -> Flow {
        self(request)
    }
}

/// Ordered list of middleware entries.
#[derive(Clone, Default)]
pub struct Pipeline {
    entries: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.entries.push(middleware);
    }

    /// Run every entry in order. Returns the halting response, if any.
    pub fn run(&self, request: &Parts) -> Option<Response> {
        for entry in &self.entries {
            if let Flow::Halt(response) = entry.handle(request) {
                return Some(response);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("entries", &self.entries.len())
            .finish()
    }
}

pub const AUTH_CHALLENGE: &str = "Basic realm=\"Authorization Required\"";

/// HTTP Basic authentication against a single credential pair.
pub struct BasicAuth {
    expected: String,
}

impl BasicAuth {
    pub fn new(username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{}:{}", username, password));
        Self {
            expected: format!("Basic {}", encoded),
        }
    }

    pub fn authorized(&self, headers: &HeaderMap) -> bool {
        let given = headers
            .get(header::AUTHORIZATION)
            .map(HeaderValue::as_bytes)
            .unwrap_or_default();
        secure_compare(given, self.expected.as_bytes())
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth").finish_non_exhaustive()
    }
}

impl Middleware for BasicAuth {
    fn handle(&self, request: &Parts) -> Flow {
        if self.authorized(&request.headers) {
            return Flow::Continue;
        }
        tracing::warn!(
            target: "auth",
            method = %request.method,
            uri = %request.uri,
            "basic auth rejected"
        );
        Flow::Halt(unauthorized_response())
    }
}

pub fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [
            (header::WWW_AUTHENTICATE, AUTH_CHALLENGE),
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        ],
        "Not Authorized",
    )
        .into_response()
}

/// Constant-time comparison of a presented credential with the expected one.
///
/// Lengths are compared in constant time first. On a length mismatch the
/// expected value is still compared against itself so the work done does not
/// depend on the presented value. Byte comparison relies on
/// `subtle::ConstantTimeEq`, which does not short-circuit on the first
/// differing byte.
pub fn secure_compare(given: &[u8], actual: &[u8]) -> bool {
    let same_len = (given.len() as u64).ct_eq(&(actual.len() as u64));
    if bool::from(same_len) {
        return given.ct_eq(actual).into();
    }
    std::hint::black_box(bool::from(actual.ct_eq(actual)));
    false
}

/// Logs every request that reaches a route. Never halts.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugLogger;

impl Middleware for DebugLogger {
    fn handle(&self, request: &Parts) -> Flow {
        tracing::info!(
            target: "http",
            method = %request.method,
            uri = %request.uri,
            version = ?request.version,
            headers = ?redacted_headers(&request.headers),
            "request"
        );
        Flow::Continue
    }
}

fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if *name == header::AUTHORIZATION {
                "[REDACTED]".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

//! Caller identity resolution.
//!
//! The principal is read from a configured request header. Requests without
//! it resolve to the anonymous identity. Nothing is verified here: the
//! gateway in front of the service is expected to authenticate the caller.

use adoption_domain::Identity;
use axum::http::{HeaderMap, HeaderName};

/// Resolve the identity of the caller of the current request.
pub fn resolve_caller(headers: &HeaderMap, header: &HeaderName) -> Identity {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Identity::new)
        .unwrap_or_else(Identity::anonymous)
}

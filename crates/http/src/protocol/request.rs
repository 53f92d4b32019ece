//! Outgoing request head.

use http::{Method, Request};

/// The head of an outgoing request: method, target uri, version and headers, no body.
pub type RequestHead = Request<()>;

/// Returns true when a request with this method is expected to carry a body,
/// so an empty one is announced with `content-length: 0`.
pub fn expects_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

//! Incoming response head.

use http::{Response, StatusCode};

/// The head of a decoded response, the body is collected separately.
pub type ResponseHead = Response<()>;

/// Returns true for statuses that never carry a body, whatever the headers say.
pub fn is_bodiless(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

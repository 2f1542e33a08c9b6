//! Shared success envelope for API handlers.
//!
//! Pipeline endpoints answer `{ "success": true, ...fields }`: the payload's
//! fields sit next to the flag rather than under a `data` key, which is the
//! shape existing clients of these functions read.

use serde::Serialize;

/// `{ "success": true, ...T }` response envelope.
///
/// `T` must serialize to a JSON object.
///
/// ```ignore
/// Ok(Json(SuccessResponse::new(QueueStatus { queues })))
/// ```
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Body for endpoints with nothing to report beyond success.
#[derive(Debug, Serialize)]
pub struct Empty {}

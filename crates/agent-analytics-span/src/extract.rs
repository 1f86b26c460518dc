//! Axum extractor for trace context from HTTP headers.
//!
//! Reads `X-Trace-Id` and `X-Parent-Span-Id`. Requests carrying neither
//! header start a new trace; a lone or malformed header is rejected with
//! 400.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::context::RemoteParent;

/// Axum extractor yielding the caller's span, if propagated.
pub struct TraceContextExtractor(pub Option<RemoteParent>);

/// Rejection for malformed trace context headers.
pub struct TraceContextRejection {
    message: String,
}

impl IntoResponse for TraceContextRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "INVALID_TRACE_CONTEXT",
                "message": self.message
            })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TraceContextExtractor {
    type Rejection = TraceContextRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        RemoteParent::from_headers(&parts.headers)
            .map(Self)
            .map_err(|e| TraceContextRejection {
                message: e.to_string(),
            })
    }
}

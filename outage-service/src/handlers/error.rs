use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use outage_client::SheetError;
use serde_json::json;

/// Route a failure came from; selects the 500 body the client expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CheckAll,
    Check,
    Transformers,
    UpdateStatus,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::CheckAll => "check_all",
            Endpoint::Check => "check",
            Endpoint::Transformers => "get_transformers",
            Endpoint::UpdateStatus => "update_status",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("{endpoint:?} upstream failure: {source}")]
    Upstream {
        endpoint: Endpoint,
        #[source]
        source: SheetError,
    },
}

impl ApiError {
    pub fn upstream(endpoint: Endpoint) -> impl FnOnce(SheetError) -> ApiError {
        move |source| ApiError::Upstream { endpoint, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": message })),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Unauthorized" })),
            )
                .into_response(),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "success": false, "message": "Request body too large" })),
            )
                .into_response(),
            ApiError::Upstream { endpoint, source } => {
                tracing::error!(endpoint = endpoint.as_str(), error = %source, "sheet request failed");
                metrics::counter!("http_upstream_failures_total", "endpoint" => endpoint.as_str()).increment(1);

                let body = match endpoint {
                    Endpoint::CheckAll | Endpoint::Check => json!({ "error": "Server error" }),
                    Endpoint::Transformers => json!({
                        "success": false,
                        "error": "Server error while fetching transformers"
                    }),
                    Endpoint::UpdateStatus => json!({ "success": false, "message": "Server error" }),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

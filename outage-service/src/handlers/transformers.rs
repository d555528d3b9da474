use axum::{extract::State, Json};
use outage_client::db::outage_queries;
use serde::Serialize;

use super::{ApiError, AppState, Endpoint};

#[derive(Debug, Serialize)]
pub struct TransformersResponse {
    pub success: bool,
    pub data: Vec<String>,
}

/// `GET /api/get-transformers`
pub async fn list(State(state): State<AppState>) -> Result<Json<TransformersResponse>, ApiError> {
    metrics::counter!("http_requests_total", "endpoint" => Endpoint::Transformers.as_str()).increment(1);

    let data = outage_queries::distinct_transformers(state.store.as_ref(), &state.layout)
        .await
        .map_err(ApiError::upstream(Endpoint::Transformers))?;

    Ok(Json(TransformersResponse { success: true, data }))
}

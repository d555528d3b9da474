use axum::{extract::rejection::JsonRejection, extract::State, Json};
use outage_client::{db::outage_queries, OutageRecord};
use serde::Serialize;
use serde_json::{json, Value};

use super::{reject_body, ApiError, AppState, Endpoint};

#[derive(Debug, Serialize)]
pub struct CheckAllResponse {
    pub success: bool,
    pub total: usize,
    pub data: Vec<OutageRecord>,
}

/// `GET /api/check-all`: every record, in sheet order.
pub async fn list(State(state): State<AppState>) -> Result<Json<CheckAllResponse>, ApiError> {
    metrics::counter!("http_requests_total", "endpoint" => Endpoint::CheckAll.as_str()).increment(1);

    let data = outage_queries::fetch_all(state.store.as_ref(), &state.layout)
        .await
        .map_err(ApiError::upstream(Endpoint::CheckAll))?;

    Ok(Json(CheckAllResponse {
        success: true,
        total: data.len(),
        data,
    }))
}

/// `POST /api/check-all`: echoes the body back.
pub async fn echo(payload: Result<Json<Value>, JsonRejection>) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(reject_body)?;
    Ok(Json(json!({ "status": "ok", "received": body })))
}

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use outage_client::db::outage_queries::{self, StatusUpdate};
use serde::{Deserialize, Serialize};

use super::{loose_string, reject_body, ApiError, AppState, Endpoint};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub transformer_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub outage_date: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub outage_start: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub outage_end: Option<String>,
}

impl UpdateStatusRequest {
    fn into_update(self) -> Result<StatusUpdate, ApiError> {
        let required = |v: Option<String>| v.filter(|s| !s.is_empty());
        match (required(self.transformer_id), required(self.status)) {
            (Some(transformer_id), Some(status)) => Ok(StatusUpdate {
                transformer_id,
                status,
                outage_date: self.outage_date,
                outage_start: self.outage_start,
                outage_end: self.outage_end,
            }),
            _ => Err(ApiError::Validation("Missing required fields".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    match state.operator_token.as_deref() {
        None => Ok(()),
        Some(expected) if bearer_token(headers) == Some(expected) => Ok(()),
        Some(_) => {
            tracing::warn!("status update rejected: missing or wrong operator token");
            Err(ApiError::Unauthorized)
        }
    }
}

/// `POST /api/update-status`: overwrite the status of every row of a
/// transformer. Unknown transformers answer 200 with `success: false`.
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    metrics::counter!("http_requests_total", "endpoint" => Endpoint::UpdateStatus.as_str()).increment(1);
    authorize(&state, &headers)?;

    let Json(req) = payload.map_err(reject_body)?;
    let update = req.into_update()?;

    let updated = outage_queries::update_transformer_status(state.store.as_ref(), &state.layout, &update)
        .await
        .map_err(ApiError::upstream(Endpoint::UpdateStatus))?;

    if updated == 0 {
        tracing::info!(transformer_id = %update.transformer_id, "status update for unknown transformer");
        return Ok(Json(UpdateStatusResponse {
            success: false,
            updated: 0,
            message: Some("Transformer not found".to_string()),
        }));
    }

    metrics::counter!("outage_status_rows_updated_total").increment(updated as u64);
    Ok(Json(UpdateStatusResponse {
        success: true,
        updated,
        message: None,
    }))
}

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use outage_client::{db::outage_queries, OutageRecord};
use serde::{Deserialize, Serialize};

use super::{loose_string, reject_body, ApiError, AppState, Endpoint};

#[derive(Debug, Default, Deserialize)]
pub struct LookupRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub meter_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OutageRecord>,
}

/// `POST /api/check`: first record matching the meter OR the customer.
pub async fn lookup(
    State(state): State<AppState>,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Json<LookupResponse>, ApiError> {
    metrics::counter!("http_requests_total", "endpoint" => Endpoint::Check.as_str()).increment(1);
    let Json(req) = payload.map_err(reject_body)?;

    let result = outage_queries::find_by_meter_or_customer(
        state.store.as_ref(),
        &state.layout,
        req.meter_id.as_deref(),
        req.customer_id.as_deref(),
    )
    .await
    .map_err(ApiError::upstream(Endpoint::Check))?;

    if result.is_none() {
        metrics::counter!("outage_lookup_misses_total").increment(1);
    }

    Ok(Json(LookupResponse {
        found: result.is_some(),
        result,
    }))
}

pub mod check;
pub mod check_all;
pub mod error;
pub mod transformers;
pub mod update_status;

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, http::StatusCode};
use outage_client::{db::outage_queries::SheetLayout, SheetStore};
use serde::{Deserialize, Deserializer};

pub use error::{ApiError, Endpoint};

/// Shared by every handler; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SheetStore>,
    pub layout: Arc<SheetLayout>,
    pub operator_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(store: Arc<dyn SheetStore>, layout: SheetLayout, operator_token: Option<String>) -> Self {
        Self {
            store,
            layout: Arc::new(layout),
            operator_token: operator_token.map(Arc::from),
        }
    }
}

/// Accept identifiers sent as JSON strings or numbers. Anything else
/// (null, bool, objects) is treated as absent.
pub(crate) fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(number_text(&n)),
        _ => None,
    })
}

/// Integral floats print without a fraction (`1001.0` -> `"1001"`) so they
/// compare equal to the sheet's integer cells.
fn number_text(n: &serde_json::Number) -> String {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

pub(crate) fn reject_body(rejection: JsonRejection) -> ApiError {
    tracing::debug!(error = %rejection, "rejected request body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    ApiError::Validation("Invalid JSON body".to_string())
}

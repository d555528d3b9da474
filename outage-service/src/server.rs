use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::handlers::{check, check_all, transformers, update_status, AppState};

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/check-all", get(check_all::list).post(check_all::echo))
        .route("/api/check", post(check::lookup))
        .route("/api/get-transformers", get(transformers::list))
        .route("/api/update-status", post(update_status::update))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serve until Ctrl-C or SIGTERM, then let in-flight requests finish.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use outage_client::{
        db::outage_queries::SheetLayout,
        sheets::{A1Range, CellUpdate, InMemorySheet},
        OutageRecord, SheetError, SheetStore,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    struct FailingStore;

    #[async_trait::async_trait]
    impl SheetStore for FailingStore {
        async fn read_range(&self, _range: &A1Range) -> Result<Vec<Vec<String>>, SheetError> {
            Err(SheetError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            })
        }

        async fn write_cells(&self, _updates: &[CellUpdate]) -> Result<(), SheetError> {
            Err(SheetError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            })
        }
    }

    fn rec(meter: &str, customer: &str, transformer: &str) -> OutageRecord {
        OutageRecord {
            meter_id: meter.to_string(),
            customer_id: customer.to_string(),
            transformer_id: transformer.to_string(),
            outage_start: "08:00".to_string(),
            outage_end: "12:00".to_string(),
            outage_date: "2024-05-01".to_string(),
            latitude: "13.75".to_string(),
            longitude: "100.50".to_string(),
            location: "Moo 3".to_string(),
            status: "0".to_string(),
            ..Default::default()
        }
    }

    fn sheet() -> Arc<InMemorySheet> {
        Arc::new(InMemorySheet::from_records(
            "Sheet1",
            &[
                rec("1001", "C-01", "TX-7"),
                rec("1002", "C-02", "TX-3"),
                rec("1003", "C-03", "TX-7"),
                rec("1004", "C-04", " "),
            ],
        ))
    }

    fn app_with(store: Arc<dyn SheetStore>, token: Option<&str>) -> Router {
        let state = AppState::new(store, SheetLayout::default(), token.map(str::to_string));
        router(state, 16 * 1024)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn check_all_returns_every_row_with_total() {
        let (status, body) = send(app_with(sheet(), None), get("/api/check-all")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["total"], 4);
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"][0]["meter_id"], "1001");
        assert_eq!(body["data"][0]["name"], "");
    }

    #[tokio::test]
    async fn check_all_post_echoes_body() {
        let (status, body) = send(
            app_with(sheet(), None),
            post_json("/api/check-all", json!({ "ping": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "received": { "ping": 1 } }));
    }

    #[tokio::test]
    async fn check_finds_by_numeric_meter_id() {
        let (status, body) = send(
            app_with(sheet(), None),
            post_json("/api/check", json!({ "meter_id": 1003 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["found"], true);
        assert_eq!(body["result"]["meter_id"], "1003");
        assert_eq!(body["result"]["transformer_id"], "TX-7");
    }

    #[tokio::test]
    async fn check_falls_back_to_customer_id() {
        let (_, body) = send(
            app_with(sheet(), None),
            post_json("/api/check", json!({ "meter_id": "9999", "customer_id": "C-02" })),
        )
        .await;
        assert_eq!(body["found"], true);
        assert_eq!(body["result"]["meter_id"], "1002");
    }

    #[tokio::test]
    async fn check_miss_and_empty_body_report_not_found() {
        let (status, body) = send(
            app_with(sheet(), None),
            post_json("/api/check", json!({ "meter_id": "9999" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "found": false }));

        let (status, body) = send(app_with(sheet(), None), post_json("/api/check", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "found": false }));
    }

    #[tokio::test]
    async fn malformed_json_is_a_client_error() {
        let req = Request::builder()
            .method("POST")
            .uri("/api/check")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app_with(sheet(), None), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn transformers_are_unique_and_non_blank() {
        let (status, body) = send(app_with(sheet(), None), get("/api/get-transformers")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "data": ["TX-7", "TX-3"] }));
    }

    #[tokio::test]
    async fn update_status_rewrites_all_rows_of_transformer() {
        let store = sheet();
        let (status, body) = send(
            app_with(store.clone(), None),
            post_json("/api/update-status", json!({ "transformer_id": "TX-7", "status": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "updated": 2 }));

        assert_eq!(store.status_cell(2).as_deref(), Some("1"));
        assert_eq!(store.status_cell(3).as_deref(), Some("0"));
        assert_eq!(store.status_cell(4).as_deref(), Some("1"));
        let row = store.record_at(2).unwrap();
        assert_eq!(row.meter_id, "1001");
        assert_eq!(row.customer_id, "C-01");
        assert_eq!(row.outage_start, "08:00");
    }

    #[tokio::test]
    async fn update_status_without_status_is_400_and_writes_nothing() {
        let store = sheet();
        let (status, body) = send(
            app_with(store.clone(), None),
            post_json("/api/update-status", json!({ "transformer_id": "TX-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "success": false, "message": "Missing required fields" }));
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn update_status_for_unknown_transformer_is_not_found() {
        let store = sheet();
        let (status, body) = send(
            app_with(store.clone(), None),
            post_json("/api/update-status", json!({ "transformer_id": "TX-404", "status": "2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["updated"], 0);
        assert_eq!(body["message"], "Transformer not found");
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn operator_token_guards_status_updates() {
        let store = sheet();
        let payload = json!({ "transformer_id": "TX-3", "status": "2" });

        let (status, _) = send(
            app_with(store.clone(), Some("ops-secret")),
            post_json("/api/update-status", payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut req = post_json("/api/update-status", payload.clone());
        req.headers_mut()
            .insert("authorization", "Bearer wrong".parse().unwrap());
        let (status, _) = send(app_with(store.clone(), Some("ops-secret")), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(store.write_calls(), 0);

        let mut req = post_json("/api/update-status", payload);
        req.headers_mut()
            .insert("authorization", "Bearer ops-secret".parse().unwrap());
        let (status, body) = send(app_with(store.clone(), Some("ops-secret")), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);
        assert_eq!(store.status_cell(3).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn lookups_stay_open_when_operator_token_is_set() {
        let (status, _) = send(app_with(sheet(), Some("ops-secret")), get("/api/check-all")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn upstream_failures_are_generic_500s() {
        let store: Arc<dyn SheetStore> = Arc::new(FailingStore);

        let (status, body) = send(app_with(store.clone(), None), get("/api/check-all")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server error" }));

        let (status, body) = send(
            app_with(store.clone(), None),
            post_json("/api/check", json!({ "customer_id": "C-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Server error" }));

        let (status, body) = send(app_with(store.clone(), None), get("/api/get-transformers")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "success": false, "error": "Server error while fetching transformers" })
        );

        let (status, body) = send(
            app_with(store, None),
            post_json("/api/update-status", json!({ "transformer_id": "TX-7", "status": "1" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "success": false, "message": "Server error" }));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let big = "x".repeat(32 * 1024);
        let (status, body) = send(
            app_with(sheet(), None),
            post_json("/api/check", json!({ "meter_id": big })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "success": false, "message": "Request body too large" }));
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let (status, body) = send(app_with(sheet(), None), get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use outage_client::sheets::GoogleSheetsClient;
use outage_service::{config::AppConfig, metrics_server, observability, server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    // One client for the process lifetime; the access token is cached inside it.
    let credentials = cfg.credentials()?;
    let sheets = GoogleSheetsClient::with_service_account(cfg.google_config(), &credentials, &cfg.sheets.token_url)
        .context("building Google Sheets client")?;

    if cfg.server.operator_token.is_none() {
        tracing::warn!("no operator token configured; /api/update-status is open to any caller");
    }

    let state = AppState::new(Arc::new(sheets), cfg.layout(), cfg.server.operator_token.clone());
    let app = server::router(state, cfg.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind_addr))?;
    tracing::info!(
        addr = %cfg.server.bind_addr,
        spreadsheet_id = %cfg.sheets.spreadsheet_id,
        worksheet = %cfg.sheets.worksheet,
        "outage service listening"
    );

    server::serve(listener, app).await?;
    Ok(())
}

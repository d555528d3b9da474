use anyhow::{bail, Result};
use outage_client::{db::outage_queries, sheets::GoogleSheetsClient};
use outage_service::{config::AppConfig, observability};
use serde_json::json;
use std::env;

/// Print the current outage sheet as JSON, the same shape the HTTP API
/// returns. `--transformers` prints the distinct transformer list instead.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let transformers_only = match args.as_slice() {
        [] => false,
        [flag] if flag == "--transformers" => true,
        _ => bail!("usage: outage_snapshot [--transformers]"),
    };

    let cfg = AppConfig::load()?;
    let credentials = cfg.credentials()?;
    let sheets = GoogleSheetsClient::with_service_account(cfg.google_config(), &credentials, &cfg.sheets.token_url)?;
    let layout = cfg.layout();

    let out = if transformers_only {
        let data = outage_queries::distinct_transformers(&sheets, &layout).await?;
        json!({ "success": true, "data": data })
    } else {
        let data = outage_queries::fetch_all(&sheets, &layout).await?;
        json!({ "success": true, "total": data.len(), "data": data })
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

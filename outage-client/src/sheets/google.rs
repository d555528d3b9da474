use std::{sync::Arc, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{
    auth::{AccessTokenSource, ServiceAccountCredentials, ServiceAccountTokenSource},
    A1Range, CellUpdate, SheetError, SheetStore,
};

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Retries for reads only; batch writes are sent once.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl GoogleSheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest {
    value_input_option: &'static str,
    data: Vec<ValueRangeWrite>,
}

#[derive(Debug, Serialize)]
struct ValueRangeWrite {
    range: String,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: u64,
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_retryable(err: &SheetError) -> bool {
    match err {
        SheetError::Http(_) => true,
        SheetError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Google Sheets v4 values API.
///
/// One instance is built at startup and shared; the underlying
/// `reqwest::Client` pools connections and the token source caches the
/// access token between calls.
pub struct GoogleSheetsClient {
    http: reqwest::Client,
    base: Url,
    config: GoogleSheetsConfig,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GoogleSheetsClient {
    pub fn new(
        config: GoogleSheetsConfig,
        tokens: Arc<dyn AccessTokenSource>,
        http: reqwest::Client,
    ) -> Result<Self, SheetError> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(SheetError::Config("spreadsheet_id is empty".to_string()));
        }
        let base = Url::parse(&config.api_base_url)
            .map_err(|e| SheetError::Config(format!("invalid api_base_url: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(SheetError::Config(format!(
                "api_base_url '{}' cannot carry a path",
                config.api_base_url
            )));
        }

        Ok(Self {
            http,
            base,
            config,
            tokens,
        })
    }

    /// Client authenticated as a service account against `token_url`.
    pub fn with_service_account(
        config: GoogleSheetsConfig,
        credentials: &ServiceAccountCredentials,
        token_url: &str,
    ) -> Result<Self, SheetError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let tokens = ServiceAccountTokenSource::new(credentials, token_url, http.clone())?;
        Self::new(config, Arc::new(tokens), http)
    }

    fn url(&self, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in `new`, so the segments are available.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.config.spreadsheet_id.as_str()])
                .extend(tail);
        }
        url
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_values(&self, range: &A1Range) -> Result<Vec<Vec<String>>, SheetError> {
        let token = self.tokens.access_token().await?;
        let range_text = range.to_string();
        let url = self.url(&["values", range_text.as_str()]);

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let body: ValueRange = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetError::Decode(e.to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

#[async_trait::async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn read_range(&self, range: &A1Range) -> Result<Vec<Vec<String>>, SheetError> {
        let started = std::time::Instant::now();
        let mut attempt: u32 = 0;
        loop {
            match self.get_values(range).await {
                Ok(rows) => {
                    metrics::counter!("sheets_reads_total").increment(1);
                    metrics::histogram!("sheets_read_latency_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::debug!(range = %range, rows = rows.len(), "read sheet range");
                    return Ok(rows);
                }
                Err(e) if attempt < self.config.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        range = %range,
                        "sheet read failed, retrying with backoff"
                    );
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => {
                    metrics::counter!("sheets_errors_total").increment(1);
                    return Err(e);
                }
            }
        }
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> Result<(), SheetError> {
        if updates.is_empty() {
            return Ok(());
        }

        let request = BatchUpdateRequest {
            value_input_option: "USER_ENTERED",
            data: updates
                .iter()
                .map(|u| ValueRangeWrite {
                    range: u.cell.to_string(),
                    values: vec![vec![u.value.clone()]],
                })
                .collect(),
        };

        let token = self.tokens.access_token().await?;
        let url = self.url(&["values:batchUpdate"]);

        let result = async {
            let response = self
                .http
                .post(url)
                .bearer_auth(token)
                .json(&request)
                .send()
                .await?;
            let body: BatchUpdateResponse = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| SheetError::Decode(e.to_string()))?;
            Ok::<_, SheetError>(body)
        }
        .await;

        match result {
            Ok(body) => {
                metrics::counter!("sheets_cells_written_total").increment(updates.len() as u64);
                tracing::debug!(
                    requested = updates.len(),
                    updated = body.total_updated_cells,
                    "batch cell update applied"
                );
                Ok(())
            }
            Err(e) => {
                metrics::counter!("sheets_errors_total").increment(1);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::StaticToken;

    fn client(base: &str) -> Result<GoogleSheetsClient, SheetError> {
        let mut cfg = GoogleSheetsConfig::new("sheet-123");
        cfg.api_base_url = base.to_string();
        GoogleSheetsClient::new(
            cfg,
            Arc::new(StaticToken("t".to_string())),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn values_url_appends_range_segment() {
        let c = client("https://sheets.googleapis.com/").unwrap();
        let range = A1Range::parse("Sheet1!A2:L").unwrap();
        let text = range.to_string();
        let url = c.url(&["values", text.as_str()]);
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/Sheet1!A2:L"
        );
    }

    #[test]
    fn batch_update_url_keeps_colon_method_suffix() {
        let c = client("http://127.0.0.1:9000").unwrap();
        let url = c.url(&["values:batchUpdate"]);
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9000/v4/spreadsheets/sheet-123/values:batchUpdate"
        );
    }

    #[test]
    fn rejects_bad_base_url_and_empty_sheet_id() {
        assert!(matches!(client("not a url"), Err(SheetError::Config(_))));
        assert!(matches!(client("mailto:ops@example.com"), Err(SheetError::Config(_))));

        let res = GoogleSheetsClient::new(
            GoogleSheetsConfig::new(""),
            Arc::new(StaticToken("t".to_string())),
            reqwest::Client::new(),
        );
        assert!(matches!(res, Err(SheetError::Config(_))));
    }

    #[test]
    fn numeric_cells_render_as_strings() {
        assert_eq!(cell_to_string(serde_json::json!("TX-7")), "TX-7");
        assert_eq!(cell_to_string(serde_json::json!(1001)), "1001");
        assert_eq!(cell_to_string(serde_json::json!(13.75)), "13.75");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(is_retryable(&SheetError::Status { status: 503, body: String::new() }));
        assert!(is_retryable(&SheetError::Status { status: 429, body: String::new() }));
        assert!(!is_retryable(&SheetError::Status { status: 403, body: String::new() }));
        assert!(!is_retryable(&SheetError::Decode("x".to_string())));
    }
}

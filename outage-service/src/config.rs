use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use outage_client::db::outage_queries::SheetLayout;
use outage_client::sheets::{auth::GOOGLE_TOKEN_URL, google::DEFAULT_API_BASE_URL, GoogleSheetsConfig, ServiceAccountCredentials};
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "outage-config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// When set, status updates require `Authorization: Bearer <token>`.
    pub operator_token: Option<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            operator_token: None,
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub first_data_row: u32,
    pub api_base_url: String,
    pub token_url: String,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            worksheet: "Sheet1".to_string(),
            first_data_row: 2,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            client_email: None,
            private_key: None,
            request_timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 250,
        }
    }
}

impl std::fmt::Debug for SheetsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("worksheet", &self.worksheet)
            .field("first_data_row", &self.first_data_row)
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    /// Read the TOML file named by `OUTAGE_CONFIG` (default
    /// `outage-config.toml`), then apply `GOOGLE_*` environment overrides.
    /// A missing default file is not an error; an explicit path must exist.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let explicit = env::var("OUTAGE_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut cfg = if explicit.is_none() && !Path::new(&path).exists() {
            tracing::info!(path = %path, "no config file, using defaults and environment");
            AppConfig::default()
        } else {
            let contents = fs::read_to_string(&path).with_context(|| format!("reading config file {path}"))?;
            Self::from_toml_str(&contents).with_context(|| format!("parsing config file {path}"))?
        };

        cfg.apply_env_overrides(|key| env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_env_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = get("GOOGLE_SHEET_ID") {
            self.sheets.spreadsheet_id = id;
        }
        if let Some(email) = get("GOOGLE_CLIENT_EMAIL") {
            self.sheets.client_email = Some(email);
        }
        if let Some(key) = get("GOOGLE_PRIVATE_KEY") {
            self.sheets.private_key = Some(key);
        }
        if let Some(token) = get("OUTAGE_OPERATOR_TOKEN") {
            self.server.operator_token = Some(token);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sheets.spreadsheet_id.trim().is_empty() {
            bail!("sheets.spreadsheet_id is not set (config file or GOOGLE_SHEET_ID)");
        }
        if self.sheets.worksheet.is_empty() {
            bail!("sheets.worksheet must not be empty");
        }
        if self.sheets.first_data_row == 0 {
            bail!("sheets.first_data_row is one-based and must be at least 1");
        }
        if self.server.operator_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            bail!("server.operator_token is set but empty");
        }
        Ok(())
    }

    pub fn layout(&self) -> SheetLayout {
        SheetLayout {
            worksheet: self.sheets.worksheet.clone(),
            first_data_row: self.sheets.first_data_row,
        }
    }

    pub fn google_config(&self) -> GoogleSheetsConfig {
        GoogleSheetsConfig {
            spreadsheet_id: self.sheets.spreadsheet_id.clone(),
            api_base_url: self.sheets.api_base_url.clone(),
            request_timeout: Duration::from_secs(self.sheets.request_timeout_secs),
            max_retries: self.sheets.max_retries,
            retry_backoff: Duration::from_millis(self.sheets.retry_backoff_ms),
        }
    }

    pub fn credentials(&self) -> anyhow::Result<ServiceAccountCredentials> {
        match (&self.sheets.client_email, &self.sheets.private_key) {
            (Some(email), Some(key)) => Ok(ServiceAccountCredentials::new(email.clone(), key)),
            _ => bail!("service account credentials missing (GOOGLE_CLIENT_EMAIL / GOOGLE_PRIVATE_KEY)"),
        }
    }
}

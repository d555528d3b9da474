use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use super::SheetError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::hours(1);
/// Refresh this long before the upstream expiry.
const REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Supplies bearer tokens for Sheets API calls.
#[async_trait::async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, SheetError>;
}

/// Fixed token, for emulators and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait::async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, SheetError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccountCredentials {
    /// Keys pasted into environment variables usually carry literal `\n`
    /// sequences instead of newlines; those are unescaped here.
    pub fn new(client_email: impl Into<String>, private_key: &str) -> Self {
        Self {
            client_email: client_email.into(),
            private_key: private_key.replace("\\n", "\n"),
        }
    }
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

struct CachedToken {
    token: String,
    expires_at: OffsetDateTime,
}

/// OAuth2 JWT-bearer flow for a Google service account, with the access
/// token cached until shortly before it expires.
pub struct ServiceAccountTokenSource {
    client_email: String,
    key: EncodingKey,
    token_url: String,
    scope: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(
        credentials: &ServiceAccountCredentials,
        token_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, SheetError> {
        if credentials.client_email.trim().is_empty() {
            return Err(SheetError::Credentials("client_email is empty".to_string()));
        }
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| SheetError::Credentials(format!("invalid private key: {e}")))?;

        Ok(Self {
            client_email: credentials.client_email.clone(),
            key,
            token_url: token_url.into(),
            scope: SPREADSHEETS_SCOPE.to_string(),
            http,
            cached: Mutex::new(None),
        })
    }

    fn assertion(&self, now: OffsetDateTime) -> Result<String, SheetError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: &self.scope,
            aud: &self.token_url,
            iat: now.unix_timestamp(),
            exp: (now + ASSERTION_LIFETIME).unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| SheetError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn fetch_token(&self, now: OffsetDateTime) -> Result<CachedToken, SheetError> {
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SheetError::Auth(format!("token response parse failed: {e}")))?;

        let lifetime = token
            .expires_in
            .map(Duration::seconds)
            .unwrap_or(ASSERTION_LIFETIME);

        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + lifetime,
        })
    }
}

#[async_trait::async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, SheetError> {
        let mut guard = self.cached.lock().await;
        let now = OffsetDateTime::now_utc();

        if let Some(cached) = guard.as_ref() {
            if now + REFRESH_MARGIN < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        tracing::debug!(client_email = %self.client_email, "refreshing sheets access token");
        metrics::counter!("sheets_token_refresh_total").increment(1);

        let fresh = self.fetch_token(now).await?;
        let token = fresh.token.clone();
        *guard = Some(fresh);
        Ok(token)
    }
}

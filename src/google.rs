use crate::backend::{parse_spreadsheet_url, SheetBackend, SheetError, SpreadsheetRef};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io;
use std::path::Path;
use tokio::sync::Mutex;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

const NEW_TAB_ROWS: u32 = 1000;
const NEW_TAB_COLUMNS: u32 = 4;

/// The fields of a Google service-account key file that the client needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Load a key file downloaded from the Google Cloud console.
    ///
    /// **Returns**
    /// - `Err(SheetError::MissingCredentials)` if the file does not exist.
    /// - `Err(SheetError::InvalidCredentials)` if it cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SheetError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SheetError::MissingCredentials { path: path.to_path_buf() });
            }
            Err(e) => {
                return Err(SheetError::InvalidCredentials {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        serde_json::from_str(&text).map_err(|e| SheetError::InvalidCredentials {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
    spreadsheet_url: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// [`SheetBackend`] talking to the Sheets v4 and Drive v3 REST APIs with a
/// service-account token.
pub struct GoogleSheetsClient {
    client: Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
}

impl GoogleSheetsClient {
    /// Build a client from a service-account key file.
    ///
    /// The file is read and the private key parsed eagerly, so a missing
    /// or malformed key fails here rather than on the first request.
    pub fn from_service_account_file(path: &Path) -> Result<Self, SheetError> {
        let key = ServiceAccountKey::from_file(path)?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            SheetError::InvalidCredentials {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            key,
            signing_key,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, SheetError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(60) {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, SheetError> {
        let token_uri = self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = Utc::now();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + 3600,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let assertion = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| SheetError::Auth(e.to_string()))?;

        let resp = self
            .client
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(SheetError::Auth(format!("token grant failed with status {}: {}", status, text)));
        }

        let token: TokenResponse = resp.json().await?;
        tracing::debug!(expires_in = token.expires_in, "obtained sheets access token");
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

async fn check(resp: Response) -> Result<Response, SheetError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
    Err(SheetError::Api { status: status.as_u16(), body })
}

/// A1 range covering a whole tab, quoted and percent-encoded for a URL path.
fn tab_range(title: &str) -> String {
    let quoted = format!("'{}'", title.replace('\'', "''"));
    urlencoding::encode(&quoted).into_owned()
}

fn top_left(title: &str) -> String {
    let quoted = format!("'{}'!A1", title.replace('\'', "''"));
    urlencoding::encode(&quoted).into_owned()
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetBackend for GoogleSheetsClient {
    async fn open_by_url(&self, url: &str) -> Result<SpreadsheetRef, SheetError> {
        let id = parse_spreadsheet_url(url)?;
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(format!("{}/{}?fields=spreadsheetId", SHEETS_API, id))
            .bearer_auth(token)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SheetError::NotFound(url.to_string()));
        }
        check(resp).await?;
        Ok(SpreadsheetRef { id, url: url.to_string() })
    }

    async fn create(&self, title: &str) -> Result<SpreadsheetRef, SheetError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(SHEETS_API)
            .bearer_auth(token)
            .json(&json!({ "properties": { "title": title } }))
            .send()
            .await?;
        let created: CreatedSpreadsheet = check(resp).await?.json().await?;
        tracing::info!(url = %created.spreadsheet_url, "created spreadsheet");
        Ok(SpreadsheetRef {
            id: created.spreadsheet_id,
            url: created.spreadsheet_url,
        })
    }

    async fn share(&self, sheet: &SpreadsheetRef, email: &str) -> Result<(), SheetError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(format!(
                "{}/{}/permissions?sendNotificationEmail=false&supportsAllDrives=true",
                DRIVE_API, sheet.id
            ))
            .bearer_auth(token)
            .json(&json!({ "type": "user", "role": "writer", "emailAddress": email }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn ensure_worksheet(&self, sheet: &SpreadsheetRef, title: &str) -> Result<bool, SheetError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(format!("{}/{}?fields=sheets.properties.title", SHEETS_API, sheet.id))
            .bearer_auth(&token)
            .send()
            .await?;
        let meta: SpreadsheetMeta = check(resp).await?.json().await?;
        if meta.sheets.iter().any(|s| s.properties.title == title) {
            return Ok(false);
        }

        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": NEW_TAB_ROWS, "columnCount": NEW_TAB_COLUMNS }
                    }
                }
            }]
        });
        let resp = self
            .client
            .post(format!("{}/{}:batchUpdate", SHEETS_API, sheet.id))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(true)
    }

    async fn read_all(&self, sheet: &SpreadsheetRef, title: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(format!("{}/{}/values/{}", SHEETS_API, sheet.id, tab_range(title)))
            .bearer_auth(token)
            .send()
            .await?;
        let range: ValueRange = check(resp).await?.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append_row(&self, sheet: &SpreadsheetRef, title: &str, row: &[String]) -> Result<(), SheetError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(format!(
                "{}/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
                SHEETS_API,
                sheet.id,
                tab_range(title)
            ))
            .bearer_auth(token)
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn replace_all(&self, sheet: &SpreadsheetRef, title: &str, rows: &[Vec<String>]) -> Result<(), SheetError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .post(format!("{}/{}/values/{}:clear", SHEETS_API, sheet.id, tab_range(title)))
            .bearer_auth(&token)
            .json(&json!({}))
            .send()
            .await?;
        check(resp).await?;

        let resp = self
            .client
            .put(format!(
                "{}/{}/values/{}?valueInputOption=RAW",
                SHEETS_API,
                sheet.id,
                top_left(title)
            ))
            .bearer_auth(&token)
            .json(&json!({ "majorDimension": "ROWS", "values": rows }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

//! # Google Sheets Ledger
//!
//! Ledger stored in the first tab of a Google spreadsheet, accessed through the
//! Sheets v4 REST API with a service account. Access tokens are obtained with
//! the JWT bearer grant and reused until shortly before they expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::{Ledger, LedgerError, Row, LEDGER_COLUMNS};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// The fields we need from a service-account key file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(json).map_err(|e| LedgerError::Credentials(e.to_string()))
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
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Service-account OAuth token source
struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    fn new(key: ServiceAccountKey) -> Result<Self, LedgerError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| LedgerError::Credentials(e.to_string()))?;
        Ok(Self {
            key,
            encoding_key,
            token: Mutex::new(None),
        })
    }

    fn token_uri(&self) -> &str {
        self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    async fn access_token(&self, client: &Client) -> Result<String, LedgerError> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let issued_at = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: self.token_uri(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
                .map_err(|e| LedgerError::Credentials(e.to_string()))?;

        let response = client
            .post(self.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Auth(format!("{status}: {body}")));
        }

        let granted: TokenResponse = response.json().await?;
        let lifetime =
            Duration::from_secs(granted.expires_in.unwrap_or(TOKEN_LIFETIME_SECS as u64));
        debug!("Obtained access token valid for {:?}", lifetime);

        *token = Some(CachedToken {
            value: granted.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(granted.access_token)
    }
}

/// Id and title of the tab holding the ledger
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetProperties {
    #[serde(rename = "sheetId")]
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Ledger in a Google spreadsheet
pub struct SheetsLedger {
    client: Client,
    spreadsheet_id: String,
    sheet: SheetProperties,
    auth: ServiceAccountAuth,
}

impl SheetsLedger {
    /// Authenticate and look up the first tab of the spreadsheet
    pub async fn connect(
        spreadsheet_id: &str,
        service_account_json: &str,
    ) -> Result<Self, LedgerError> {
        let key = ServiceAccountKey::from_json(service_account_json)?;
        info!("Connecting to spreadsheet {} as {}", spreadsheet_id, key.client_email);

        let client = Client::new();
        let auth = ServiceAccountAuth::new(key)?;

        let url = endpoint(&[spreadsheet_id])?;
        let token = auth.access_token(&client).await?;
        let response = checked(
            client
                .get(url)
                .query(&[("fields", "sheets.properties(sheetId,title)")])
                .bearer_auth(token),
        )
        .await?;
        let meta: SpreadsheetMeta = response.json().await?;
        let sheet = meta
            .sheets
            .into_iter()
            .next()
            .map(|entry| entry.properties)
            .ok_or_else(|| LedgerError::Malformed("spreadsheet has no sheets".to_string()))?;

        info!("Using sheet '{}' (id {})", sheet.title, sheet.sheet_id);
        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet,
            auth,
        })
    }

    pub fn sheet(&self) -> &SheetProperties {
        &self.sheet
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<Response, LedgerError> {
        let token = self.auth.access_token(&self.client).await?;
        checked(request.bearer_auth(token)).await
    }

    async fn batch_update(&self, request: Value) -> Result<(), LedgerError> {
        let path = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = endpoint(&[path.as_str()])?;
        self.authorized(self.client.post(url).json(&json!({ "requests": [request] })))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn read_rows(&self) -> Result<Vec<Row>, LedgerError> {
        let range = a1_range(&self.sheet.title);
        let url = endpoint(&[self.spreadsheet_id.as_str(), "values", range.as_str()])?;
        let response = self.authorized(self.client.get(url)).await?;
        let body: ValueRange = response.json().await?;
        debug!("Read {} rows from sheet '{}'", body.values.len(), self.sheet.title);
        Ok(body.values.into_iter().map(cells_to_row).collect())
    }

    async fn append_row(&self, row: Row) -> Result<(), LedgerError> {
        let range = a1_range(&self.sheet.title);
        let append = format!("{range}:append");
        let url = endpoint(&[self.spreadsheet_id.as_str(), "values", append.as_str()])?;
        self.authorized(
            self.client
                .post(url)
                .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
                .json(&json!({ "values": [row] })),
        )
        .await?;
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), LedgerError> {
        if row_number == 0 {
            return Err(LedgerError::RowOutOfRange(row_number));
        }
        self.batch_update(delete_row_request(self.sheet.sheet_id, row_number))
            .await
    }

    async fn format_row(&self, row_number: usize) -> Result<(), LedgerError> {
        if row_number == 0 {
            return Err(LedgerError::RowOutOfRange(row_number));
        }
        self.batch_update(format_row_request(self.sheet.sheet_id, row_number))
            .await
    }
}

/// Send a request and turn a non-success status into [`LedgerError::Api`]
async fn checked(request: RequestBuilder) -> Result<Response, LedgerError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(LedgerError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Sheets API URL with the given path segments appended (percent-encoded)
pub fn endpoint(segments: &[&str]) -> Result<Url, LedgerError> {
    let mut url = Url::parse(SHEETS_API_BASE).map_err(|e| LedgerError::Malformed(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| LedgerError::Malformed("API base URL cannot take a path".to_string()))?
        .extend(segments);
    Ok(url)
}

/// `'Title'!A:N` with quotes in the title doubled
pub fn a1_range(title: &str) -> String {
    format!("'{}'!A:N", title.replace('\'', "''"))
}

fn cells_to_row(cells: Vec<Value>) -> Row {
    cells
        .into_iter()
        .map(|cell| match cell {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect()
}

/// `deleteDimension` request for one 1-based row
pub fn delete_row_request(sheet_id: i64, row_number: usize) -> Value {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": row_number - 1,
                "endIndex": row_number
            }
        }
    })
}

/// `repeatCell` request centering and bordering columns A..N of one row
pub fn format_row_request(sheet_id: i64, row_number: usize) -> Value {
    let solid = json!({ "style": "SOLID" });
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": row_number - 1,
                "endRowIndex": row_number,
                "startColumnIndex": 0,
                "endColumnIndex": LEDGER_COLUMNS
            },
            "cell": {
                "userEnteredFormat": {
                    "horizontalAlignment": "CENTER",
                    "textFormat": { "bold": false },
                    "borders": {
                        "top": solid,
                        "bottom": solid,
                        "left": solid,
                        "right": solid
                    }
                }
            },
            "fields": "userEnteredFormat(horizontalAlignment,textFormat.bold,borders)"
        }
    })
}

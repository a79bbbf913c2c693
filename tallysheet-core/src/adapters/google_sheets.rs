//! Google Sheets API client
//!
//! Talks to the Sheets v4 REST API for reading value ranges and writing rows.
//! Authentication is either an OAuth access token (sent as a bearer token) or
//! an API key; API keys can only read public sheets.
//!
//! API Documentation: https://developers.google.com/sheets/api/reference/rest

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};
use url::Url;

use crate::domain::result::{Error as DomainError, Result as DomainResult};
use crate::ports::{SheetSource, ValueInputMode};

// =============================================================================
// API Response Models
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

/// Properties of one tab
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct ValueRange {
    /// Omitted by the API when the range is empty
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

#[derive(Debug, Clone, Deserialize)]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Dimension a value range is read along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorDimension {
    Rows,
    Columns,
}

impl MajorDimension {
    fn as_api_str(&self) -> &'static str {
        match self {
            MajorDimension::Rows => "ROWS",
            MajorDimension::Columns => "COLUMNS",
        }
    }
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// A1 notation helpers
// =============================================================================

/// Quote a tab name for A1 notation (`'It''s'`)
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

/// Column letters for a 0-based index (0 → A, 26 → AA)
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A range inside a tab, e.g. `'2026'!A5`
pub fn a1_range(tab: &str, cells: &str) -> String {
    format!("{}!{}", quote_tab(tab), cells)
}

static UPDATED_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"![A-Z]+(\d+)").expect("valid regex"));

/// First row number of an updated range such as `'2026'!A7:E7`
fn updated_row(range: &str) -> Option<usize> {
    UPDATED_ROW_RE
        .captures(range)
        .and_then(|c| c[1].parse().ok())
}

// =============================================================================
// Google Sheets HTTP Client
// =============================================================================

/// Default production API URL
const SHEETS_PRODUCTION_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Environment variable to override the Sheets API base URL
pub const SHEETS_BASE_URL_ENV: &str = "TALLY_SHEETS_BASE_URL";

/// Get the Sheets base URL, checking environment variable first
pub fn get_base_url() -> String {
    std::env::var(SHEETS_BASE_URL_ENV).unwrap_or_else(|_| SHEETS_PRODUCTION_URL.to_string())
}

/// How requests are authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth 2.0 access token
    AccessToken(String),
    /// API key (read-only, public sheets)
    ApiKey(String),
}

/// Google Sheets API client for one spreadsheet
#[derive(Debug)]
pub struct GoogleSheetsClient {
    client: Client,
    spreadsheet_id: String,
    credentials: Credentials,
    base_url: String,
}

impl GoogleSheetsClient {
    /// Create a client for `spreadsheet_id`.
    ///
    /// Uses the `TALLY_SHEETS_BASE_URL` environment variable if set,
    /// otherwise the production API.
    pub fn new(spreadsheet_id: &str, credentials: Credentials) -> Result<Self> {
        Self::new_with_base_url(spreadsheet_id, credentials, &get_base_url())
    }

    /// Create a client with a custom base URL
    pub fn new_with_base_url(
        spreadsheet_id: &str,
        credentials: Credentials,
        base_url: &str,
    ) -> Result<Self> {
        if spreadsheet_id.trim().is_empty() {
            anyhow::bail!("Spreadsheet ID cannot be empty");
        }
        match &credentials {
            Credentials::AccessToken(t) | Credentials::ApiKey(t) if t.trim().is_empty() => {
                anyhow::bail!("Google Sheets credentials cannot be empty")
            }
            _ => {}
        }
        Url::parse(base_url).with_context(|| format!("Invalid Sheets base URL '{base_url}'"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Build `{base}/{segments...}?{query}` with every segment percent-encoded
    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("Invalid Sheets base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Sheets base URL cannot have path segments"))?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Credentials::ApiKey(key) = &self.credentials {
                pairs.append_pair("key", key);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::AccessToken(token) => request.bearer_auth(token),
            Credentials::ApiKey(_) => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .map_err(|e| self.map_request_error(e))?;
        self.check_response_status(response)
    }

    /// Tabs of the spreadsheet, in display order
    pub fn get_sheets(&self) -> Result<Vec<SheetProperties>> {
        let url = self.url(&[&self.spreadsheet_id], &[("fields", "sheets.properties")])?;
        let response = self.send(self.client.get(url))?;
        let body: SpreadsheetResponse = response
            .json()
            .context("Failed to parse spreadsheet metadata")?;

        let mut sheets: Vec<SheetProperties> =
            body.sheets.into_iter().map(|s| s.properties).collect();
        sheets.sort_by_key(|s| s.index);
        Ok(sheets)
    }

    /// Formatted cell values of an A1 range
    pub fn get_values(&self, range: &str, dimension: MajorDimension) -> Result<Vec<Vec<String>>> {
        let url = self.url(
            &[&self.spreadsheet_id, "values", range],
            &[
                ("valueRenderOption", "FORMATTED_VALUE"),
                ("majorDimension", dimension.as_api_str()),
            ],
        )?;
        let response = self.send(self.client.get(url))?;
        let body: ValueRange = response
            .json()
            .with_context(|| format!("Failed to parse values of {range}"))?;

        debug!(range, rows = body.values.len(), "Fetched value range");
        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    /// Overwrite the cells of `range` with one row of values
    pub fn update_values(&self, range: &str, values: &[String], mode: ValueInputMode) -> Result<()> {
        let url = self.url(
            &[&self.spreadsheet_id, "values", range],
            &[("valueInputOption", mode.as_api_str())],
        )?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        self.send(self.client.put(url).json(&body))?;
        Ok(())
    }

    /// Append one row after the table found at `range`; returns its row number
    pub fn append_values(&self, range: &str, values: &[String], mode: ValueInputMode) -> Result<usize> {
        let segment = format!("{range}:append");
        let url = self.url(
            &[&self.spreadsheet_id, "values", &segment],
            &[
                ("valueInputOption", mode.as_api_str()),
                ("insertDataOption", "INSERT_ROWS"),
            ],
        )?;
        let body = json!({
            "majorDimension": "ROWS",
            "values": [values],
        });
        let response = self.send(self.client.post(url).json(&body))?;
        let body: AppendResponse = response
            .json()
            .context("Failed to parse append response")?;

        updated_row(&body.updates.updated_range).with_context(|| {
            format!(
                "Unexpected updated range '{}' in append response",
                body.updates.updated_range
            )
        })
    }

    /// Insert empty rows `[start, end)` (0-based) into a tab, copying the
    /// formatting of the row above
    pub fn insert_rows(&self, sheet_id: i64, start: usize, end: usize) -> Result<()> {
        let segment = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url(&[&segment], &[])?;
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end,
                    },
                    "inheritFromBefore": start > 0,
                }
            }]
        });
        self.send(self.client.post(url).json(&body))?;
        Ok(())
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            anyhow::anyhow!("Connection timed out after 60 seconds")
        } else if error.is_connect() {
            anyhow::anyhow!("Unable to connect to Google Sheets")
        } else {
            anyhow::anyhow!("Google Sheets request failed: {}", error)
        }
    }

    /// Check response status and return appropriate errors
    fn check_response_status(&self, response: Response) -> Result<Response> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }
        let detail = api_error_message(response);
        match status {
            400 => anyhow::bail!("Google Sheets rejected the request: {}", detail),
            401 => anyhow::bail!(
                "Google Sheets authentication failed. Your access token may be invalid or expired."
            ),
            403 => anyhow::bail!(
                "Google Sheets access denied. Check that the sheet is shared with this account."
            ),
            404 => anyhow::bail!("Spreadsheet or range not found: {}", detail),
            429 => anyhow::bail!(
                "Google Sheets rate limit exceeded. Please wait a moment and try again."
            ),
            status => anyhow::bail!("Google Sheets API error: HTTP {} {}", status, detail),
        }
    }
}

/// `error.message` from an API error body, or an empty string
fn api_error_message(response: Response) -> String {
    response
        .json::<JsonValue>()
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_default()
}

// =============================================================================
// GoogleSheetsSource - implements SheetSource trait
// =============================================================================

/// Google Sheets tabular source
#[derive(Debug)]
pub struct GoogleSheetsSource {
    client: GoogleSheetsClient,
}

impl GoogleSheetsSource {
    pub fn new(client: GoogleSheetsClient) -> Self {
        Self { client }
    }

    fn sheet_id(&self, tab: &str) -> DomainResult<i64> {
        self.client
            .get_sheets()
            .map_err(source_error)?
            .into_iter()
            .find(|s| s.title == tab)
            .map(|s| s.sheet_id)
            .ok_or_else(|| DomainError::not_found(format!("tab '{tab}'")))
    }
}

fn source_error(e: anyhow::Error) -> DomainError {
    DomainError::source(format!("{e:#}"))
}

fn first(mut values: Vec<Vec<String>>) -> Vec<String> {
    if values.is_empty() {
        Vec::new()
    } else {
        values.swap_remove(0)
    }
}

impl SheetSource for GoogleSheetsSource {
    fn name(&self) -> &str {
        "google-sheets"
    }

    fn tabs(&self) -> DomainResult<Vec<String>> {
        Ok(self
            .client
            .get_sheets()
            .map_err(source_error)?
            .into_iter()
            .map(|s| s.title)
            .collect())
    }

    fn read_grid(&self, tab: &str) -> DomainResult<Vec<Vec<String>>> {
        self.client
            .get_values(&quote_tab(tab), MajorDimension::Rows)
            .map_err(source_error)
    }

    fn read_row(&self, tab: &str, row: usize) -> DomainResult<Vec<String>> {
        let range = a1_range(tab, &format!("{row}:{row}"));
        self.client
            .get_values(&range, MajorDimension::Rows)
            .map(first)
            .map_err(source_error)
    }

    fn read_column(&self, tab: &str, column: usize) -> DomainResult<Vec<String>> {
        let letter = column_letter(column);
        let range = a1_range(tab, &format!("{letter}1:{letter}"));
        self.client
            .get_values(&range, MajorDimension::Columns)
            .map(first)
            .map_err(source_error)
    }

    fn write_row(
        &self,
        tab: &str,
        row: usize,
        values: &[String],
        mode: ValueInputMode,
    ) -> DomainResult<()> {
        let range = a1_range(tab, &format!("A{row}"));
        self.client
            .update_values(&range, values, mode)
            .map_err(source_error)?;
        info!(tab, row, "Wrote row");
        Ok(())
    }

    fn insert_row(
        &self,
        tab: &str,
        row: usize,
        values: &[String],
        mode: ValueInputMode,
    ) -> DomainResult<()> {
        let sheet_id = self.sheet_id(tab)?;
        let start = row
            .checked_sub(1)
            .ok_or_else(|| DomainError::validation("row numbers start at 1"))?;
        self.client
            .insert_rows(sheet_id, start, row)
            .map_err(source_error)?;
        self.write_row(tab, row, values, mode)
    }

    fn append_row(&self, tab: &str, values: &[String], mode: ValueInputMode) -> DomainResult<usize> {
        let row = self
            .client
            .append_values(&a1_range(tab, "A1"), values, mode)
            .map_err(source_error)?;
        info!(tab, row, "Appended row");
        Ok(row)
    }
}

// =============================================================================
// Tests
// =============================================================================

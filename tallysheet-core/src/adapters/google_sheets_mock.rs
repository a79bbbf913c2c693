//! Mock Google Sheets API server for testing
//!
//! Serves the subset of the Sheets v4 API the adapter uses, backed by an
//! in-memory sheet:
//! - GET /{id}?fields=sheets.properties returns { sheets: [{ properties }] }
//! - GET /{id}/values/{range} returns { range, majorDimension, values }
//! - PUT /{id}/values/{range} overwrites one row
//! - POST /{id}/values/{range}:append appends one row
//! - POST /{id}:batchUpdate handles insertDimension requests

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use percent_encoding::percent_decode_str;
use serde_json::{json, Value as JsonValue};

use super::memory::MemorySheet;
use crate::ports::{SheetSource, ValueInputMode};

/// Mock Sheets server for testing
pub struct MockSheetsServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
    state: Arc<State>,
}

/// Configuration for the mock
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub spreadsheet_id: String,
    /// Tabs in display order, first row is the header
    pub tabs: Vec<(String, Vec<Vec<String>>)>,
    /// Whether to simulate authentication failure
    pub fail_auth: bool,
    /// Whether to simulate rate limiting
    pub rate_limit: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        let rows: &[&[&str]] = &[
            &["Data", "Cliente", "Modalidade", "UF"],
            &["05/01/2026", "Acme 01", "Presencial", "SP"],
            &["06/01/2026", "Acme-02", "Remoto", "RJ"],
            &["", "", "", ""],
            &["08/01/2026", "Beta", "Remoto", "SP"],
        ];
        Self {
            spreadsheet_id: "mock-sheet".to_string(),
            tabs: vec![
                ("2026".to_string(), to_grid(rows)),
                ("2025".to_string(), to_grid(&rows[..1])),
            ],
            fail_auth: false,
            rate_limit: false,
        }
    }
}

fn to_grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

struct State {
    config: MockConfig,
    sheet: MemorySheet,
    requests: Mutex<Vec<String>>,
}

impl MockSheetsServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let sheet = config
            .tabs
            .iter()
            .fold(MemorySheet::new(), |sheet, (name, grid)| {
                sheet.with_grid(name, grid.clone())
            });
        let state = Arc::new(State {
            config,
            sheet,
            requests: Mutex::new(Vec::new()),
        });
        let state_clone = state.clone();

        // Set listener to non-blocking for graceful shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL to hand to `GoogleSheetsClient::new_with_base_url`
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/v4/spreadsheets", self.port)
    }

    /// Current contents of a tab
    pub fn grid(&self, tab: &str) -> Vec<Vec<String>> {
        self.state.sheet.grid(tab).unwrap_or_default()
    }

    /// `METHOD path` of every request served so far
    pub fn requests(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockSheetsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Request {
    method: String,
    path: String,
    query: String,
    head: String,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    stream.set_nonblocking(false).ok()?;
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let first_line = head.lines().next().unwrap_or("");
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    Some(Request {
        method,
        path: percent_decode_str(path).decode_utf8_lossy().into_owned(),
        query: query.to_string(),
        head: head.to_lowercase(),
        body: String::from_utf8_lossy(&data[header_end..]).to_string(),
    })
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Parsed A1 range: tab plus the part after `!`
fn split_range(range: &str) -> (String, String) {
    let (tab, cells) = range.split_once('!').unwrap_or((range, ""));
    let tab = tab
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(tab)
        .replace("''", "'");
    (tab, cells.to_string())
}

fn column_index(letters: &str) -> usize {
    letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1
}

fn leading_digits(s: &str) -> Option<usize> {
    let digits: String = s
        .chars()
        .skip_while(|c| c.is_ascii_alphabetic())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn mode_of(query: &str) -> ValueInputMode {
    match query_param(query, "valueInputOption") {
        Some("RAW") => ValueInputMode::Raw,
        _ => ValueInputMode::UserEntered,
    }
}

fn first_row(body: &str) -> Vec<String> {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| v["values"][0].as_array().cloned())
        .unwrap_or_default()
        .iter()
        .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
        .collect()
}

fn handle_connection(mut stream: TcpStream, state: &State) {
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    if let Ok(mut log) = state.requests.lock() {
        log.push(format!("{} {}", request.method, request.path));
    }

    let config = &state.config;
    let authorized = request.head.contains("authorization: bearer test_")
        || query_param(&request.query, "key").is_some_and(|k| k.starts_with("test_"));
    if config.fail_auth || !authorized {
        send_response(&mut stream, 401, "Unauthorized", &error_body(401, "Invalid credentials"));
        return;
    }
    if config.rate_limit {
        send_response(&mut stream, 429, "Too Many Requests", &error_body(429, "Quota exceeded"));
        return;
    }

    let prefix = format!("/v4/spreadsheets/{}", config.spreadsheet_id);
    let Some(rest) = request.path.strip_prefix(&prefix) else {
        send_response(&mut stream, 404, "Not Found", &error_body(404, "Requested entity was not found."));
        return;
    };

    let (status, text, body) = route(state, &request, rest);
    send_response(&mut stream, status, text, &body);
}

fn route(state: &State, request: &Request, rest: &str) -> (u16, &'static str, String) {
    let sheet = &state.sheet;
    let not_found = || (404, "Not Found", error_body(404, "Unable to parse range"));

    match (request.method.as_str(), rest) {
        ("GET", "") => {
            let sheets: Vec<JsonValue> = state
                .config
                .tabs
                .iter()
                .enumerate()
                .map(|(i, (title, _))| {
                    json!({ "properties": { "sheetId": 1000 + i, "title": title, "index": i } })
                })
                .collect();
            (200, "OK", json!({ "sheets": sheets }).to_string())
        }
        ("POST", ":batchUpdate") => {
            let body: JsonValue = serde_json::from_str(&request.body).unwrap_or_default();
            let insert = &body["requests"][0]["insertDimension"]["range"];
            let sheet_id = insert["sheetId"].as_u64().unwrap_or(0) as usize;
            let start = insert["startIndex"].as_u64().unwrap_or(0) as usize;
            let Some((tab, _)) = state.config.tabs.get(sheet_id.wrapping_sub(1000)) else {
                return (400, "Bad Request", error_body(400, "No grid with id"));
            };
            match sheet.insert_row(tab, start + 1, &[], ValueInputMode::Raw) {
                Ok(()) => (200, "OK", json!({ "replies": [{}] }).to_string()),
                Err(_) => not_found(),
            }
        }
        (method, rest) => {
            let Some(range) = rest.strip_prefix("/values/") else {
                return not_found();
            };
            let (range, append) = match range.strip_suffix(":append") {
                Some(r) => (r, true),
                None => (range, false),
            };
            let (tab, cells) = split_range(range);

            match (method, append) {
                ("GET", false) => {
                    let columns = query_param(&request.query, "majorDimension") == Some("COLUMNS");
                    let values = if cells.is_empty() {
                        sheet.read_grid(&tab)
                    } else if columns {
                        let letters: String =
                            cells.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
                        sheet
                            .read_column(&tab, column_index(&letters))
                            .map(|c| if c.is_empty() { vec![] } else { vec![c] })
                    } else {
                        let row = leading_digits(&cells).unwrap_or(1);
                        sheet
                            .read_row(&tab, row)
                            .map(|r| if r.is_empty() { vec![] } else { vec![r] })
                    };
                    match values {
                        Ok(values) => (
                            200,
                            "OK",
                            json!({ "range": range, "majorDimension": "ROWS", "values": values })
                                .to_string(),
                        ),
                        Err(_) => not_found(),
                    }
                }
                ("PUT", false) => {
                    let row = leading_digits(&cells).unwrap_or(1);
                    let values = first_row(&request.body);
                    match sheet.write_row(&tab, row, &values, mode_of(&request.query)) {
                        Ok(()) => (200, "OK", json!({ "updatedRows": 1 }).to_string()),
                        Err(_) => not_found(),
                    }
                }
                ("POST", true) => {
                    let values = first_row(&request.body);
                    match sheet.append_row(&tab, &values, mode_of(&request.query)) {
                        Ok(row) => {
                            let last = super::google_sheets::column_letter(values.len().max(1) - 1);
                            let updated = format!(
                                "{}!A{row}:{last}{row}",
                                super::google_sheets::quote_tab(&tab)
                            );
                            (
                                200,
                                "OK",
                                json!({ "updates": { "updatedRange": updated } }).to_string(),
                            )
                        }
                        Err(_) => not_found(),
                    }
                }
                _ => (405, "Method Not Allowed", error_body(405, "Method not allowed")),
            }
        }
    }
}

fn error_body(code: u16, message: &str) -> String {
    json!({ "error": { "code": code, "message": message } }).to_string()
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::google_sheets::{Credentials, GoogleSheetsClient, GoogleSheetsSource};
    use crate::domain::result::Error;

    fn source(server: &MockSheetsServer, token: &str) -> GoogleSheetsSource {
        let client = GoogleSheetsClient::new_with_base_url(
            "mock-sheet",
            Credentials::AccessToken(token.to_string()),
            &server.base_url(),
        )
        .unwrap();
        GoogleSheetsSource::new(client)
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_mock_server_starts() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        assert!(server.port() > 0);
    }

    #[test]
    fn test_tabs_in_order() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let tabs = source(&server, "test_token").tabs().unwrap();
        assert_eq!(tabs, vec!["2026".to_string(), "2025".to_string()]);
    }

    #[test]
    fn test_read_grid_keeps_blank_rows() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let grid = source(&server, "test_token").read_grid("2026").unwrap();
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[3], row(&["", "", "", ""]));
    }

    #[test]
    fn test_encoded_names_are_decoded() {
        let mut config = MockConfig {
            spreadsheet_id: "relatório 100%".to_string(),
            ..MockConfig::default()
        };
        config.tabs[0].0 = "Instalações".to_string();
        let server = MockSheetsServer::start(config).unwrap();
        let client = GoogleSheetsClient::new_with_base_url(
            "relatório 100%",
            Credentials::AccessToken("test_token".to_string()),
            &server.base_url(),
        )
        .unwrap();
        let source = GoogleSheetsSource::new(client);

        // the id is the last path segment here, ending in %25
        assert_eq!(source.tabs().unwrap()[0], "Instalações");
        assert_eq!(source.read_grid("Instalações").unwrap().len(), 5);
    }

    #[test]
    fn test_read_row_and_column() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let source = source(&server, "test_token");
        assert_eq!(source.read_row("2026", 1).unwrap()[0], "Data");
        assert!(source.read_row("2026", 40).unwrap().is_empty());
        let column = source.read_column("2026", 1).unwrap();
        assert_eq!(column, row(&["Cliente", "Acme 01", "Acme-02", "", "Beta"]));
    }

    #[test]
    fn test_insert_row_shifts_down() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let source = source(&server, "test_token");
        source
            .insert_row("2026", 4, &row(&["07/01/2026", "Gamma"]), ValueInputMode::UserEntered)
            .unwrap();

        let grid = server.grid("2026");
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[3], row(&["07/01/2026", "Gamma"]));
        assert_eq!(grid[4], row(&["", "", "", ""]));
        let requests = server.requests();
        assert!(requests.iter().any(|r| r.ends_with(":batchUpdate")));
        assert!(requests.iter().any(|r| r.starts_with("PUT ") && r.ends_with("'2026'!A4")));
    }

    #[test]
    fn test_append_row_reports_row() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let landed = source(&server, "test_token")
            .append_row("2026", &row(&["09/01/2026", "Delta"]), ValueInputMode::Raw)
            .unwrap();
        assert_eq!(landed, 6);
        assert_eq!(server.grid("2026")[5], row(&["09/01/2026", "Delta"]));
    }

    #[test]
    fn test_auth_failure_is_source_error() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let err = source(&server, "wrong").read_grid("2026").unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[test]
    fn test_rate_limit() {
        let server = MockSheetsServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let err = source(&server, "test_token").tabs().unwrap_err();
        assert!(err.to_string().to_lowercase().contains("rate limit"));
    }

    #[test]
    fn test_unknown_spreadsheet() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let client = GoogleSheetsClient::new_with_base_url(
            "other-sheet",
            Credentials::AccessToken("test_token".to_string()),
            &server.base_url(),
        )
        .unwrap();
        let err = client.get_sheets().unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_api_key_auth() {
        let server = MockSheetsServer::start(MockConfig::default()).unwrap();
        let client = GoogleSheetsClient::new_with_base_url(
            "mock-sheet",
            Credentials::ApiKey("test_key".to_string()),
            &server.base_url(),
        )
        .unwrap();
        assert_eq!(client.get_sheets().unwrap().len(), 2);
    }
}

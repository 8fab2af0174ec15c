//! Mock PostgREST server for testing
//!
//! Serves one table over plain HTTP on a random local port and supports the
//! two requests the client makes:
//! - `GET /rest/v1/<table>?select=..&<col>=not.is.null&order=..` with a
//!   `Range: <from>-<to>` header
//! - `PATCH /rest/v1/<table>?<id>=eq.<value>&select=<id>` with a JSON body
//!
//! Every PATCH is recorded so tests can assert on what was written.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Map, Value as JsonValue};

/// Mock PostgREST server for testing
pub struct MockPostgrestServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Behaviour switches for the mock
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub table: String,
    pub id_column: String,
    pub url_column: String,
    /// Key the server accepts in `apikey` and `Authorization: Bearer`
    pub api_key: String,
    /// Ids whose PATCH answers with HTTP 500
    pub failing_ids: Vec<String>,
    /// Server-side row cap per response, like PostgREST's `max-rows`
    pub max_rows: Option<usize>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            table: "tasting_notes".to_string(),
            id_column: "id".to_string(),
            url_column: "image_url".to_string(),
            api_key: "test_key".to_string(),
            failing_ids: Vec::new(),
            max_rows: None,
        }
    }
}

/// A PATCH the server received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPatch {
    pub filter: String,
    pub body: JsonValue,
}

#[derive(Debug, Default)]
struct MockState {
    rows: Vec<Map<String, JsonValue>>,
    patches: Vec<RecordedPatch>,
    gets: usize,
}

struct Request {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl MockPostgrestServer {
    /// Start a server holding `(id, image_url)` rows
    pub fn start(config: MockConfig, rows: &[(i64, Option<&str>)]) -> std::io::Result<Self> {
        let rows = rows
            .iter()
            .map(|(id, url)| {
                let mut row = Map::new();
                row.insert(config.id_column.clone(), json!(id));
                row.insert(
                    config.url_column.clone(),
                    url.map(|u| json!(u)).unwrap_or(JsonValue::Null),
                );
                row
            })
            .collect();

        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState {
            rows,
            ..Default::default()
        }));

        // Non-blocking accept so stop() can end the loop
        listener.set_nonblocking(true)?;

        let running_clone = Arc::clone(&running);
        let state_clone = Arc::clone(&state);
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let st = Arc::clone(&state_clone);
                        thread::spawn(move || handle_connection(stream, &cfg, &st));
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
            state,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// REST base URL (what `Config::rest_url` would produce)
    pub fn rest_url(&self) -> String {
        format!("http://127.0.0.1:{}/rest/v1", self.port)
    }

    /// PATCH requests received so far, in arrival order
    pub fn patches(&self) -> Vec<RecordedPatch> {
        self.state.lock().unwrap().patches.clone()
    }

    /// Number of GET requests received so far
    pub fn get_count(&self) -> usize {
        self.state.lock().unwrap().gets
    }

    /// Current URL stored for a row
    pub fn url_of(&self, id: i64, url_column: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .find(|row| row.get("id") == Some(&json!(id)))
            .and_then(|row| row.get(url_column))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockPostgrestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).ok()?;

    let (path, query_string) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let query = url::form_urlencoded::parse(query_string.as_bytes())
        .into_owned()
        .collect();

    Some(Request {
        method,
        path: path.to_string(),
        query,
        headers,
        body,
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<MockState>) {
    let _ = stream.set_nonblocking(false);

    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, "Bad Request", r#"{"message": "Invalid request"}"#);
        return;
    };

    let bearer = format!("Bearer {}", config.api_key);
    let authorized = request.headers.get("apikey") == Some(&config.api_key)
        && request.headers.get("authorization") == Some(&bearer);
    if !authorized {
        send_response(&mut stream, 401, "Unauthorized", r#"{"message": "Invalid API key"}"#);
        return;
    }

    if request.path != format!("/rest/v1/{}", config.table) {
        let body = json!({
            "code": "42P01",
            "message": format!("relation \"public.{}\" does not exist", request.path.trim_start_matches("/rest/v1/")),
        });
        send_response(&mut stream, 404, "Not Found", &body.to_string());
        return;
    }

    match request.method.as_str() {
        "GET" => handle_get(&mut stream, config, state, &request),
        "PATCH" => handle_patch(&mut stream, config, state, &request),
        _ => send_response(
            &mut stream,
            405,
            "Method Not Allowed",
            r#"{"message": "Method not allowed"}"#,
        ),
    }
}

fn handle_get(stream: &mut TcpStream, config: &MockConfig, state: &Mutex<MockState>, request: &Request) {
    let mut state = state.lock().unwrap();
    state.gets += 1;

    let not_null = request.query.get(&config.url_column).map(String::as_str) == Some("not.is.null");
    let mut rows: Vec<&Map<String, JsonValue>> = state
        .rows
        .iter()
        .filter(|row| !not_null || row.get(&config.url_column).map_or(false, |v| !v.is_null()))
        .collect();
    rows.sort_by_key(|row| row.get(&config.id_column).and_then(|v| v.as_i64()).unwrap_or(0));

    let (from, to) = request
        .headers
        .get("range")
        .and_then(|r| r.split_once('-'))
        .and_then(|(a, b)| Some((a.parse::<usize>().ok()?, b.parse::<usize>().ok()?)))
        .unwrap_or((0, usize::MAX - 1));

    if from > 0 && from >= rows.len() {
        send_response(stream, 416, "Range Not Satisfiable", r#"{"message": "Requested range not satisfiable"}"#);
        return;
    }

    let page: Vec<&Map<String, JsonValue>> = rows
        .into_iter()
        .skip(from)
        .take((to.saturating_sub(from) + 1).min(config.max_rows.unwrap_or(usize::MAX)))
        .collect();
    let json = serde_json::to_string(&page).unwrap();
    send_response(stream, 200, "OK", &json);
}

fn handle_patch(stream: &mut TcpStream, config: &MockConfig, state: &Mutex<MockState>, request: &Request) {
    let filter = request.query.get(&config.id_column).cloned().unwrap_or_default();
    let body: JsonValue = serde_json::from_slice(&request.body).unwrap_or(JsonValue::Null);

    let mut state = state.lock().unwrap();
    state.patches.push(RecordedPatch {
        filter: filter.clone(),
        body: body.clone(),
    });

    let Some(id) = filter.strip_prefix("eq.") else {
        send_response(stream, 400, "Bad Request", r#"{"message": "expected eq. filter"}"#);
        return;
    };

    if config.failing_ids.iter().any(|f| f == id) {
        let body = json!({"code": "XX000", "message": format!("simulated failure for {}", id)});
        send_response(stream, 500, "Internal Server Error", &body.to_string());
        return;
    }

    let new_url = body.get(&config.url_column).cloned().unwrap_or(JsonValue::Null);
    let mut changed = Vec::new();
    for row in state.rows.iter_mut() {
        let matches = row
            .get(&config.id_column)
            .map(|v| match v {
                JsonValue::Number(n) => n.to_string() == id,
                JsonValue::String(s) => s == id,
                _ => false,
            })
            .unwrap_or(false);
        if matches {
            row.insert(config.url_column.clone(), new_url.clone());
            changed.push(json!({ &config.id_column: row.get(&config.id_column) }));
        }
    }

    send_response(stream, 200, "OK", &JsonValue::Array(changed).to_string());
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
    use crate::adapters::postgrest::PostgrestClient;
    use crate::domain::result::Error;
    use crate::domain::{ImageTarget, NoteId};
    use crate::ports::NoteStore;

    fn client_for(server: &MockPostgrestServer) -> PostgrestClient {
        PostgrestClient::with_rest_url(&server.rest_url(), "test_key", ImageTarget::default()).unwrap()
    }

    #[test]
    fn test_mock_server_starts() {
        let server = MockPostgrestServer::start(MockConfig::default(), &[]).unwrap();
        assert!(server.port() > 0);
    }

    #[test]
    fn test_fetch_skips_null_urls() {
        let server = MockPostgrestServer::start(
            MockConfig::default(),
            &[
                (1, Some("https://storage.googleapis.com/b/uploads/2024/01/a.jpg")),
                (2, None),
                (3, Some("/api/images/uploads/2023/b.png")),
            ],
        )
        .unwrap();

        let notes = client_for(&server).fetch_with_image_url().unwrap();

        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, NoteId::from(1));
        assert_eq!(notes[1].image_url.as_deref(), Some("/api/images/uploads/2023/b.png"));
    }

    #[test]
    fn test_fetch_pages_through_rows() {
        let urls: Vec<String> = (1..=7).map(|i| format!("https://x/uploads/{}.jpg", i)).collect();
        let rows: Vec<(i64, Option<&str>)> = urls
            .iter()
            .enumerate()
            .map(|(i, u)| (i as i64 + 1, Some(u.as_str())))
            .collect();
        let server = MockPostgrestServer::start(MockConfig::default(), &rows).unwrap();

        let notes = client_for(&server).with_page_size(3).fetch_notes().unwrap();

        assert_eq!(notes.len(), 7);
        assert_eq!(notes[6].id, NoteId::from(7));
        // 3 + 3 + 1, then an empty range
        assert_eq!(server.get_count(), 4);
    }

    #[test]
    fn test_fetch_continues_past_server_row_cap() {
        let urls: Vec<String> = (1..=5).map(|i| format!("https://x/uploads/{}.jpg", i)).collect();
        let rows: Vec<(i64, Option<&str>)> = urls
            .iter()
            .enumerate()
            .map(|(i, u)| (i as i64 + 1, Some(u.as_str())))
            .collect();
        let config = MockConfig {
            max_rows: Some(2),
            ..Default::default()
        };
        let server = MockPostgrestServer::start(config, &rows).unwrap();

        let notes = client_for(&server).fetch_notes().unwrap();

        assert_eq!(notes.len(), 5);
        let ids: Vec<NoteId> = notes.into_iter().map(|n| n.id).collect();
        assert_eq!(ids, (1..=5).map(NoteId::from).collect::<Vec<_>>());
        // 2 + 2 + 1, then an empty range
        assert_eq!(server.get_count(), 4);
    }

    #[test]
    fn test_fetch_exact_page_multiple_stops_on_empty_range() {
        let rows = [(1, Some("https://x/uploads/1.jpg")), (2, Some("https://x/uploads/2.jpg"))];
        let server = MockPostgrestServer::start(MockConfig::default(), &rows).unwrap();

        let notes = client_for(&server).with_page_size(2).fetch_notes().unwrap();

        assert_eq!(notes.len(), 2);
        assert_eq!(server.get_count(), 2);
    }

    #[test]
    fn test_update_writes_url_column() {
        let server = MockPostgrestServer::start(
            MockConfig::default(),
            &[(4, Some("https://x/bucket/uploads/a.jpg"))],
        )
        .unwrap();

        client_for(&server)
            .update_image_url(&NoteId::from(4), "/api/images/uploads/a.jpg")
            .unwrap();

        let patches = server.patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].filter, "eq.4");
        assert_eq!(patches[0].body, json!({"image_url": "/api/images/uploads/a.jpg"}));
        assert_eq!(server.url_of(4, "image_url").as_deref(), Some("/api/images/uploads/a.jpg"));
    }

    #[test]
    fn test_update_matching_no_row_is_not_found() {
        let server = MockPostgrestServer::start(MockConfig::default(), &[(1, Some("x"))]).unwrap();

        let result = client_for(&server).update_image_url(&NoteId::from(99), "/api/images/uploads/a.jpg");

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_server_error_carries_message() {
        let server = MockPostgrestServer::start(
            MockConfig {
                failing_ids: vec!["2".to_string()],
                ..Default::default()
            },
            &[(2, Some("https://x/uploads/a.jpg"))],
        )
        .unwrap();

        let err = client_for(&server)
            .update_image_url(&NoteId::from(2), "/api/images/uploads/a.jpg")
            .unwrap_err();

        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("simulated failure for 2"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_auth_failure() {
        let server = MockPostgrestServer::start(MockConfig::default(), &[]).unwrap();
        let client =
            PostgrestClient::with_rest_url(&server.rest_url(), "wrong_key", ImageTarget::default()).unwrap();

        let err = client.fetch_notes().unwrap_err();

        assert!(err.to_string().contains("authentication"));
    }

    #[test]
    fn test_unknown_table_reports_postgrest_message() {
        let server = MockPostgrestServer::start(MockConfig::default(), &[]).unwrap();
        let client = PostgrestClient::with_rest_url(
            &server.rest_url(),
            "test_key",
            ImageTarget::new("wine_pictures", "id", "url"),
        )
        .unwrap();

        let err = client.fetch_notes().unwrap_err().to_string();

        assert!(err.contains("404"));
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn test_custom_target_columns() {
        let config = MockConfig {
            table: "wine_images".to_string(),
            url_column: "url".to_string(),
            ..Default::default()
        };
        let server = MockPostgrestServer::start(config, &[(8, Some("https://x/uploads/z.png"))]).unwrap();
        let client = PostgrestClient::with_rest_url(
            &server.rest_url(),
            "test_key",
            ImageTarget::new("wine_images", "id", "url"),
        )
        .unwrap();

        let notes = client.fetch_notes().unwrap();
        assert_eq!(notes.len(), 1);

        client.update_url(&NoteId::from(8), "/api/images/uploads/z.png").unwrap();
        assert_eq!(server.url_of(8, "url").as_deref(), Some("/api/images/uploads/z.png"));
    }
}

//! Mock DevTools endpoint
//!
//! Stands in for a browser's remote-debugging surface during integration
//! tests: the HTTP control plane (`/json/...`), the driver's session/log
//! routes, and a WebSocket target endpoint. Behavior knobs on
//! [`DevtoolsState`] let tests simulate the awkward cases (non-JSON bodies,
//! mismatched response ids, stalled sockets, torn-down sessions).

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// Shared, test-inspectable server state
#[derive(Default)]
pub struct DevtoolsState {
    targets: Mutex<Vec<Value>>,
    next_target: AtomicUsize,
    ws_addr: Mutex<String>,

    /// IDs activated via `/json/activate/{id}`, in call order
    pub activated: Mutex<Vec<String>>,
    /// IDs closed via `/json/close/{id}`, in call order
    pub closed: Mutex<Vec<String>>,

    /// Serve a non-JSON body from `/json` and `/json/list`
    pub list_invalid_json: AtomicBool,
    /// Respond to commands with an id that matches no request
    pub ws_mismatch_id: AtomicBool,
    /// Respond to commands with a frame that is not JSON
    pub ws_malformed: AtomicBool,
    /// Never respond to commands
    pub ws_stall: AtomicBool,
    /// Report the driver session as gone from the log endpoint
    pub session_gone: AtomicBool,

    log_batches: Mutex<VecDeque<Value>>,
}

impl DevtoolsState {
    /// Append a target with the given id and type
    pub fn seed_target(&self, id: &str, target_type: &str) {
        let ws_addr = self.ws_addr.lock().unwrap().clone();
        self.targets.lock().unwrap().push(json!({
            "id": id,
            "type": target_type,
            "title": format!("seeded {}", id),
            "url": "about:blank",
            "webSocketDebuggerUrl": format!("ws://{}/devtools/page/{}", ws_addr, id),
        }));
    }

    /// Queue one batch for the log endpoint; batches pop in FIFO order
    pub fn push_log_batch(&self, payloads: &[&str]) {
        let records: Vec<Value> = payloads
            .iter()
            .map(|m| json!({ "level": "INFO", "message": m, "timestamp": 1 }))
            .collect();
        self.log_batches.lock().unwrap().push_back(json!(records));
    }

    pub fn target_ids(&self) -> Vec<String> {
        self.targets
            .lock()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect()
    }

    fn list_body(&self) -> String {
        if self.list_invalid_json.load(Ordering::SeqCst) {
            "Browser is shutting down".to_string()
        } else {
            json!(*self.targets.lock().unwrap()).to_string()
        }
    }

    fn add_target(&self, url: &str) -> String {
        let n = self.next_target.fetch_add(1, Ordering::SeqCst);
        let id = format!("mock-target-{}", n);
        let ws_addr = self.ws_addr.lock().unwrap().clone();
        let target = json!({
            "id": id,
            "type": "page",
            "title": "",
            "url": url,
            "webSocketDebuggerUrl": format!("ws://{}/devtools/page/{}", ws_addr, id),
        });
        self.targets.lock().unwrap().push(target.clone());
        target.to_string()
    }

    fn close_target(&self, id: &str) {
        self.targets
            .lock()
            .unwrap()
            .retain(|t| t["id"].as_str() != Some(id));
        self.closed.lock().unwrap().push(id.to_string());
    }
}

/// Mock DevTools server
pub struct MockDevtools {
    /// Control-plane base, e.g. "http://127.0.0.1:37001"
    pub http_addr: String,
    /// Target WebSocket base, e.g. "ws://127.0.0.1:37002"
    pub ws_addr: String,
    pub state: Arc<DevtoolsState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockDevtools {
    /// Start HTTP and WebSocket listeners on free ports
    pub async fn start() -> anyhow::Result<Self> {
        let http_listener = TcpListener::bind("127.0.0.1:0").await?;
        let ws_listener = TcpListener::bind("127.0.0.1:0").await?;
        let http_addr = format!("http://{}", http_listener.local_addr()?);
        let ws_addr = format!("ws://{}", ws_listener.local_addr()?);

        let state = Arc::new(DevtoolsState::default());
        *state.ws_addr.lock().unwrap() = ws_listener.local_addr()?.to_string();

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let http_state = state.clone();
        let ws_state = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = http_listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        tokio::spawn(Self::handle_http(stream, http_state.clone()));
                    }
                    result = ws_listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        tokio::spawn(Self::handle_ws(stream, ws_state.clone()));
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(Self {
            http_addr,
            ws_addr,
            state,
            shutdown: Some(shutdown_tx),
        })
    }

    /// The `host:port` debugging address the control plane dials
    pub fn debugger_address(&self) -> String {
        self.http_addr.trim_start_matches("http://").to_string()
    }

    async fn handle_http(mut stream: TcpStream, state: Arc<DevtoolsState>) {
        let Some((method, path)) = read_request(&mut stream).await else {
            return;
        };

        let (status, body) = match (method.as_str(), path.as_str()) {
            ("GET", "/json") | ("GET", "/json/list") => ("200 OK", state.list_body()),
            (_, p) if p.starts_with("/json/new") => {
                let url = p.splitn(2, '?').nth(1).unwrap_or("about:blank");
                ("200 OK", state.add_target(url))
            }
            ("POST", p) if p.starts_with("/json/activate/") => {
                let id = p.trim_start_matches("/json/activate/");
                state.activated.lock().unwrap().push(id.to_string());
                ("200 OK", "Target activated".to_string())
            }
            ("POST", p) if p.starts_with("/json/close/") => {
                let id = p.trim_start_matches("/json/close/").to_string();
                state.close_target(&id);
                ("200 OK", "Target is closing".to_string())
            }
            ("POST", "/session") => (
                "200 OK",
                json!({ "value": { "sessionId": "mock-session-1" } }).to_string(),
            ),
            ("POST", p) if p.starts_with("/session/") && p.ends_with("/log") => {
                if state.session_gone.load(Ordering::SeqCst) {
                    (
                        "404 Not Found",
                        json!({ "value": { "error": "invalid session id",
                                           "message": "invalid session id" } })
                        .to_string(),
                    )
                } else {
                    let batch = state
                        .log_batches
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or_else(|| json!([]));
                    ("200 OK", json!({ "value": batch }).to_string())
                }
            }
            _ => ("404 Not Found", "unknown route".to_string()),
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    async fn handle_ws(stream: TcpStream, state: Arc<DevtoolsState>) {
        let Ok(ws_stream) = accept_async(stream).await else {
            return;
        };
        let (mut sender, mut receiver) = ws_stream.split();

        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    if state.ws_stall.load(Ordering::SeqCst) {
                        continue;
                    }
                    if state.ws_malformed.load(Ordering::SeqCst) {
                        let _ = sender.send(Message::Text("{{ not json".to_string())).await;
                        continue;
                    }

                    let request: Value = serde_json::from_str(&text).unwrap_or(json!({}));
                    let id = if state.ws_mismatch_id.load(Ordering::SeqCst) {
                        json!(999_999)
                    } else {
                        request.get("id").cloned().unwrap_or(json!(0))
                    };
                    let response = json!({
                        "id": id,
                        "result": { "method": request.get("method").cloned().unwrap_or(json!("")) }
                    });
                    if sender
                        .send(Message::Text(response.to_string()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    }
}

impl Drop for MockDevtools {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Read one HTTP request (line, headers, body) and return (method, path)
async fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > 64 * 1024 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    // Drain the body so the client never sees a reset mid-write
    let content_length: usize = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse().ok())
        .unwrap_or(0);
    let mut remaining = content_length.saturating_sub(buffer.len() - header_end - 4);
    while remaining > 0 {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        remaining = remaining.saturating_sub(n);
    }

    Some((method, path))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

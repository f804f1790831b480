//! Buffered-log access to the shared browser handle

use crate::cdp::types::LogRecord;
use crate::Error;
use async_trait::async_trait;
use tracing::debug;

/// Fetches buffered log entries from the browser handle.
///
/// Implementations drain the buffer: entries returned once are gone. Access
/// is serialized by the reactor's exclusive lock, so `&mut self` is fine.
#[async_trait]
pub trait LogSource: Send {
    /// Fetch and drain all buffered entries for one category, returning each
    /// entry's raw text payload
    async fn fetch(&mut self, category: &str) -> Result<Vec<String>, Error>;
}

/// Log source backed by the driver's buffered log endpoint
/// (`POST /session/{id}/log`).
#[derive(Debug)]
pub struct WebDriverLogSource {
    http: reqwest::Client,
    server_addr: String,
    session_id: String,
}

impl WebDriverLogSource {
    /// Create a source for an existing driver session
    pub fn new<S: Into<String>>(server_addr: S, session_id: S) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_addr: server_addr.into(),
            session_id: session_id.into(),
        }
    }

    /// Open a driver session attached to an already-running browser, with
    /// buffered log collection enabled for the given categories.
    ///
    /// `server_addr` is the driver's base URL (e.g. `http://127.0.0.1:9515`);
    /// `debugger_address` is the browser's `host:port` debugging endpoint.
    pub async fn attach(
        server_addr: &str,
        debugger_address: &str,
        categories: &[String],
    ) -> Result<Self, Error> {
        let logging_prefs: serde_json::Map<String, serde_json::Value> = categories
            .iter()
            .map(|c| (c.clone(), serde_json::Value::String("ALL".to_string())))
            .collect();

        let capabilities = serde_json::json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "debuggerAddress": debugger_address },
                    "goog:loggingPrefs": logging_prefs,
                }
            }
        });

        let url = format!("{}/session", server_addr);
        let response: serde_json::Value = reqwest::Client::new()
            .post(&url)
            .json(&capabilities)
            .send()
            .await
            .map_err(|e| Error::transport(format!("POST {} failed: {}", url, e)))?
            .json()
            .await
            .map_err(|e| Error::protocol(format!("malformed session response: {}", e)))?;

        let session_id = response
            .get("value")
            .and_then(|v| v.get("sessionId"))
            .and_then(|s| s.as_str())
            .ok_or_else(|| Error::protocol("no sessionId in session response"))?
            .to_string();

        debug!("Attached driver session {}", session_id);

        Ok(Self {
            http: reqwest::Client::new(),
            server_addr: server_addr.to_string(),
            session_id,
        })
    }

    /// The driver session this source reads from
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl LogSource for WebDriverLogSource {
    async fn fetch(&mut self, category: &str) -> Result<Vec<String>, Error> {
        let url = format!("{}/session/{}/log", self.server_addr, self.session_id);
        let body = serde_json::json!({ "type": category });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("failed to read log body: {}", e)))?;

        if !status.is_success() {
            // Error bodies carry the "invalid session id" marker when the
            // session has been torn down underneath us.
            return Err(Error::from_handle_failure(format!(
                "log fetch returned {}: {}",
                status, text
            )));
        }

        let payload: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| Error::protocol(format!("malformed log response: {}", e)))?;

        let records: Vec<LogRecord> = serde_json::from_value(
            payload
                .get("value")
                .cloned()
                .unwrap_or(serde_json::Value::Array(Vec::new())),
        )
        .map_err(|e| Error::protocol(format!("malformed log records: {}", e)))?;

        Ok(records.into_iter().map(|r| r.message).collect())
    }
}

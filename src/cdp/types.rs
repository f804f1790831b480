//! Control-plane and protocol wire types
//!
//! This module defines the data structures exchanged with the browser's
//! debugging endpoint.

use serde::{Deserialize, Serialize};

/// A debuggable browser context (tab, page, or the browser itself) as
/// reported by the control plane's list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    /// Target ID (stable while the target exists)
    pub id: String,
    /// Target type (e.g. "page", "browser")
    #[serde(rename = "type")]
    pub target_type: String,
    /// Target title
    #[serde(default)]
    pub title: String,
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// WebSocket endpoint scoped to this target
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub debugger_url: Option<String>,
}

/// Command envelope written to a target's debugger socket
#[derive(Debug, Clone, Serialize)]
pub struct CommandEnvelope {
    /// Command ID (monotonic, unique per session, never reused)
    pub id: u64,
    /// Method name (e.g. "Page.navigate")
    pub method: String,
    /// Method parameters
    pub params: serde_json::Value,
}

/// One protocol event as embedded in a buffered log-entry payload.
///
/// The payload text parses to `{"message": {"method": ..., "params": ...}}`;
/// the full `message` object is what handlers receive.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    /// The event message, kept as raw JSON for handler dispatch.
    /// Null when the entry carries no `message` at all.
    #[serde(default)]
    pub message: serde_json::Value,
}

impl EventEnvelope {
    /// The event's method name, when the payload actually is an event
    pub fn method(&self) -> Option<&str> {
        self.message.get("method").and_then(|m| m.as_str())
    }
}

/// One record returned by the driver's buffered log endpoint. The `message`
/// field is itself a JSON document in text form.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    /// Severity as reported by the driver
    #[serde(default)]
    pub level: Option<String>,
    /// Milliseconds since epoch
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Opaque text payload; parses to an [`EventEnvelope`] when it carries an event
    pub message: String,
}

//! Mock CDP implementation for testing
//!
//! This module provides mock implementations of the session traits for
//! development and testing without a running browser.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::cdp::control::last_page_target;
use crate::cdp::traits::*;
use crate::cdp::types::Target;
use crate::Error;

/// Mock control plane backed by an in-memory target list
#[derive(Debug, Default)]
pub struct MockControlPlane {
    targets: Mutex<Vec<Target>>,
    /// IDs passed to activate, in call order
    pub activated: Mutex<Vec<String>>,
    /// IDs of closed targets, in call order
    pub closed: Mutex<Vec<String>>,
}

impl MockControlPlane {
    /// Create a mock with an empty target list
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the target list
    pub async fn with_targets(self, targets: Vec<Target>) -> Self {
        *self.targets.lock().await = targets;
        self
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn list_targets(&self) -> Result<Vec<Target>, Error> {
        Ok(self.targets.lock().await.clone())
    }

    async fn new_target(&self, url: &str) -> Result<(), Error> {
        let id = uuid::Uuid::new_v4().to_string();
        self.targets.lock().await.push(Target {
            id: id.clone(),
            target_type: "page".to_string(),
            title: String::new(),
            url: url.to_string(),
            debugger_url: Some(format!("ws://127.0.0.1:9222/devtools/page/{}", id)),
        });
        Ok(())
    }

    async fn activate_target(&self, id: Option<&str>) -> Result<(), Error> {
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let targets = self.targets.lock().await;
                targets
                    .first()
                    .ok_or_else(|| Error::no_targets("target list is empty"))?
                    .id
                    .clone()
            }
        };
        self.activated.lock().await.push(id);
        Ok(())
    }

    async fn close_last_opened(&self) -> Result<(), Error> {
        let mut targets = self.targets.lock().await;
        let id = last_page_target(&targets)
            .ok_or_else(|| Error::no_targets("no page-typed target to close"))?
            .id
            .clone();
        targets.retain(|t| t.id != id);
        self.closed.lock().await.push(id);
        Ok(())
    }
}

/// Mock command channel that records sent commands and replays canned
/// responses
#[derive(Debug)]
pub struct MockCommandChannel {
    next_id: AtomicU64,
    /// (method, params) pairs in send order
    pub sent: Mutex<Vec<(String, Value)>>,
    responses: Mutex<Vec<Value>>,
}

impl Default for MockCommandChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCommandChannel {
    /// Create a mock channel with no queued responses
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            sent: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response frame; frames are replayed in FIFO order
    pub async fn push_response(&self, response: Value) {
        self.responses.lock().await.push(response);
    }
}

#[async_trait]
impl CommandChannel for MockCommandChannel {
    async fn send(&self, method: &str, params: Value) -> Result<Value, Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push((method.to_string(), params));

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            Ok(serde_json::json!({ "id": id, "result": {} }))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        _deadline: Duration,
    ) -> Result<Value, Error> {
        self.send(method, params).await
    }
}

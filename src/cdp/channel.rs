//! Command channel implementation
//!
//! Sends one protocol command over a fresh WebSocket connection to the
//! session's cached debugger URL and returns the first response frame.

use crate::cdp::control::CdpSession;
use crate::cdp::traits::CommandChannel;
use crate::cdp::types::CommandEnvelope;
use crate::Error;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

#[async_trait]
impl CommandChannel for CdpSession {
    async fn send(&self, method: &str, params: Value) -> Result<Value, Error> {
        let url = self.debugger_url.read().await.clone().ok_or_else(|| {
            Error::transport("no debugger URL cached; call connect() or activate_target() first")
        })?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let envelope = CommandEnvelope {
            id,
            method: method.to_string(),
            params,
        };
        let frame = serde_json::to_string(&envelope)?;

        let (mut ws, _) = connect_async(&url)
            .await
            .map_err(|e| Error::transport(format!("failed to connect to {}: {}", url, e)))?;

        ws.send(Message::Text(frame))
            .await
            .map_err(|e| Error::transport(format!("failed to send command frame: {}", e)))?;

        // The first inbound text frame is taken as the response; no id
        // correlation is attempted, so under concurrent traffic on the same
        // target the frame may belong to another exchange.
        let response = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(Message::Ping(data))) => {
                    let _ = ws.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(Error::transport(
                        "socket closed before a response frame arrived",
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(Error::transport(format!("WebSocket error: {}", e)));
                }
            }
        };

        let _ = ws.close(None).await;

        let value: Value = serde_json::from_str(&response)
            .map_err(|e| Error::protocol(format!("malformed response frame: {}", e)))?;

        debug!("Command {} (id {}) round trip complete", method, id);
        Ok(value)
    }

    async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, Error> {
        match tokio::time::timeout(deadline, self.send(method, params)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!(
                "command {} exceeded {:?}",
                method, deadline
            ))),
        }
    }
}

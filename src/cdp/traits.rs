//! CDP session layer traits
//!
//! This module defines the abstract interfaces for talking to the browser's
//! debugging endpoint: target lifecycle over HTTP, commands over WebSocket.

use crate::cdp::types::Target;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Target discovery and lifecycle over the HTTP control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync + std::fmt::Debug {
    /// List current targets.
    ///
    /// A connection failure surfaces as [`crate::Error::Transport`]; a
    /// response that is not valid JSON yields an empty list. Callers can
    /// therefore distinguish "no targets" from "server unreachable".
    async fn list_targets(&self) -> Result<Vec<Target>, crate::Error>;

    /// Open a new target at `url`
    async fn new_target(&self, url: &str) -> Result<(), crate::Error>;

    /// Bring a target to the front.
    ///
    /// With `None`, resolves the first listed target and caches its debugger
    /// URL as the command-channel endpoint.
    async fn activate_target(&self, id: Option<&str>) -> Result<(), crate::Error>;

    /// Close the most recently opened page-typed target.
    ///
    /// "Most recently opened" is the last page-typed entry in list order;
    /// fails with [`crate::Error::NoTargets`] when no page target exists.
    async fn close_last_opened(&self) -> Result<(), crate::Error>;
}

/// One-shot command/response traffic over a target's debugger socket.
#[async_trait]
pub trait CommandChannel: Send + Sync + std::fmt::Debug {
    /// Send one command and return the first response frame as JSON.
    ///
    /// No deadline is imposed; use [`CommandChannel::send_with_timeout`] when
    /// bounded latency is required.
    async fn send(&self, method: &str, params: Value) -> Result<Value, crate::Error>;

    /// Send one command, bounding the whole round trip by `deadline`.
    ///
    /// Returns [`crate::Error::Timeout`] when the deadline elapses.
    async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, crate::Error>;
}

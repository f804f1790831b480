//! Process supervision traits
//!
//! Abstract interfaces for launching browser processes and reporting their
//! health to concurrent pollers.

use async_trait::async_trait;
use std::path::Path;

/// Starts processes detached from the caller and guarantees termination of
/// every tracked pid on teardown.
///
/// The supervisor is an owned object passed down to whatever needs it and
/// torn down explicitly at shutdown; nothing here relies on finalization.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Spawn `executable` with `args`, detached from stdio, and track its pid
    async fn start_detached(&self, executable: &Path, args: &[String]) -> Result<u32, crate::Error>;

    /// Whether a tracked pid is still running
    async fn is_alive(&self, pid: u32) -> bool;

    /// Kill and await every tracked process. Idempotent.
    async fn cleanup(&self) -> Result<(), crate::Error>;
}

/// Readiness of the debugging service backing a browser handle.
///
/// Exposed explicitly by the supervisor so pollers never reach into another
/// component's internals to learn whether the service is up.
#[async_trait]
pub trait Health: Send + Sync {
    /// Whether the service is ready to accept traffic
    async fn is_ready(&self) -> bool;
}

//! Stealthdriver: undetected browser automation over the DevTools control plane
//!
//! This library drives a browser through its remote-debugging surface: an
//! HTTP control plane for target lifecycle, a WebSocket command channel, and
//! a background event reactor that drains buffered browser logs and
//! dispatches protocol events to registered handlers. A process supervisor
//! launches and tears down the browser and driver, and the driver patcher
//! strips detectable signature strings before first launch.

pub mod config;
pub mod error;

pub mod cdp;
pub mod launch;
pub mod patcher;
pub mod process;
pub mod reactor;

// Re-exports
pub use error::{Error, Result};

/// Stealthdriver library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

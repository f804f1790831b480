//! CDP session layer
//!
//! Talks to the browser's remote-debugging surface on two planes:
//!
//! - **Control plane**: HTTP routes under `http://{host}:{port}/json/...` for
//!   target discovery and lifecycle (list/new/activate/close)
//! - **Command channel**: a per-command WebSocket round trip against the
//!   cached target debugger URL
//!
//! Both live on [`CdpSession`]; the session caches the debugger URL of the
//! most recently resolved target and stamps every command with a monotonic id.
//!
//! ## Module structure
//! - `traits`: core trait definitions for both planes
//! - `types`: wire types (targets, envelopes, log records)
//! - `control`: HTTP control-plane implementation
//! - `channel`: one-shot WebSocket command implementation
//! - `mock`: mock implementations for testing

pub mod channel;
pub mod control;
pub mod mock;
pub mod traits;
pub mod types;

pub use control::CdpSession;
pub use traits::{CommandChannel, ControlPlane};
pub use types::{CommandEnvelope, EventEnvelope, LogRecord, Target};

// Re-export mocks for development/testing
pub use mock::{MockCommandChannel, MockControlPlane};

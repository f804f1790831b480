//! Event reactor
//!
//! A background loop that waits for the debugging service to become ready,
//! then repeatedly drains the browser's buffered event logs and dispatches
//! parsed protocol events to method-keyed handlers.
//!
//! The reactor isolates every failure it meets: a bad log entry never stops
//! the batch, a failed fetch never stops the loop, and a torn-down session
//! (`invalid session id`) is silenced as an expected teardown race. Only an
//! explicit [`Reactor::stop`] ends the loop.
//!
//! ## Module structure
//! - `registry`: method-keyed handler registry
//! - `source`: buffered-log access to the browser handle
//! - `listener`: the polling loop and its lifecycle

pub mod listener;
pub mod registry;
pub mod source;


pub use listener::{Reactor, ReactorState};
pub use registry::{EventHandler, HandlerRegistry, WILDCARD};
pub use source::{LogSource, WebDriverLogSource};

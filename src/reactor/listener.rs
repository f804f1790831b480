//! Background event loop
//!
//! Polls the browser handle's buffered logs on a fixed interval and
//! dispatches parsed protocol events to registered handlers.

use crate::cdp::types::EventEnvelope;
use crate::process::Health;
use crate::reactor::registry::HandlerRegistry;
use crate::reactor::source::LogSource;
use crate::Error;
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Reactor lifecycle. Never transitions back to `Running` once `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Created,
    Running,
    Stopped,
}

/// Background consumer of browser-emitted event logs.
///
/// Shares the browser handle with other pollers through one exclusive lock:
/// health checks and log fetches run inside it, dispatch runs outside it.
pub struct Reactor {
    source: Arc<Mutex<dyn LogSource>>,
    health: Arc<dyn Health>,
    handlers: RwLock<HandlerRegistry>,
    state: StdMutex<ReactorState>,
    cancel: Notify,
    poll_interval: Duration,
    ready_backoff: Duration,
    categories: Vec<String>,
}

impl Reactor {
    /// Create a reactor over a browser handle and its health capability.
    ///
    /// Defaults: 1s polling interval, 250ms ready-wait backoff, and the
    /// `browser`/`network`/`performance` log categories.
    pub fn new(source: Arc<Mutex<dyn LogSource>>, health: Arc<dyn Health>) -> Self {
        Self {
            source,
            health,
            handlers: RwLock::new(HandlerRegistry::new()),
            state: StdMutex::new(ReactorState::Created),
            cancel: Notify::new(),
            poll_interval: Duration::from_millis(1000),
            ready_backoff: Duration::from_millis(250),
            categories: vec![
                "browser".to_string(),
                "network".to_string(),
                "performance".to_string(),
            ],
        }
    }

    /// Override the log categories drained each iteration
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Override the polling interval and ready-wait backoff
    pub fn with_intervals(mut self, poll_interval: Duration, ready_backoff: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.ready_backoff = ready_backoff;
        self
    }

    /// Register a handler under `method` (case-insensitive), or `"*"` to
    /// receive every event. Last registration wins.
    pub fn register_handler<F>(&self, method: &str, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.register(method, callback);
    }

    /// Current lifecycle state
    pub fn state(&self) -> ReactorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the polling loop is active
    pub fn is_running(&self) -> bool {
        self.state() == ReactorState::Running
    }

    /// Start the polling loop as a background task.
    ///
    /// Fails unless the reactor is freshly created; a stopped reactor never
    /// runs again.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, Error> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != ReactorState::Created {
                return Err(Error::internal(format!(
                    "reactor cannot start from state {:?}",
                    *state
                )));
            }
            *state = ReactorState::Running;
        }

        info!("Starting event reactor");
        let reactor = Arc::clone(self);
        Ok(tokio::spawn(async move { reactor.listen().await }))
    }

    /// Signal the loop to stop. Idempotent and safe from any context.
    ///
    /// Takes effect within one polling interval; the batch currently being
    /// dispatched always completes.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == ReactorState::Stopped {
                return;
            }
            *state = ReactorState::Stopped;
        }
        info!("Stopping event reactor");
        self.cancel.notify_waiters();
    }

    async fn listen(self: Arc<Self>) {
        debug!("Reactor loop entered");

        while self.is_running() {
            if !self.wait_service_ready().await {
                break;
            }
            if !self.pause(self.poll_interval).await {
                break;
            }

            let batch = self.fetch_batch().await;
            for payload in &batch {
                self.dispatch_entry(payload);
            }
        }

        self.stop();
        info!("Reactor loop exited");
    }

    /// Block until the debugging service is ready, checking under the handle
    /// lock and backing off with it released. Returns false when cancelled.
    async fn wait_service_ready(&self) -> bool {
        loop {
            if !self.is_running() {
                return false;
            }

            let ready = {
                let _guard = self.source.lock().await;
                self.health.is_ready().await
            };
            if ready {
                return true;
            }

            if !self.pause(self.ready_backoff).await {
                return false;
            }
        }
    }

    /// Cancellable sleep; false when `stop()` fired
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_running(),
            _ = self.cancel.notified() => false,
        }
    }

    /// Drain every configured category under the exclusive handle lock.
    ///
    /// The guard drops at scope end no matter how a fetch goes. A fetch
    /// failure never aborts the iteration: a torn-down session is silenced
    /// entirely, anything else is logged at debug and skipped.
    async fn fetch_batch(&self) -> Vec<String> {
        let mut batch = Vec::new();
        let mut source = self.source.lock().await;

        for category in &self.categories {
            match source.fetch(category).await {
                Ok(entries) => batch.extend(entries),
                Err(e) if e.is_session_ended() => {}
                Err(e) => debug!("Log fetch for {} failed: {}", category, e),
            }
        }

        batch
    }

    /// Parse one log-entry payload and invoke the matching handler.
    ///
    /// Entries without a `message.method` are not events and are skipped;
    /// any per-entry failure is logged and contained.
    fn dispatch_entry(&self, payload: &str) {
        let envelope: EventEnvelope = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to parse log entry: {}", e);
                return;
            }
        };

        let Some(method) = envelope.method() else {
            return;
        };

        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        let outcome =
            catch_unwind(AssertUnwindSafe(|| handlers.dispatch(method, &envelope.message)));
        if outcome.is_err() {
            error!("Handler for {} panicked", method);
        }
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("state", &self.state())
            .field("poll_interval", &self.poll_interval)
            .field("ready_backoff", &self.ready_backoff)
            .field("categories", &self.categories)
            .finish()
    }
}

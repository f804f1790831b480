//! Control-plane client implementation
//!
//! Issues HTTP requests against the browser's debugging endpoint to discover,
//! create, activate, and close targets.

use crate::cdp::traits::ControlPlane;
use crate::cdp::types::Target;
use crate::Error;
use async_trait::async_trait;
use phf::phf_map;
use std::sync::atomic::AtomicU64;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Control-plane routes rooted at the debugger's host:port
static ENDPOINTS: phf::Map<&'static str, &'static str> = phf_map! {
    "json" => "/json",
    "protocol" => "/json/protocol",
    "list" => "/json/list",
    "new" => "/json/new?{url}",
    "activate" => "/json/activate/{id}",
    "close" => "/json/close/{id}",
};

/// Look up a control-plane route. Names are compile-time constants, so a
/// miss is a programming error.
fn route(name: &str) -> &'static str {
    ENDPOINTS
        .get(name)
        .copied()
        .expect("unknown control-plane route")
}

/// CDP session: control-plane operations plus the command channel.
///
/// The session never owns a target; it caches the most recently resolved
/// debugger URL, which the command channel dials per command.
#[derive(Debug)]
pub struct CdpSession {
    /// HTTP client for control-plane calls (separate short-lived connections)
    pub(super) http: reqwest::Client,
    /// Base address, e.g. "http://127.0.0.1:9222"
    pub(super) server_addr: String,
    /// ID of the first target discovered by [`CdpSession::connect`]
    pub(super) session_id: RwLock<Option<String>>,
    /// Cached command-channel endpoint
    pub(super) debugger_url: RwLock<Option<String>>,
    /// Next command ID; increments by exactly 1 per issued command
    pub(super) next_id: AtomicU64,
}

impl CdpSession {
    /// Create a session against a `host:port` debugging address
    pub fn new<S: AsRef<str>>(debugger_address: S) -> Self {
        let server_addr = format!("http://{}", debugger_address.as_ref());
        info!("Creating CDP session for {}", server_addr);
        Self {
            http: reqwest::Client::new(),
            server_addr,
            session_id: RwLock::new(None),
            debugger_url: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Discover the first available target and cache its debugger URL
    pub async fn connect(&self) -> Result<(), Error> {
        let targets = self.fetch_targets(route("json")).await?;
        let first = targets
            .first()
            .ok_or_else(|| Error::no_targets("debugging endpoint reported no targets"))?;

        *self.session_id.write().await = Some(first.id.clone());
        *self.debugger_url.write().await = first.debugger_url.clone();

        debug!("Connected to target {} ({})", first.id, first.url);
        Ok(())
    }

    /// ID of the target resolved at connect time
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// The currently cached command-channel endpoint
    pub async fn debugger_url(&self) -> Option<String> {
        self.debugger_url.read().await.clone()
    }

    /// GET a discovery route and parse the target array.
    ///
    /// A body that is not valid JSON is an empty list, not an error; a
    /// connection failure still propagates.
    async fn fetch_targets(&self, path: &str) -> Result<Vec<Target>, Error> {
        let url = format!("{}{}", self.server_addr, path);
        let body = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET {} failed: {}", url, e)))?
            .text()
            .await
            .map_err(|e| Error::transport(format!("failed to read {} body: {}", url, e)))?;

        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    /// POST a lifecycle route, discarding the body
    async fn post(&self, path: &str) -> Result<(), Error> {
        let url = format!("{}{}", self.server_addr, path);
        self.http
            .post(&url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("POST {} failed: {}", url, e)))?;
        Ok(())
    }
}

/// The last page-typed target in list order.
///
/// List order is the only available "most recently opened" signal; the server
/// typically preserves creation order.
pub(crate) fn last_page_target(targets: &[Target]) -> Option<&Target> {
    targets.iter().rev().find(|t| t.target_type == "page")
}

#[async_trait]
impl ControlPlane for CdpSession {
    async fn list_targets(&self) -> Result<Vec<Target>, Error> {
        self.fetch_targets(route("list")).await
    }

    async fn new_target(&self, url: &str) -> Result<(), Error> {
        let path = route("new").replace("{url}", &urlencoding::encode(url));
        let request_url = format!("{}{}", self.server_addr, path);

        debug!("Opening new target at {}", url);

        // Modern devtools rejects GET here; PUT is the accepted verb.
        self.http
            .put(&request_url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("PUT {} failed: {}", request_url, e)))?;
        Ok(())
    }

    async fn activate_target(&self, id: Option<&str>) -> Result<(), Error> {
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                let targets = self.list_targets().await?;
                let active = targets
                    .first()
                    .ok_or_else(|| Error::no_targets("target list is empty"))?;
                *self.debugger_url.write().await = active.debugger_url.clone();
                active.id.clone()
            }
        };

        info!("Activating target {}", id);
        self.post(&route("activate").replace("{id}", &id)).await
    }

    async fn close_last_opened(&self) -> Result<(), Error> {
        let targets = self.list_targets().await?;
        let target = last_page_target(&targets)
            .ok_or_else(|| Error::no_targets("no page-typed target to close"))?;

        info!("Closing target {} ({})", target.id, target.url);
        self.post(&route("close").replace("{id}", &target.id)).await
    }
}

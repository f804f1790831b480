//! Browser launch options
//!
//! Builds the browser command line, allocates a debug port, manages the user
//! data directory, and merges preference overrides into the profile on disk.

use crate::Error;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Candidate browser binaries probed on PATH, in preference order
const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Options controlling how the browser is launched
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Browser binary (resolved from PATH when unset)
    pub binary: Option<PathBuf>,
    /// Debugging endpoint host
    pub debugger_host: String,
    /// Debugging endpoint port (0 = allocate a free one)
    pub debugger_port: u16,
    /// Profile directory (a throwaway temp dir when unset)
    pub user_data_dir: Option<PathBuf>,
    /// Keep the profile directory after shutdown
    pub keep_user_data_dir: bool,
    /// Browser UI language (system language when unset)
    pub lang: Option<String>,
    /// Run without a visible window
    pub headless: bool,
    /// Disable the sandbox (required in most containers)
    pub no_sandbox: bool,
    /// Skip first-run and default-browser prompts
    pub suppress_welcome: bool,
    /// Browser log level (0 = INFO)
    pub log_level: u8,
    /// Window size as (width, height)
    pub window_size: (u32, u32),
    /// Additional raw arguments appended verbatim
    pub extra_args: Vec<String>,
    /// Preference overrides; dotted keys nest (e.g. `profile.exit_type`)
    pub prefs: BTreeMap<String, Value>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            binary: None,
            debugger_host: "127.0.0.1".to_string(),
            debugger_port: 0,
            user_data_dir: None,
            keep_user_data_dir: false,
            lang: None,
            headless: false,
            no_sandbox: true,
            suppress_welcome: true,
            log_level: 0,
            window_size: (1920, 1080),
            extra_args: Vec::new(),
            prefs: BTreeMap::new(),
        }
    }
}

impl LaunchOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// The `host:port` form of the debugging endpoint
    pub fn debugger_address(&self) -> String {
        format!("{}:{}", self.debugger_host, self.debugger_port)
    }

    /// Allocate a free port when none was requested
    pub fn ensure_port(&mut self) -> Result<u16, Error> {
        if self.debugger_port == 0 {
            self.debugger_port = free_port()?;
            debug!("Allocated debug port {}", self.debugger_port);
        }
        Ok(self.debugger_port)
    }

    /// Create a throwaway profile directory when none was given.
    ///
    /// Caller-supplied directories are kept after shutdown; generated ones
    /// are not.
    pub fn ensure_user_data_dir(&mut self) -> Result<PathBuf, Error> {
        let dir = match &self.user_data_dir {
            Some(dir) => {
                self.keep_user_data_dir = true;
                dir.clone()
            }
            None => {
                let dir =
                    std::env::temp_dir().join(format!("stealthdriver-{}", uuid::Uuid::new_v4()));
                self.keep_user_data_dir = false;
                self.user_data_dir = Some(dir.clone());
                dir
            }
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Resolve the browser binary, probing PATH when unset
    pub fn resolve_binary(&mut self) -> Result<PathBuf, Error> {
        if let Some(binary) = &self.binary {
            if !binary.exists() {
                return Err(Error::configuration(format!(
                    "browser executable not found at {}",
                    binary.display()
                )));
            }
            return Ok(binary.clone());
        }

        for candidate in BROWSER_CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                debug!("Resolved browser binary: {}", path.display());
                self.binary = Some(path.clone());
                return Ok(path);
            }
        }

        Err(Error::configuration(
            "could not determine browser executable; set browser_path",
        ))
    }

    /// Render the final command line
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-host={}", self.debugger_host),
            format!("--remote-debugging-port={}", self.debugger_port),
        ];

        if let Some(dir) = &self.user_data_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }

        let lang = self.lang.clone().unwrap_or_else(system_language);
        args.push(format!("--lang={}", lang));

        if self.suppress_welcome {
            args.push("--no-default-browser-check".to_string());
            args.push("--no-first-run".to_string());
        }

        if self.no_sandbox {
            args.push("--no-sandbox".to_string());
            args.push("--test-type".to_string());
        }

        if self.headless {
            args.push("--headless=new".to_string());
        }

        args.push(format!(
            "--window-size={},{}",
            self.window_size.0, self.window_size.1
        ));
        args.push("--start-maximized".to_string());
        args.push(format!("--log-level={}", self.log_level));

        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Merge preference overrides into the profile's `Default/Preferences`
    /// and clear the `exit_type` crash flag so no restore-pages nag appears.
    pub fn prepare_profile(&self) -> Result<(), Error> {
        let Some(user_data_dir) = &self.user_data_dir else {
            return Err(Error::configuration(
                "user data dir not set; call ensure_user_data_dir first",
            ));
        };

        let default_dir = user_data_dir.join("Default");
        std::fs::create_dir_all(&default_dir)?;
        let prefs_file = default_dir.join("Preferences");

        let mut merged: Map<String, Value> = if prefs_file.exists() {
            let content = std::fs::read_to_string(&prefs_file)?;
            serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Discarding unreadable Preferences file: {}", e);
                Map::new()
            })
        } else {
            Map::new()
        };

        for (key, value) in &self.prefs {
            merge_nested(&mut merged, undot_key(key, value.clone()));
        }

        // exit_type records the previous run's crash state
        if let Some(profile) = merged.get_mut("profile").and_then(|p| p.as_object_mut()) {
            if profile.contains_key("exit_type") {
                profile.insert("exit_type".to_string(), Value::Null);
            }
        }

        std::fs::write(&prefs_file, serde_json::to_string_pretty(&merged)?)?;
        Ok(())
    }
}

/// Expand a dotted key into nested objects: `a.b.c = v` becomes `{a:{b:{c:v}}}`
fn undot_key(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    match key.split_once('.') {
        Some((head, rest)) => {
            map.insert(head.to_string(), Value::Object(undot_key(rest, value)));
        }
        None => {
            map.insert(key.to_string(), value);
        }
    }
    map
}

/// Merge `b` into `a`, recursing into objects present on both sides
fn merge_nested(a: &mut Map<String, Value>, b: Map<String, Value>) {
    for (key, value) in b {
        match (a.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_nested(existing, incoming);
            }
            (_, value) => {
                a.insert(key, value);
            }
        }
    }
}

/// Pick a free TCP port by binding port 0
pub fn free_port() -> Result<u16, Error> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Browser language from the environment, `en-US` when undeterminable
fn system_language() -> String {
    std::env::var("LANG")
        .ok()
        .and_then(|lang| lang.split('.').next().map(|l| l.replace('_', "-")))
        .filter(|lang| !lang.is_empty() && lang != "C")
        .unwrap_or_else(|| "en-US".to_string())
}

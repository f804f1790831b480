//! Configuration management for Stealthdriver

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host the browser's debugging endpoint binds to
    pub debugger_host: String,

    /// Port of the browser's debugging endpoint (0 = pick a free port)
    pub debugger_port: u16,

    /// Browser executable path (resolved from PATH when unset)
    pub browser_path: Option<String>,

    /// Driver executable path (defaults to the patcher data directory)
    pub driver_path: Option<String>,

    /// User data directory (a throwaway temp profile when unset)
    pub user_data_dir: Option<String>,

    /// Reactor polling interval in milliseconds
    pub poll_interval: u64,

    /// Reactor ready-wait backoff in milliseconds
    pub ready_backoff: u64,

    /// Buffered log categories the reactor drains
    pub log_categories: Vec<String>,

    /// Default deadline for command round trips in milliseconds
    pub command_timeout: u64,

    /// Launch the browser headless
    pub headless: bool,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debugger_host: "127.0.0.1".to_string(),
            debugger_port: 0,
            browser_path: None,
            driver_path: None,
            user_data_dir: None,
            poll_interval: 1000,
            ready_backoff: 250,
            log_categories: vec![
                "browser".to_string(),
                "network".to_string(),
                "performance".to_string(),
            ],
            command_timeout: 30000,
            headless: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(host) = env::var("STEALTH_HOST") {
            config.debugger_host = host;
        }

        if let Ok(port) = env::var("STEALTH_PORT") {
            config.debugger_port = port
                .parse()
                .map_err(|_| Error::configuration("Invalid STEALTH_PORT"))?;
        }

        if let Ok(browser_path) = env::var("STEALTH_BROWSER_PATH") {
            config.browser_path = Some(browser_path);
        }

        if let Ok(driver_path) = env::var("STEALTH_DRIVER_PATH") {
            config.driver_path = Some(driver_path);
        }

        if let Ok(data_dir) = env::var("STEALTH_DATA_DIR") {
            config.user_data_dir = Some(data_dir);
        }

        if let Ok(interval) = env::var("STEALTH_POLL_INTERVAL") {
            config.poll_interval = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid STEALTH_POLL_INTERVAL"))?;
        }

        if let Ok(backoff) = env::var("STEALTH_READY_BACKOFF") {
            config.ready_backoff = backoff
                .parse()
                .map_err(|_| Error::configuration("Invalid STEALTH_READY_BACKOFF"))?;
        }

        if let Ok(categories) = env::var("STEALTH_LOG_CATEGORIES") {
            config.log_categories = categories
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }

        if let Ok(timeout) = env::var("STEALTH_COMMAND_TIMEOUT") {
            config.command_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid STEALTH_COMMAND_TIMEOUT"))?;
        }

        if let Ok(headless) = env::var("STEALTH_HEADLESS") {
            config.headless = headless
                .parse()
                .map_err(|_| Error::configuration("Invalid STEALTH_HEADLESS"))?;
        }

        if let Ok(log_level) = env::var("STEALTH_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// The `host:port` form of the debugging endpoint
    pub fn debugger_address(&self) -> String {
        format!("{}:{}", self.debugger_host, self.debugger_port)
    }
}

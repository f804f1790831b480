//! Driver executable patching
//!
//! Browsers driven through the stock driver expose well-known `cdc_`-prefixed
//! injection variables that detection scripts probe for. The patcher scans
//! the driver binary for those signature identifiers and overwrites each one
//! in place with a randomized identifier of identical length.

use crate::Error;
use async_trait::async_trait;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Signature prefix baked into the stock driver
const SIGNATURE_PREFIX: &[u8] = b"cdc_";

/// Length of the identifier body following the prefix
const SIGNATURE_BODY_LEN: usize = 22;

/// Ensures a driver executable exists locally and has had its detection
/// signatures replaced before first launch.
#[async_trait]
pub trait DriverPatcher: Send + Sync {
    /// Verify (and when needed patch) the driver, returning the executable
    /// path to launch. `version_main` constrains the driver's major version
    /// when given.
    async fn ensure_patched(&self, version_main: Option<u32>) -> Result<PathBuf, Error>;
}

/// Driver patcher implementation working on an on-disk executable
#[derive(Debug, Clone)]
pub struct DriverPatcherImpl {
    executable_path: PathBuf,
}

impl DriverPatcherImpl {
    /// Create a patcher for the driver at `executable_path`
    pub fn new<P: Into<PathBuf>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.into(),
        }
    }

    /// Default driver location under the platform data directory
    pub fn default_executable_path() -> PathBuf {
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        let name = if cfg!(windows) {
            "patched_chromedriver.exe"
        } else {
            "patched_chromedriver"
        };
        base.join("stealthdriver").join(name)
    }

    /// The driver executable this patcher manages
    pub fn executable_path(&self) -> &Path {
        &self.executable_path
    }

    /// Major version reported by `<driver> --version`, when parseable
    fn driver_version(&self) -> Result<Option<u32>, Error> {
        let output = std::process::Command::new(&self.executable_path)
            .arg("--version")
            .output()
            .map_err(|e| {
                Error::patcher(format!(
                    "failed to run {} --version: {}",
                    self.executable_path.display(),
                    e
                ))
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(parse_major_version(&text))
    }
}

/// Extract the major version from output like `ChromeDriver 120.0.6099.109 (...)`
fn parse_major_version(text: &str) -> Option<u32> {
    text.split_whitespace()
        .find(|token| token.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .and_then(|token| token.split('.').next())
        .and_then(|major| major.parse().ok())
}

/// Byte offsets of every `cdc_` signature identifier in the binary
fn find_signatures(bytes: &[u8]) -> Vec<usize> {
    let mut sites = Vec::new();
    let total_len = SIGNATURE_PREFIX.len() + SIGNATURE_BODY_LEN;

    let mut i = 0;
    while i + total_len <= bytes.len() {
        if bytes[i..].starts_with(SIGNATURE_PREFIX)
            && bytes[i + SIGNATURE_PREFIX.len()..i + total_len]
                .iter()
                .all(|b| b.is_ascii_alphanumeric())
        {
            sites.push(i);
            i += total_len;
        } else {
            i += 1;
        }
    }

    sites
}

/// Overwrite each signature with a same-length randomized identifier.
/// Returns the number of sites patched.
fn patch_bytes(bytes: &mut [u8]) -> usize {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let sites = find_signatures(bytes);
    let total_len = SIGNATURE_PREFIX.len() + SIGNATURE_BODY_LEN;
    let mut rng = rand::thread_rng();

    for &start in &sites {
        // Identifiers must not start with a digit
        bytes[start] = LETTERS[rng.gen_range(0..LETTERS.len())];
        for b in &mut bytes[start + 1..start + total_len] {
            *b = ALPHANUMERIC[rng.gen_range(0..ALPHANUMERIC.len())];
        }
    }

    sites.len()
}

#[async_trait]
impl DriverPatcher for DriverPatcherImpl {
    async fn ensure_patched(&self, version_main: Option<u32>) -> Result<PathBuf, Error> {
        if !self.executable_path.exists() {
            return Err(Error::patcher(format!(
                "driver executable not found at {}; provision it before launching",
                self.executable_path.display()
            )));
        }

        if let Some(wanted) = version_main {
            if let Some(found) = self.driver_version()? {
                if found != wanted {
                    return Err(Error::patcher(format!(
                        "driver major version {} does not match requested {}",
                        found, wanted
                    )));
                }
            }
        }

        let mut bytes = std::fs::read(&self.executable_path)?;
        let sites = find_signatures(&bytes);
        if sites.is_empty() {
            debug!(
                "Driver at {} carries no signature strings",
                self.executable_path.display()
            );
            return Ok(self.executable_path.clone());
        }

        let patched = patch_bytes(&mut bytes);
        std::fs::write(&self.executable_path, bytes)?;

        info!(
            "Replaced {} signature strings in {}",
            patched,
            self.executable_path.display()
        );
        Ok(self.executable_path.clone())
    }
}

//! Process supervisor implementation
//!
//! Tracks every spawned child in a pid registry and kills whatever is still
//! alive on cleanup.

use crate::process::traits::{Health, ProcessSupervisor};
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Process supervisor implementation
#[derive(Debug, Default)]
pub struct ProcessSupervisorImpl {
    /// Tracked children by pid
    processes: Mutex<HashMap<u32, Child>>,
}

impl ProcessSupervisorImpl {
    /// Create a supervisor with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked processes
    pub async fn tracked(&self) -> usize {
        self.processes.lock().await.len()
    }
}

#[async_trait]
impl ProcessSupervisor for ProcessSupervisorImpl {
    async fn start_detached(&self, executable: &Path, args: &[String]) -> Result<u32, Error> {
        let mut command = Command::new(executable);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().map_err(|e| {
            Error::process(format!("failed to start {}: {}", executable.display(), e))
        })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::process("process exited before a pid was assigned"))?;

        self.processes.lock().await.insert(pid, child);
        info!("Started {} (pid {})", executable.display(), pid);

        Ok(pid)
    }

    async fn is_alive(&self, pid: u32) -> bool {
        let mut processes = self.processes.lock().await;
        match processes.get_mut(&pid) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    async fn cleanup(&self) -> Result<(), Error> {
        let mut processes = self.processes.lock().await;
        let count = processes.len();

        for (pid, mut child) in processes.drain() {
            if let Err(e) = child.start_kill() {
                // Already-exited children report InvalidInput here
                debug!("Kill for pid {} skipped: {}", pid, e);
            }
            match child.wait().await {
                Ok(status) => debug!("Pid {} exited with {}", pid, status),
                Err(e) => warn!("Failed to await pid {}: {}", pid, e),
            }
        }

        if count > 0 {
            info!("Cleaned up {} tracked processes", count);
        }
        Ok(())
    }
}

/// Health view over one supervised pid: the service behind the handle is
/// considered ready once its process is running.
pub struct PidHealth {
    supervisor: Arc<dyn ProcessSupervisor>,
    pid: u32,
}

impl PidHealth {
    /// Create a health view for `pid`
    pub fn new(supervisor: Arc<dyn ProcessSupervisor>, pid: u32) -> Self {
        Self { supervisor, pid }
    }
}

#[async_trait]
impl Health for PidHealth {
    async fn is_ready(&self) -> bool {
        self.supervisor.is_alive(self.pid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn test_start_and_cleanup() {
        let supervisor = ProcessSupervisorImpl::new();

        let pid = supervisor
            .start_detached(&shell(), &["-c".to_string(), "sleep 30".to_string()])
            .await
            .unwrap();

        assert!(supervisor.is_alive(pid).await);
        assert_eq!(supervisor.tracked().await, 1);

        supervisor.cleanup().await.unwrap();
        assert_eq!(supervisor.tracked().await, 0);
        assert!(!supervisor.is_alive(pid).await);

        // Cleanup is idempotent
        supervisor.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_is_alive_after_exit() {
        let supervisor = ProcessSupervisorImpl::new();

        let pid = supervisor
            .start_detached(&shell(), &["-c".to_string(), "true".to_string()])
            .await
            .unwrap();

        // Give the child a moment to exit
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!supervisor.is_alive(pid).await);

        supervisor.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_missing_executable() {
        let supervisor = ProcessSupervisorImpl::new();

        let result = supervisor
            .start_detached(Path::new("/nonexistent/browser"), &[])
            .await;

        assert!(matches!(result, Err(Error::Process(_))));
    }

    #[tokio::test]
    async fn test_pid_health_tracks_liveness() {
        let supervisor = Arc::new(ProcessSupervisorImpl::new());

        let pid = supervisor
            .start_detached(&shell(), &["-c".to_string(), "sleep 30".to_string()])
            .await
            .unwrap();

        let health = PidHealth::new(supervisor.clone() as Arc<dyn ProcessSupervisor>, pid);
        assert!(health.is_ready().await);

        supervisor.cleanup().await.unwrap();
        assert!(!health.is_ready().await);
    }
}

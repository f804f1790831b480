//! Stealthdriver entry point
//!
//! Wires the full stack together: patches the driver, launches the browser
//! and driver as supervised processes, attaches the control plane, and runs
//! the event reactor until a shutdown signal arrives.

use stealthdriver::{
    cdp::{CdpSession, CommandChannel, ControlPlane},
    config::Config,
    launch::{free_port, LaunchOptions},
    patcher::{DriverPatcher, DriverPatcherImpl},
    process::{PidHealth, ProcessSupervisor, ProcessSupervisorImpl},
    reactor::{LogSource, Reactor, WebDriverLogSource},
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Attempts made while waiting for a freshly launched service to answer
const STARTUP_ATTEMPTS: u32 = 40;

/// Delay between startup attempts
const STARTUP_BACKOFF: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Stealthdriver v{}", stealthdriver::VERSION);

    let config = Config::from_env()?;

    // Patch the driver before anything launches
    let driver_path = config
        .driver_path
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(DriverPatcherImpl::default_executable_path);
    let patcher = DriverPatcherImpl::new(driver_path);
    let driver_path = patcher.ensure_patched(None).await?;

    // Prepare launch options and the profile on disk
    let mut options = LaunchOptions {
        binary: config.browser_path.clone().map(PathBuf::from),
        debugger_host: config.debugger_host.clone(),
        debugger_port: config.debugger_port,
        user_data_dir: config.user_data_dir.clone().map(PathBuf::from),
        headless: config.headless,
        ..LaunchOptions::default()
    };
    options.ensure_port()?;
    let user_data_dir = options.ensure_user_data_dir()?;
    let binary = options.resolve_binary()?;
    options.prepare_profile()?;

    let debugger_address = options.debugger_address();
    info!(
        "Launching {} with debugging endpoint {}",
        binary.display(),
        debugger_address
    );

    // Launch browser and driver under one supervisor
    let supervisor = Arc::new(ProcessSupervisorImpl::new());
    supervisor
        .start_detached(&binary, &options.build_args())
        .await?;

    let driver_port = free_port()?;
    let driver_pid = supervisor
        .start_detached(&driver_path, &[format!("--port={}", driver_port)])
        .await?;
    let driver_addr = format!("http://127.0.0.1:{}", driver_port);

    // Attach a driver session to the running browser (it may still be booting)
    let source = attach_with_retry(&driver_addr, &debugger_address, &config.log_categories).await?;
    info!("Driver session {} attached", source.session_id());

    // Control plane against the browser's debugging endpoint
    let session = CdpSession::new(&debugger_address);
    connect_with_retry(&session).await?;
    session.activate_target(None).await?;

    // Enable the event domains so the browser buffers something to drain
    let command_deadline = Duration::from_millis(config.command_timeout);
    for domain in ["Page", "Network"] {
        session
            .send_with_timeout(
                &format!("{}.enable", domain),
                serde_json::json!({}),
                command_deadline,
            )
            .await?;
    }

    // Event reactor over the shared handle
    let health = Arc::new(PidHealth::new(
        supervisor.clone() as Arc<dyn ProcessSupervisor>,
        driver_pid,
    ));
    let source: Arc<Mutex<dyn LogSource>> = Arc::new(Mutex::new(source));
    let reactor = Arc::new(
        Reactor::new(source, health)
            .with_categories(config.log_categories.clone())
            .with_intervals(
                Duration::from_millis(config.poll_interval),
                Duration::from_millis(config.ready_backoff),
            ),
    );
    reactor.register_handler("*", |message| {
        let method = message
            .get("method")
            .and_then(|m| m.as_str())
            .unwrap_or("<unknown>");
        info!("Event: {}", method);
    });
    let reactor_handle = reactor.start()?;

    info!("Running; press Ctrl+C to stop");
    wait_for_shutdown().await;

    // Teardown: stop the reactor first, then every supervised process
    reactor.stop();
    if let Err(e) = reactor_handle.await {
        warn!("Reactor task join failed: {}", e);
    }
    if let Err(e) = supervisor.cleanup().await {
        error!("Process cleanup failed: {}", e);
    }

    if !options.keep_user_data_dir {
        if let Err(e) = std::fs::remove_dir_all(&user_data_dir) {
            warn!("Failed to remove profile dir: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Open the driver session, retrying while the driver boots
async fn attach_with_retry(
    driver_addr: &str,
    debugger_address: &str,
    categories: &[String],
) -> Result<WebDriverLogSource, stealthdriver::Error> {
    let mut last_err = None;
    for _ in 0..STARTUP_ATTEMPTS {
        match WebDriverLogSource::attach(driver_addr, debugger_address, categories).await {
            Ok(source) => return Ok(source),
            Err(e) => {
                last_err = Some(e);
                tokio::time::sleep(STARTUP_BACKOFF).await;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| stealthdriver::Error::transport("driver never became ready")))
}

/// Resolve the first target, retrying while the browser boots
async fn connect_with_retry(session: &CdpSession) -> Result<(), stealthdriver::Error> {
    let mut last_err = None;
    for _ in 0..STARTUP_ATTEMPTS {
        match session.connect().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_err = Some(e);
                tokio::time::sleep(STARTUP_BACKOFF).await;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| stealthdriver::Error::transport("browser never became ready")))
}

/// Block until SIGINT or SIGTERM
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(windows)]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}

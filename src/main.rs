use anyhow::Result;
use wallwatch::Config;
use wallwatch::driver::{ShutdownHandle, Watcher};
use wallwatch::logging::init_logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path as the only argument
    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration from {}: {}", path, e))?,
        None => Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
    };
    config
        .apply_env_overrides()
        .map_err(|e| anyhow::anyhow!("Invalid environment override: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;

    let mut watcher = Watcher::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create watcher: {}", e))?;

    info!("Wallwatch charging station watcher starting up");

    let signal_task = tokio::spawn(wait_for_signal(watcher.shutdown_handle()));

    let result = watcher.run().await;
    signal_task.abort();

    match result {
        Ok(()) => {
            info!("Watcher stopped");
            Ok(())
        }
        Err(e) => {
            error!("Watcher failed with error: {}", e);
            Err(anyhow::anyhow!("Watcher error: {}", e))
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal(handle: ShutdownHandle) {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!("Cannot listen for SIGTERM: {}", e);
            tokio::signal::ctrl_c().await.ok();
        }
    }
    info!("Termination requested");
    handle.request();
}

#[cfg(not(unix))]
async fn wait_for_signal(handle: ShutdownHandle) {
    tokio::signal::ctrl_c().await.ok();
    info!("Termination requested");
    handle.request();
}

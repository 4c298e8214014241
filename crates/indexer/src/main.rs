mod config;
mod scan;
mod state;

use config::{config_path_from_env, load_or_create_config, resolve_path};
use library::Catalog;
use scan::{start_scan, TriggerError};
use state::AppState;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config_path_from_env();
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let index_path = resolve_path(&config_path, config.index_path.trim());
    let catalog = Catalog::open(&index_path)?;
    match catalog.last_scan() {
        Ok(Some(millis)) => info!("Opened {:?}, last scan at {} ms", index_path, millis),
        Ok(None) => info!("Opened {:?}, no completed scan yet", index_path),
        Err(err) => warn!("Failed to read last scan time: {}", err),
    }

    let state = AppState::new(config_path, config, catalog);
    let handle = match start_scan(&state) {
        Ok(handle) => handle,
        Err(TriggerError::Unconfigured) => {
            info!(
                "Music directory not configured yet; set music_root in {:?}.",
                state.config_path
            );
            return Ok(());
        }
        Err(err) => {
            warn!("Scan not started: {}", err);
            return Ok(());
        }
    };

    tokio::select! {
        result = handle.wait() => match result {
            Ok(summary) => info!(
                "Scan finished: {} records, {} failed writes, {} index groups",
                summary.tracks_seen, summary.write_failures, summary.index_groups
            ),
            Err(err) => error!("Scan task failed: {}", err),
        },
        _ = shutdown_signal() => {
            info!("Waiting for the running scan to stop.");
        }
    }
    info!("Library status: {:?}", state.status());
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for ctrl-c: {}", err);
                }
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }

    info!("Shutdown signal received.");
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stargazer::config::ObservatoryConfig;
use stargazer::metrics::{self, Metrics};
use stargazer::observatory::{Observatory, ObservatorySettings, SkyEvent};
use stargazer::oracle::{DiscoveryOracle, NamingOracle, OfflineOracle};
use stargazer::sky::SkyState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Stargazer Observatory v{}", env!("CARGO_PKG_VERSION"));

    let config = ObservatoryConfig::load_or_default();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;
    info!(
        "Configuration loaded: save_path={}, autosave={}, oracle={}",
        config.save_path,
        config.autosave,
        if config.oracle.is_active() { "claude" } else { "offline" }
    );

    let state = match SkyState::load(&config.save_path) {
        Ok(state) => state,
        Err(e) => {
            warn!("Could not load {}: {}. Starting with an empty sky", config.save_path, e);
            SkyState::new()
        }
    };

    let metrics = Arc::new(Metrics::new());
    if config.metrics_port != 0 {
        let metrics_clone = metrics.clone();
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    #[cfg(feature = "oracle")]
    if config.oracle.is_active() {
        let oracle = stargazer::oracle::ClaudeOracle::from_config(&config.oracle);
        return run_session(&config, state, oracle, metrics).await;
    }

    run_session(&config, state, OfflineOracle, metrics).await
}

/// Drive a fixed number of scans, then save and print a summary
async fn run_session<O>(
    config: &ObservatoryConfig,
    state: SkyState,
    oracle: O,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()>
where
    O: NamingOracle + DiscoveryOracle + 'static,
{
    let running = Observatory::spawn(state, oracle, ObservatorySettings::from(config), metrics);
    let handle = running.handle;
    let mut events = running.events;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SkyEvent::ConstellationDiscovered(found) => info!(
                    "{} charted: {} bodies, +{} starlight, +{} data{}",
                    found.name,
                    found.member_count,
                    found.reward.starlight,
                    found.reward.data,
                    if found.name_source.is_fallback() { " (fallback name)" } else { "" }
                ),
                SkyEvent::ConstellationsMerged { target, absorbed, .. } => {
                    info!("{} constellations merged into {}", absorbed.len(), target)
                }
                _ => {}
            }
        }
    });

    let scans = async {
        let interval = Duration::from_millis(config.scan_interval_ms);
        for i in 0..config.scan_count {
            let report = handle.scan().await?;
            // Analyze every fifth body
            if i % 5 == 4 {
                handle.analyze(report.body.id).await?;
            }
            tokio::time::sleep(interval).await;
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        result = scans => {
            if let Err(e) = result {
                error!("Session error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    let state = handle.snapshot().await?;
    info!(
        "Sky: {} bodies, {} constellations, {} starlight, {} data",
        state.bodies.len(),
        state.constellations.len(),
        state.resources.starlight,
        state.resources.data
    );
    for constellation in state.constellations.ordered() {
        info!("  {} ({} bodies)", constellation.name, constellation.len());
    }
    for entry in state.log.recent(5) {
        info!("  [{}] {}", entry.at.format("%H:%M:%S"), entry.message);
    }

    handle.save().await.context("Final save failed")?;
    info!("Observatory stopped");

    Ok(())
}

//! OOM Watcher - restarts StatefulSets after out-of-memory kills
//!
//! This binary runs as a single-replica Deployment, watching the pods of the
//! target StatefulSets and triggering a staggered rolling restart whenever
//! one of them is OOM-killed.

use anyhow::{Context, Result};
use oom_watcher::{api, config::WatcherConfig};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use watcher_lib::{
    health::components, HealthRegistry, KubeClusterClient, StructuredLogger, WatchLoop,
    WatcherMetrics,
};

const BUILD_TAG: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so DEBUG can pick the default log level
    let config = WatcherConfig::load()?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json())
        .init();

    let watch_config = config.watch_config();
    if watch_config.targets.is_empty() {
        warn!("TARGET_STS is empty, detected failures will not restart anything");
    }

    let logger = StructuredLogger::new(&watch_config.namespace, watch_config.verbose);
    logger.log_startup(BUILD_TAG, &watch_config.targets);

    // Kubeconfig from KUBECONFIG or ~/.kube/config, otherwise in-cluster
    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let cluster = Arc::new(KubeClusterClient::new(client));

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::OBSERVER).await;
    health_registry.register(components::REMEDIATOR).await;

    let metrics = WatcherMetrics::new();
    let api_state = api::ApiState::new(health_registry.clone(), metrics);

    let watch_loop = WatchLoop::new(cluster, watch_config, health_registry.clone());
    health_registry.set_ready(true).await;

    // Start health and metrics server
    let mut api_handle = tokio::spawn(api::serve(config.api_port, api_state));

    let result = tokio::select! {
        _ = watch_loop.run() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
            Ok(())
        }
        // Probes are gone once the server stops
        served = &mut api_handle => {
            let err = match served {
                Ok(Ok(())) => anyhow::anyhow!("API server exited"),
                Ok(Err(e)) => e,
                Err(e) => anyhow::Error::new(e).context("API server task failed"),
            };
            error!(error = %format!("{err:#}"), "API server stopped");
            logger.log_shutdown("API server stopped");
            Err(err)
        }
    };

    api_handle.abort();
    info!("Shutting down");

    result
}

//! Funchost metrics publisher

use funchost_common::{LifecycleState, VERSION};
use funchost_metrics::{HostMetricsPublisher, MetricsPublisherOptions, StandbyMonitor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set to "1" while the instance is a placeholder awaiting specialization
const PLACEHOLDER_MODE_VAR: &str = "WEBSITE_PLACEHOLDER_MODE";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting funchost metrics publisher v{}", VERSION);

    let options = MetricsPublisherOptions::from_env()?;

    let initial = if std::env::var(PLACEHOLDER_MODE_VAR).as_deref() == Ok("1") {
        LifecycleState::Standby
    } else {
        LifecycleState::Specialized
    };
    let monitor = StandbyMonitor::new(initial);
    let host = HostMetricsPublisher::new(&options, &monitor)?;

    tracing::info!(lifecycle = %initial, "Metrics publisher ready");

    wait_for_shutdown(&monitor).await?;
    tracing::info!("Shutting down...");
    host.shutdown().await;

    Ok(())
}

/// Wait for Ctrl-C, treating SIGUSR1 as the specialization notification
#[cfg(unix)]
async fn wait_for_shutdown(monitor: &StandbyMonitor) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut specialize = signal(SignalKind::user_defined1())?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => return Ok(result?),
            Some(()) = specialize.recv() => {
                tracing::info!("Received specialization signal");
                monitor.set(LifecycleState::Specialized);
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_monitor: &StandbyMonitor) -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

use anyhow::{Context, Result};
use presence_chat::integration::{Capabilities, IntegrationConfig, Orchestrator};
use presence_chat::ui::{self, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "presence_chat=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting realtime video chatbot");

    let config = IntegrationConfig::from_env().context("invalid configuration")?;
    info!(
        "Backend at {}:{}, capturing every {:?}",
        config.host, config.port, config.capture_interval
    );

    let capabilities = Capabilities::from_config(&config).context("failed to set up capabilities")?;
    let orchestrator = Orchestrator::start(&config, capabilities).context("failed to start workers")?;

    ui::run(AppState::with_orchestrator(orchestrator)).map_err(|e| anyhow::anyhow!("UI error: {e}"))?;

    info!("Goodbye");
    Ok(())
}

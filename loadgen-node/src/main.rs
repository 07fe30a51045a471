use anyhow::{Context, Result};
use tracing::{error, info, warn};

use loadgen_node::config::LoadgenConfig;
use loadgen_node::metrics::{self, all_passed, evaluate_assertions};
use loadgen_node::runner::ScenarioRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadgen_node=info".into()),
        )
        .with_target(false)
        .init();

    info!("Starting loadgen node v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from file if available, otherwise use defaults
    let config = match LoadgenConfig::from_file("config/default") {
        Ok(config) => {
            info!("Configuration loaded from config/default.toml");
            config
        }
        Err(e) => {
            warn!("Failed to load config file: {}, using defaults", e);
            LoadgenConfig::default()
        }
    };

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    if config.metrics.enabled {
        metrics::initialize_metrics();
        let metrics_addr = config
            .metrics
            .listen_addr
            .parse()
            .context("Invalid metrics listen address")?;
        metrics::install_prometheus_exporter(metrics_addr)?;
    }

    let runner = ScenarioRunner::new(config.clone())?;
    let report = runner.run().await?;
    report.log_summary();

    let outcomes = evaluate_assertions(&config.assertions, &report);
    for outcome in &outcomes {
        if outcome.passed {
            info!(assertion = outcome.name, detail = %outcome.detail, "Assertion passed");
        } else {
            error!(assertion = outcome.name, detail = %outcome.detail, "Assertion failed");
        }
    }

    if !all_passed(&outcomes) {
        anyhow::bail!("Scenario assertions failed");
    }

    info!("All assertions passed");
    Ok(())
}

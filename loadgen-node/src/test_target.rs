// Standalone mock gateway for exercising the load generator locally.
// Run with: cargo run --bin test-target

use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use loadgen_node::target;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "test_target=info".into()),
        )
        .with_target(false)
        .init();

    let addr: SocketAddr = std::env::var("TEST_TARGET_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
        .parse()?;

    info!("Starting test target for loadgen-node");
    target::serve(addr).await?;
    Ok(())
}

mod config;

use anyhow::Context;
use clap::Parser as _;
use config::Config;
use qwen_relay::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router, client,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse().validate()?;
    let relay_config = config.relay_config();
    info!("Starting relay with config: {:?}", relay_config);

    let http_client = client::create_hyper_client(
        Duration::from_secs(config.pool_idle_timeout_secs),
        config.pool_max_idle_per_host,
    );
    let app_state = AppState::with_client(relay_config, http_client);
    let mut router = build_router(app_state);

    if config.metrics {
        let (metrics_layer, handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(metrics_layer);

        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener to {metrics_addr}"))?;
        info!("Metrics listening on {}", metrics_addr);

        let metrics_router = build_metrics_router(handle);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_router).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;
    info!("Relay listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}

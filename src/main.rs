use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;

use futures_whale::api::router::create_router;
use futures_whale::api::ws_types::WsMessage;
use futures_whale::binance::{BinanceStreamConnector, FuturesRestClient};
use futures_whale::config::AppConfig;
use futures_whale::engine::WhaleEngine;
use futures_whale::services::run_board_refresher;
use futures_whale::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    // Both reqwest and tungstenite ride on rustls; pick the provider once.
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("rustls crypto provider already installed");
    }

    let metrics_handle = futures_whale::metrics::init_metrics()
        .context("failed to install Prometheus recorder")?;

    let rest = FuturesRestClient::with_timeout(&config.binance_rest_url, config.http_timeout)?;
    let connector = BinanceStreamConnector::new(&config.binance_ws_url);
    let engine = Arc::new(WhaleEngine::start(&config, rest, connector));

    // --- Consumer flow: drain → aggregate → dashboard broadcast ---
    let (ws_tx, _) = broadcast::channel::<WsMessage>(256);
    tokio::spawn(run_board_refresher(
        Arc::clone(&engine),
        config.refresh_interval,
        config.max_rows,
        ws_tx.clone(),
    ));

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        engine: Arc::clone(&engine),
        config,
        ws_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");

    let fatal = {
        let engine = Arc::clone(&engine);
        async move { engine.wait_for_failure().await }
    };

    tokio::select! {
        result = axum::serve(listener, router).into_future() => {
            result.context("HTTP server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        reason = fatal => {
            tracing::error!(reason = %reason, "Whale engine failed");
        }
    }

    engine.stop().await?;
    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

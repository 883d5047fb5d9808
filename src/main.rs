use calory_tracker::{router, AppConfig, AppState, HttpMealApi};
use std::{env, net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("calory_tracker=info"));
    let json_logs = env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    if json_logs {
        fmt().with_env_filter(env_filter).with_target(false).json().init();
    } else {
        fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    info!(api = %config.api_base_url, mode = ?config.entry_mode, "meal service configured");

    let api = Arc::new(HttpMealApi::new(config.api_base_url.clone()));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, api);
    let sweeper = state.spawn_sweeper(SWEEP_EVERY);
    let app = router(state);

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

use std::sync::Arc;

use fleet_console::api;
use fleet_console::backend::memory::MemoryBackend;
use fleet_console::backend::Backend;
use fleet_console::config::Config;
use fleet_console::engine::worker::run_refresh_worker;
use fleet_console::error::AppError;
use fleet_console::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let memory = match &config.seed_file {
        Some(path) => MemoryBackend::from_fixture_file(path)?,
        None => MemoryBackend::new(),
    };
    let backend = Backend::from_memory(Arc::new(memory));

    let (app_state, refresh_rx) = AppState::new(backend, &config);
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(run_refresh_worker(shared_state.clone(), refresh_rx));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        static_dir = %config.static_dir.display(),
        "fleet console started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shared_state.clone()))
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    state.map_refresher.stop();
}

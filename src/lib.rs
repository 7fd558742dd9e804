pub mod accounts; // Registration, login, password change
pub mod advisory; // Symptom triage + chat over a completion service
pub mod api; // REST router, middleware, endpoints
pub mod appointment; // Booking workflow
pub mod authorization;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod doctors; // Doctor directory
pub mod models;
pub mod validation;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Fatal startup and runtime failures reported by [`run`].
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Startup error: {0}")]
    Core(#[from] core_state::CoreError),
    #[error("Cannot start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("Server error: {0}")]
    Server(#[from] api::ServerError),
}

/// Load configuration, migrate the database and serve the API until Ctrl-C.
pub fn run() -> Result<(), RunError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    api::set_expose_internal_details(config.environment.is_development());
    let (ip, port) = (config.bind_addr, config.port);

    // Built before the runtime exists: the blocking HTTP client refuses to
    // start inside one.
    let core = Arc::new(core_state::CoreState::initialize(config)?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(core.clone(), ip, port))
}

async fn serve(
    core: Arc<core_state::CoreState>,
    ip: std::net::IpAddr,
    port: u16,
) -> Result<(), RunError> {
    let mut server = api::start_api_server(core, ip, port).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}

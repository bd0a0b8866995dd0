use healthease_service::{ServiceConfig, create_app, telemetry::init_tracing};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // The credential is read once here; the service refuses to start without it.
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(?config, "Configuration loaded");

    let app = create_app(&config)?;
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("HealthEase service starting on {}", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Start a session: POST http://{}/sessions", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

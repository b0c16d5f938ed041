use physio_core::config::{match_policy_from_env_value, store_backend_from_env_values};
use physio_core::constants::{ENV_MARKER_MATCH, ENV_PATIENT_DATA_DIR, ENV_STORE};
use physio_core::{BundleService, CoreConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the physio bundle service
///
/// Resolves configuration from the environment, opens the bundle store and serves the REST API.
///
/// # Environment Variables
/// - `PHYSIO_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PHYSIO_STORE`: `file` or `memory` (default: "file")
/// - `PATIENT_DATA_DIR`: Directory for the file store (default: "physio_data")
/// - `PHYSIO_MARKER_MATCH`: `exact` or `case-insensitive` (default: "exact")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, store startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("physio=info".parse()?)
                .add_directive("physio_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store_backend = store_backend_from_env_values(
        std::env::var(ENV_STORE).ok(),
        std::env::var(ENV_PATIENT_DATA_DIR).ok(),
    )?;
    let match_policy = match_policy_from_env_value(std::env::var(ENV_MARKER_MATCH).ok())?;
    let cfg = Arc::new(CoreConfig::new(store_backend, match_policy));

    let rest_addr = std::env::var("PHYSIO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!(backend = ?cfg.store_backend(), policy = ?cfg.match_policy(), "opening bundle store");
    let service = Arc::new(BundleService::open(cfg)?);

    tracing::info!("++ Starting physio REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(service)).await?;

    Ok(())
}

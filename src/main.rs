use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, config_from_env, router};

/// Main entry point for the TrialOS application
///
/// Serves the workflow REST API (with Swagger UI at `/swagger-ui`) until interrupted.
///
/// # Environment Variables
/// - `TRIALOS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIALOS_DELAY_SCALE`: multiplier for simulated delays (default 1, 0 disables them)
/// - `TRIALOS_QUICK_ENTRY_MIN_CHARS`: minimum quick-entry summary length (default 20)
/// - `TRIALOS_CONSENT_FOLLOW_UP`: `list` or `review` after consent (default `list`)
/// - `TRIALOS_TRIAL_FIXTURES`: YAML file replacing the embedded trial catalogue
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trialos_run=info".parse()?)
                .add_directive("trialos_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("TRIALOS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = Arc::new(config_from_env()?);

    let state = AppState::new(cfg)?;
    tracing::info!(
        trials = state.catalogue.len(),
        follow_up = ?state.cfg.consent_follow_up(),
        "++ Loaded trial catalogue"
    );
    tracing::info!("++ Starting TrialOS REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- TrialOS stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

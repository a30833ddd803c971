//! Main Entrypoint for the LogicKids API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Validating the exercise catalog.
//! 3. Building the Gemini client and the exercise generator, if a key is set.
//! 4. Constructing the Axum router.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use logickids_api::{config::Config, router::create_router, state::AppState};
use logickids_core::{
    aggregator::ExerciseGenerator,
    catalog::Catalog,
    generation::{GeminiClient, GenerationClient, RetryPolicy},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

fn build_generator(
    config: &Config,
    catalog: Arc<Catalog>,
) -> anyhow::Result<Option<Arc<ExerciseGenerator>>> {
    let Some(api_key) = config.gemini_api_key.as_deref() else {
        warn!("GEMINI_API_KEY is not set. Exercise generation is disabled.");
        return Ok(None);
    };

    let client = GeminiClient::new(
        api_key,
        &config.gemini_api_base,
        &config.gemini_model,
        config.generation_timeout,
    )
    .context("Failed to build Gemini HTTP client")?
    .with_retry(RetryPolicy {
        max_retries: config.generation_max_retries,
        ..RetryPolicy::default()
    });
    info!(endpoint = %client.endpoint(), "Gemini client ready.");

    let client: Arc<dyn GenerationClient> = Arc::new(client);
    let generator = ExerciseGenerator::new(catalog, client)
        .with_concurrency(config.generation_concurrency)
        .with_type_deadline(config.type_deadline());
    Ok(Some(Arc::new(generator)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Catalog and Generator ---
    let catalog = Catalog::standard();
    catalog.validate().context("Exercise catalog is invalid")?;
    let catalog = Arc::new(catalog);

    let generator = build_generator(&config, catalog.clone())?;
    let app_state = Arc::new(AppState::new(catalog, generator, config.clone()));

    // --- 4. Create Router ---
    let app = create_router(app_state);

    // --- 5. Start Server ---
    info!(
        model = %config.gemini_model,
        environment = %config.environment,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}

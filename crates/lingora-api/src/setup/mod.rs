//! Application setup and initialization.
//!
//! All startup logic lives here rather than in main.rs: config validation,
//! database pool and migrations, storage backend, cache, service wiring, and
//! the router.

pub mod cache;
pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use lingora_core::Config;

use crate::state::AppState;

/// Initialize the entire application.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration, before touching any backend.
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_tracing(&config);

    tracing::info!(environment = %config.environment, "Configuration loaded and validated");

    let pool = database::setup_database(&config).await?;

    let storage = storage::setup_storage(&config).await?;

    let cache = cache::setup_cache(&config).await;

    let state = services::initialize_services(&config, pool, storage, cache)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

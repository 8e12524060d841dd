//! Object storage backend initialization.

use std::sync::Arc;

use anyhow::{Context, Result};
use lingora_core::Config;
use lingora_storage::{create_storage, ObjectStorage};

/// Build the configured storage backend and verify the bucket exists.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStorage>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    storage
        .ensure_bucket()
        .await
        .context("Storage bucket check failed")?;

    tracing::info!(backend = %storage.backend_type(), "Storage backend ready");

    Ok(storage)
}

//! Configuration module
//!
//! This module provides configuration for the profile API and services,
//! including database, cache, storage, and avatar processing settings.
//! Values come from the environment with sensible defaults; only
//! `DATABASE_URL` is required.

use std::env;
use std::str::FromStr;

use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const CACHE_TTL_SECS: u64 = 300;
const MIN_AVATAR_SIZE_BYTES: usize = 1024;
const MAX_AVATAR_SIZE_MB: usize = 5;
const MAX_AVATAR_DIMENSION_PX: u32 = 2048;
const AVATAR_TARGET_EDGE_PX: u32 = 512;
const AVATAR_WEBP_QUALITY: f32 = 80.0;
const CLEANUP_WORKERS: usize = 4;
const CLEANUP_QUEUE_CAPACITY: usize = 256;
const MAX_REQUEST_BODY_MB: usize = 16;

/// Application configuration for the profile subsystem.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Cache (absent REDIS_URL means the system runs cache-less)
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub s3_public_base_url: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Avatar processing
    pub min_avatar_size_bytes: usize,
    pub max_avatar_size_bytes: usize,
    pub max_avatar_dimension_px: u32,
    pub avatar_target_edge_px: u32,
    pub avatar_webp_quality: f32,
    pub avatar_allowed_content_types: Vec<String>,
    // Background cleanup
    pub cleanup_workers: usize,
    pub cleanup_queue_capacity: usize,
    // Outbound change notifications (absent URL disables them)
    pub profile_webhook_url: Option<String>,
    // HTTP
    pub max_request_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| StorageBackend::from_str(&s))
            .transpose()?
            .unwrap_or(StorageBackend::Local);

        let max_avatar_size_mb = env::var("MAX_AVATAR_SIZE_MB")
            .unwrap_or_else(|_| MAX_AVATAR_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_AVATAR_SIZE_MB);

        let avatar_allowed_content_types = env::var("AVATAR_ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .unwrap_or(4000);

        let config = Config {
            server_port,
            cors_origins,
            environment,
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            redis_url: env::var("REDIS_URL").ok(),
            cache_ttl_secs: env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| CACHE_TTL_SECS.to_string())
                .parse()
                .unwrap_or(CACHE_TTL_SECS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            s3_public_base_url: env::var("S3_PUBLIC_BASE_URL").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/storage".to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}/files", server_port)),
            min_avatar_size_bytes: env::var("MIN_AVATAR_SIZE_BYTES")
                .unwrap_or_else(|_| MIN_AVATAR_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(MIN_AVATAR_SIZE_BYTES),
            max_avatar_size_bytes: max_avatar_size_mb * 1024 * 1024,
            max_avatar_dimension_px: env::var("MAX_AVATAR_DIMENSION_PX")
                .unwrap_or_else(|_| MAX_AVATAR_DIMENSION_PX.to_string())
                .parse()
                .unwrap_or(MAX_AVATAR_DIMENSION_PX),
            avatar_target_edge_px: env::var("AVATAR_TARGET_EDGE_PX")
                .unwrap_or_else(|_| AVATAR_TARGET_EDGE_PX.to_string())
                .parse()
                .unwrap_or(AVATAR_TARGET_EDGE_PX),
            avatar_webp_quality: env::var("AVATAR_WEBP_QUALITY")
                .unwrap_or_else(|_| AVATAR_WEBP_QUALITY.to_string())
                .parse()
                .unwrap_or(AVATAR_WEBP_QUALITY),
            avatar_allowed_content_types,
            cleanup_workers: env::var("CLEANUP_WORKERS")
                .unwrap_or_else(|_| CLEANUP_WORKERS.to_string())
                .parse()
                .unwrap_or(CLEANUP_WORKERS),
            cleanup_queue_capacity: env::var("CLEANUP_QUEUE_CAPACITY")
                .unwrap_or_else(|_| CLEANUP_QUEUE_CAPACITY.to_string())
                .parse()
                .unwrap_or(CLEANUP_QUEUE_CAPACITY),
            profile_webhook_url: env::var("PROFILE_WEBHOOK_URL").ok(),
            max_request_body_bytes: env::var("MAX_REQUEST_BODY_MB")
                .unwrap_or_else(|_| MAX_REQUEST_BODY_MB.to_string())
                .parse::<usize>()
                .unwrap_or(MAX_REQUEST_BODY_MB)
                * 1024
                * 1024,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            return Err(anyhow::anyhow!("DATABASE_URL must not be empty"));
        }
        if self.storage_backend == StorageBackend::S3 && self.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when STORAGE_BACKEND is s3"
            ));
        }
        if self.min_avatar_size_bytes >= self.max_avatar_size_bytes {
            return Err(anyhow::anyhow!(
                "MIN_AVATAR_SIZE_BYTES ({}) must be below the maximum avatar size ({})",
                self.min_avatar_size_bytes,
                self.max_avatar_size_bytes
            ));
        }
        if self.avatar_target_edge_px == 0
            || self.avatar_target_edge_px > self.max_avatar_dimension_px
        {
            return Err(anyhow::anyhow!(
                "AVATAR_TARGET_EDGE_PX must be between 1 and {}",
                self.max_avatar_dimension_px
            ));
        }
        if !(0.0..=100.0).contains(&self.avatar_webp_quality) {
            return Err(anyhow::anyhow!(
                "AVATAR_WEBP_QUALITY must be between 0 and 100"
            ));
        }
        if self.cleanup_workers == 0 {
            return Err(anyhow::anyhow!("CLEANUP_WORKERS must be at least 1"));
        }
        if self.max_request_body_bytes <= self.max_avatar_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_BODY_MB must exceed the avatar size limit so oversize uploads \
                 reach validation instead of being cut off by the transport"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            database_url: "postgres://localhost/lingora_test".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            redis_url: None,
            cache_ttl_secs: CACHE_TTL_SECS,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            s3_public_base_url: None,
            local_storage_path: "./data/storage".to_string(),
            local_storage_base_url: "http://localhost:4000/files".to_string(),
            min_avatar_size_bytes: MIN_AVATAR_SIZE_BYTES,
            max_avatar_size_bytes: MAX_AVATAR_SIZE_MB * 1024 * 1024,
            max_avatar_dimension_px: MAX_AVATAR_DIMENSION_PX,
            avatar_target_edge_px: AVATAR_TARGET_EDGE_PX,
            avatar_webp_quality: AVATAR_WEBP_QUALITY,
            avatar_allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            cleanup_workers: CLEANUP_WORKERS,
            cleanup_queue_capacity: CLEANUP_QUEUE_CAPACITY,
            profile_webhook_url: None,
            max_request_body_bytes: MAX_REQUEST_BODY_MB * 1024 * 1024,
        }
    }

    #[test]
    fn test_default_config_validates() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let mut config = test_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());
        config.s3_bucket = Some("lingora-avatars".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_body_limit_must_exceed_avatar_limit() {
        let mut config = test_config();
        config.max_request_body_bytes = config.max_avatar_size_bytes;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}

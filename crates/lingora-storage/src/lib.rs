//! Lingora Storage Library
//!
//! This crate provides the object storage abstraction and implementations for
//! the profile subsystem. It includes the ObjectStorage trait and backends for
//! S3-compatible services and the local filesystem.
//!
//! # Storage key format
//!
//! Avatar blobs live under an owner-scoped prefix:
//!
//! - `avatars/{owner_hash}/{timestamp_micros}_{random}.{ext}`
//!
//! where `owner_hash` is a short hex digest of the owner id. The timestamp
//! plus random suffix makes keys collision-free across concurrent uploads,
//! and uploads refuse to overwrite an existing key as a second line of
//! defense. Keys must not contain `..` or a leading `/`. Key generation is
//! centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use lingora_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectStorage, StorageError, StorageResult};

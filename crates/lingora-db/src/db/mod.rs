//! Repository implementations for database operations.

pub mod profile;

pub use profile::{PgProfileStore, ProfileStore};

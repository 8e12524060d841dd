//! Database access layer for profile records.
//!
//! The [`ProfileStore`] trait is the seam between the coordinator and the
//! database so tests can substitute an in-memory store. [`PgProfileStore`]
//! is the Postgres implementation; all multi-field merges run inside a
//! row-locked transaction so concurrent writers serialize per owner.

pub mod db;

pub use db::profile::{PgProfileStore, ProfileStore};

/// Schema migrations, embedded at compile time and applied at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

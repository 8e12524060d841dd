//! Data models for the profile subsystem
//!
//! This module contains the profile record, its nested collections, the
//! public profile view, and the typed partial-update payload.

mod profile;
mod update;

// Re-export all models for convenient imports
pub use profile::*;
pub use update::*;

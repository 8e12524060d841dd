//! Lingora Service Layer
//!
//! This crate is the **consistency engine** over the three places a profile
//! lives: the document record in Postgres, the read-through cache, and the
//! avatar blob in object storage. There is no distributed transaction tying
//! them together; consistency comes from a fixed operation order (record
//! first, cache second, blob garbage last), idempotent deletes, and
//! compensating actions. Keep orchestration here; keep thin HTTP handling in
//! lingora-api.

pub mod avatar;
pub mod cleanup;
pub mod coordinator;
pub mod notify;

#[cfg(test)]
pub(crate) mod test_support;

pub use avatar::{AvatarUploadOutcome, AvatarUploadPipeline};
pub use cleanup::AvatarCleanupHandler;
pub use coordinator::ProfileCoordinator;
pub use notify::ChangeNotifier;

//! Background cleanup of superseded storage blobs.
//!
//! When an avatar upload commits, the blob it replaced becomes garbage. The
//! record is already consistent at that point, so deleting the old blob is
//! deliberately asynchronous and best-effort: a bounded in-memory queue with a
//! small worker pool makes a single attempt per task. A dropped or failed task
//! orphans a blob; it never dangles a reference.

pub mod queue;

pub use queue::{CleanupHandler, CleanupQueue, CleanupQueueConfig, CleanupTask};

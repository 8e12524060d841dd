//! HTTP request handlers.

pub mod avatar_upload;
pub mod file_delete;
pub mod profile_get;
pub mod profile_update;

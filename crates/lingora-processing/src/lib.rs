//! Avatar image validation and optimization.
//!
//! Validation runs entirely in memory before any byte reaches object
//! storage. Optimization normalizes accepted uploads to a square WebP at a
//! fixed edge length; when re-encoding fails the validated original is
//! stored unchanged rather than failing the upload.

pub mod optimizer;
pub mod validator;

pub use optimizer::{extension_for_content_type, AvatarOptimizer, OptimizedAvatar};
pub use validator::{AvatarValidator, ValidationError};

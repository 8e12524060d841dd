//! Request identity extraction.
//!
//! Authentication happens upstream at the gateway, which injects the caller's
//! id into every request it forwards. The service trusts that header and
//! nothing else; owner ids in request bodies or paths are ignored.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lingora_core::AppError;

use crate::error::HttpAppError;

/// Header carrying the gateway-authenticated caller id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The calling user, resolved from the gateway identity header.
///
/// Implemented as `FromRequestParts` so it composes with body extractors
/// (`Multipart`, `Json`) in the same handler signature.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub owner_id: String,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(format!(
                    "Missing {} header",
                    USER_ID_HEADER
                )))
            })?;

        Ok(AuthenticatedUser {
            owner_id: owner_id.to_string(),
        })
    }
}

//! Profile read endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use lingora_core::models::ProfileView;

use crate::error::{ErrorResponse, HttpAppError};
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

/// Cache-first read. First access for an owner lazily creates an empty
/// profile, so this never 404s for an authenticated caller.
#[utoipa::path(
    get,
    path = "/api/v0/profile",
    tag = "profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileView),
        (status = 401, description = "Missing identity header", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %user.owner_id, operation = "get_profile"))]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileView>, HttpAppError> {
    let view = state.coordinator.get_profile(&user.owner_id).await?;
    Ok(Json(view))
}

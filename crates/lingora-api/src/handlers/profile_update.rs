//! Profile update endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use validator::Validate;

use lingora_core::models::{ProfileUpdate, ProfileView};
use lingora_core::AppError;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

#[utoipa::path(
    put,
    path = "/api/v0/profile",
    tag = "profile",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 400, description = "Validation failed or empty update", body = ErrorResponse),
        (status = 401, description = "Missing identity header", body = ErrorResponse),
        (status = 409, description = "Unique field conflict or commit race", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, update), fields(owner_id = %user.owner_id, operation = "update_profile"))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    update: ValidatedJson<ProfileUpdate>,
) -> Result<Json<ProfileView>, HttpAppError> {
    let ValidatedJson(update) = update;

    update.validate().map_err(AppError::from)?;
    if update.is_empty() {
        return Err(HttpAppError(AppError::Validation(
            "Update contains no fields".to_string(),
        )));
    }

    let view = state
        .coordinator
        .update_profile(&user.owner_id, &update, &user.owner_id)
        .await?;

    Ok(Json(view))
}

//! File reference deletion endpoint.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use lingora_core::models::FileType;

use crate::error::{ErrorResponse, HttpAppError};
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct FileDeleteResponse {
    /// The storage key that was deleted
    pub deleted: String,
}

/// Idempotent delete: clears the record reference when it matches, then
/// removes the blob. Returns 200 with the key even when nothing existed.
///
/// The route uses a catch-all for `key` because storage keys contain slashes
/// (`avatars/{hash}/{name}`).
#[utoipa::path(
    delete,
    path = "/api/v0/profile/file/{file_type}/{key}",
    tag = "profile",
    params(
        ("file_type" = FileType, Path, description = "Which reference to clear: avatar or document"),
        ("key" = String, Path, description = "Full storage key of the blob")
    ),
    responses(
        (status = 200, description = "Reference cleared and blob deleted", body = FileDeleteResponse),
        (status = 401, description = "Missing identity header", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(owner_id = %user.owner_id, operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path((file_type, key)): Path<(FileType, String)>,
) -> Result<Json<FileDeleteResponse>, HttpAppError> {
    state
        .coordinator
        .delete_file_reference(&user.owner_id, file_type, &key)
        .await?;

    Ok(Json(FileDeleteResponse { deleted: key }))
}

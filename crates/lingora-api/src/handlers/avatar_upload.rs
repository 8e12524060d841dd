//! Avatar upload endpoint.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use lingora_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::extract::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUploadResponse {
    /// Public URL of the committed avatar
    pub avatar_url: String,
    /// Stored size in bytes, after optimization
    pub file_size: u64,
}

/// Pull the single `file` field out of a multipart body.
async fn extract_multipart_file(
    mut multipart: Multipart,
) -> Result<(Vec<u8>, String, String), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" {
            if file_data.is_some() {
                return Err(AppError::Validation(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }
            filename = field.file_name().map(|s: &str| s.to_string());
            content_type = field.content_type().map(|s: &str| s.to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file data: {}", e)))?;

            file_data = Some(data.to_vec());
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let filename = filename.unwrap_or_else(|| "unknown".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((file_data, filename, content_type))
}

#[utoipa::path(
    post,
    path = "/api/v0/profile/avatar",
    tag = "profile",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Form with a single `file` field holding the avatar image"),
    responses(
        (status = 200, description = "Avatar uploaded and committed", body = AvatarUploadResponse),
        (status = 400, description = "Upload rejected by validation", body = ErrorResponse),
        (status = 401, description = "Missing identity header", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(owner_id = %user.owner_id, operation = "upload_avatar")
)]
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<AvatarUploadResponse>, HttpAppError> {
    let (data, filename, content_type) = extract_multipart_file(multipart).await?;

    let outcome = state
        .pipeline
        .upload(&user.owner_id, &filename, &content_type, data)
        .await?;

    Ok(Json(AvatarUploadResponse {
        avatar_url: outcome.avatar_url,
        file_size: outcome.file_size,
    }))
}

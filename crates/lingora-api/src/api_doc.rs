//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use lingora_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lingora Profile API",
        version = "0.1.0",
        description = "Profile service for the learning platform: profile reads and updates, avatar upload with image optimization, and file reference deletion. Profile data is kept consistent across the document store, the read-through cache, and object storage. All endpoints are versioned under /api/v0/ and expect the gateway identity header x-user-id."
    ),
    paths(
        handlers::profile_get::get_profile,
        handlers::profile_update::update_profile,
        handlers::avatar_upload::upload_avatar,
        handlers::file_delete::delete_file,
    ),
    components(
        schemas(
            // Profile view
            models::ProfileView,
            models::ProficiencyLevel,
            models::LearningLanguage,
            models::EducationEntry,
            models::CertificationEntry,
            models::PrivacySettings,
            models::FileType,
            // Update payload
            models::ProfileUpdate,
            models::PersonalInfoUpdate,
            models::ProfessionalInfoUpdate,
            models::PreferencesUpdate,
            models::PrivacyUpdate,
            models::LearningLanguageInput,
            models::EducationEntryInput,
            models::CertificationEntryInput,
            // Responses
            handlers::avatar_upload::AvatarUploadResponse,
            handlers::file_delete::FileDeleteResponse,
            // Error
            error::ErrorResponse,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "profile", description = "Profile read, update, avatar upload, and file deletion")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_contains_all_routes() {
        let spec = ApiDoc::openapi();
        for path in [
            "/api/v0/profile",
            "/api/v0/profile/avatar",
            "/api/v0/profile/file/{file_type}/{key}",
        ] {
            assert!(
                spec.paths.paths.contains_key(path),
                "OpenAPI spec is missing {}",
                path
            );
        }
    }
}

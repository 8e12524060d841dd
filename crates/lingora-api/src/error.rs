//! HTTP error rendering for `AppError`.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>` and use `?` on
//! anything convertible into `AppError`, so every failure renders through one
//! place: status and code from the error metadata, message from
//! `client_message()` (which already withholds sensitive detail), and a
//! server-side log line at the metadata's level.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lingora_core::{AppError, ErrorMetadata, LogLevel};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code for programmatic handling
    pub code: String,
    pub message: String,
}

/// Wire shape of every error response: `{ "error": { "code", "message" } }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Wrapper type for AppError to implement IntoResponse.
/// Needed because of the orphan rule: IntoResponse is an external trait and
/// AppError lives in lingora-core.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on
/// deserialization failure instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code = code, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code = code, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, detail = %error.detailed_message(), code = code, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        log_error(app_error);

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorResponse {
            error: ErrorBody {
                code: app_error.error_code().to_string(),
                message: app_error.client_message(),
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse {
            error: ErrorBody {
                code: "NOT_FOUND".to_string(),
                message: "Profile not found".to_string(),
            },
        };
        let json = serde_json::to_value(&response).expect("serialize");
        let error = json.get("error").expect("nested error object");
        assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("NOT_FOUND"));
        assert_eq!(
            error.get("message").and_then(|v| v.as_str()),
            Some("Profile not found")
        );
    }

    #[test]
    fn test_from_anyhow_maps_to_internal_with_source() {
        let err = anyhow::anyhow!("pool exhausted");
        let HttpAppError(app_err) = err.into();
        match app_err {
            AppError::InternalWithSource { message, .. } => {
                assert_eq!(message, "pool exhausted");
            }
            other => panic!("Expected InternalWithSource, got {:?}", other),
        }
    }

    #[test]
    fn test_into_response_status_codes() {
        let cases = [
            (AppError::Validation("bad".to_string()), 400),
            (AppError::Unauthorized("who".to_string()), 401),
            (AppError::NotFound("gone".to_string()), 404),
            (
                AppError::Conflict {
                    field: "handle".to_string(),
                },
                409,
            ),
            (AppError::ConflictOnCommit, 409),
            (AppError::StorageUnavailable("s3 down".to_string()), 500),
        ];
        for (err, expected) in cases {
            let response = HttpAppError(err).into_response();
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[tokio::test]
    async fn test_sensitive_error_body_hides_detail() {
        let response =
            HttpAppError(AppError::StorageUnavailable("secret endpoint".to_string()))
                .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        let message = json["error"]["message"].as_str().expect("message");
        assert!(!message.contains("secret endpoint"));
        assert_eq!(json["error"]["code"], "STORAGE_UNAVAILABLE");
    }
}

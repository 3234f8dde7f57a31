//! Image upload endpoint used by the medicine and profile forms.
//!
//! Accepts `multipart/form-data` with:
//!
//! - `folder` - `medicines`, `profile` or `uploads` (anything else maps to `uploads`)
//! - `mode` - `single` replaces the field value, `multiple` appends to it
//! - `current` - the field's value, one URL per line
//! - `files` - one or more images
//!
//! Responds with JSON: the uploaded URLs, the field's new value and, when
//! the batch stopped part way, where and why.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use super::{medicines, profile};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::upload::{DEFAULT_FOLDER, MAX_BATCH_FILES, MAX_FILE_SIZE};
use crate::services::{ImageField, UploadError, UploadFile, UploadOutcome};
use crate::state::AppState;

/// Room for the text fields and multipart framing around the files.
const FORM_OVERHEAD: usize = 1024 * 1024;

/// Request body cap for the upload route: a full batch of maximum-size files.
pub const BODY_LIMIT: usize = MAX_BATCH_FILES * MAX_FILE_SIZE + FORM_OVERHEAD;

/// JSON body returned by the upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
    /// The image field after applying the uploads.
    pub value: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct UploadForm {
    folder: Option<String>,
    single: bool,
    current: Vec<String>,
    files: Vec<UploadFile>,
}

impl UploadForm {
    fn folder(&self) -> &str {
        match self.folder.as_deref().map(str::trim) {
            Some(folder @ (medicines::UPLOAD_FOLDER | profile::UPLOAD_FOLDER)) => folder,
            _ => DEFAULT_FOLDER,
        }
    }

    fn field(&self) -> ImageField {
        if self.single {
            ImageField::Single(self.current.first().cloned())
        } else {
            ImageField::Multiple(self.current.clone())
        }
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<UploadForm, MultipartError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folder" => form.folder = Some(field.text().await?),
            "mode" => form.single = field.text().await?.trim() == "single",
            "current" => {
                form.current = field
                    .text()
                    .await?
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect();
            }
            "files" => {
                let name = field.file_name().unwrap_or_default().to_string();
                // Browsers send an empty part when no file was chosen.
                if name.is_empty() {
                    continue;
                }
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?.to_vec();
                form.files.push(UploadFile {
                    name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Upload a batch of images and return the field's new value.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable upload form");
            return error_response(e.status(), e.body_text());
        }
    };

    let caller = admin.caller();
    let folder = form.folder().to_string();
    let mut field = form.field();

    match state
        .uploader()
        .upload_batch(&caller, &folder, form.files)
        .await
    {
        Ok(outcome) => {
            field.apply(outcome.urls());
            let (failed_at, error) = match &outcome {
                UploadOutcome::Complete(_) => (None, None),
                UploadOutcome::Partial {
                    failed_at, error, ..
                } => (Some(*failed_at), Some(error.clone())),
            };
            let status = if error.is_some() {
                StatusCode::MULTI_STATUS
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(UploadResponse {
                    urls: outcome.urls().to_vec(),
                    value: field.into_urls(),
                    failed_at,
                    error,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Upload rejected");
            let message = e.user_message();
            error_response(upload_status(e), message)
        }
    }
}

fn upload_status(err: UploadError) -> StatusCode {
    AppError::from(err).status()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_folder_maps_to_default() {
        let form = UploadForm {
            folder: Some("../secrets".to_string()),
            ..UploadForm::default()
        };
        assert_eq!(form.folder(), "uploads");

        let form = UploadForm {
            folder: Some(" medicines ".to_string()),
            ..UploadForm::default()
        };
        assert_eq!(form.folder(), "medicines");
    }

    #[test]
    fn test_single_mode_keeps_only_first_current_url() {
        let form = UploadForm {
            single: true,
            current: vec!["https://cdn/a.png".to_string(), "https://cdn/b.png".to_string()],
            ..UploadForm::default()
        };
        assert_eq!(
            form.field(),
            ImageField::Single(Some("https://cdn/a.png".to_string()))
        );
    }

    #[test]
    fn test_body_limit_fits_a_full_batch() {
        assert!(BODY_LIMIT > MAX_BATCH_FILES * MAX_FILE_SIZE);
    }

    #[test]
    fn test_rejection_statuses() {
        assert_eq!(upload_status(UploadError::Empty), StatusCode::BAD_REQUEST);
        assert_eq!(
            upload_status(UploadError::TooMany { count: 11 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            upload_status(UploadError::TooLarge {
                name: "x.png".to_string(),
                size: 6 * 1024 * 1024
            }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}

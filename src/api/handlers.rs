use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::model::{FilePart, UploadForm};
use crate::utils::error::{Result, ServiceError};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(rename = "cloudinaryUrl")]
    pub cloudinary_url: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Replace a profile image.
///
/// POST /api/profile/profileimage
/// Content-Type: multipart/form-data
///
/// Form fields:
/// - email: identifier of the profile
/// - file: the image
pub async fn upload_profile_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let multipart = multipart.map_err(|rejection| {
        tracing::warn!(error = %rejection, "rejected non-multipart upload");
        ServiceError::validation("Invalid multipart body")
    })?;
    let form = read_form(multipart).await?;
    let asset = state.service.replace_image(form).await?;

    Ok(Json(UploadResponse {
        cloudinary_url: asset.secure_url,
    }))
}

/// Collects the `email` and `file` parts. Unknown parts are skipped; a part
/// named `file` only counts as an attachment when it carries a file name.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "failed to read multipart body");
        ServiceError::validation("Invalid multipart body")
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "email" if form.email.is_none() => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ServiceError::validation("Invalid email field"))?;
                form.email = Some(text);
            }
            "file" if form.file.is_none() && field.file_name().is_some() => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::warn!(error = %e, "failed to read upload data");
                    ServiceError::validation("Failed to read file data")
                })?;
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {
                tracing::debug!(field = %name, "ignoring multipart field");
            }
        }
    }

    Ok(form)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::ServiceError;

/// A persisted user profile, keyed by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub email: String,
    /// Secure URL of the active profile image.
    pub profile_image: Option<String>,
    /// Media host identifier recorded at upload time. Absent on records written
    /// before the identifier was stored.
    pub profile_image_public_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            profile_image: None,
            profile_image_public_id: None,
            updated_at: None,
        }
    }
}

/// Binary attachment taken from the multipart submission.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw form fields as they arrived, before validation.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub email: Option<String>,
    pub file: Option<FilePart>,
}

/// A validated upload submission.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub email: String,
    pub file: FilePart,
}

impl TryFrom<UploadForm> for UploadRequest {
    type Error = ServiceError;

    fn try_from(form: UploadForm) -> Result<Self, Self::Error> {
        // 原樣保留作為查詢鍵，只拒絕空白
        let email = form
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ServiceError::validation("Email required"))?;
        let file = form
            .file
            .ok_or_else(|| ServiceError::validation("No file uploaded"))?;

        Ok(Self { email, file })
    }
}

/// An object held by the media host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub secure_url: String,
    pub public_id: String,
}

/// Result of a best-effort delete against the media host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Failed(String),
}

/// One-time-passcode record. Rows past `expires_at` are eligible for removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub email: String,
    pub otp: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

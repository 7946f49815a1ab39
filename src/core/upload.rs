use std::sync::Arc;

use crate::core::data_uri::{self, FALLBACK_MEDIA_TYPE};
use crate::core::public_id::derive_public_id;
use crate::domain::model::{DeleteOutcome, ProfileRecord, StoredAsset, UploadForm, UploadRequest};
use crate::domain::ports::{MediaHost, ProfileRepository};
use crate::utils::error::{Result, ServiceError};

pub const DEFAULT_FOLDER: &str = "profile-images";

/// Identifier of the asset a record currently references, if any.
/// The stored identifier wins; legacy rows fall back to parsing the URL.
pub fn previous_public_id(record: &ProfileRecord) -> Option<String> {
    let url = record.profile_image.as_deref()?;
    record
        .profile_image_public_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| derive_public_id(url))
}

/// Replaces a profile's image: validate, encode, upload, look up the record,
/// best-effort delete the superseded asset, persist the new reference.
///
/// Each call runs the steps strictly in sequence. Concurrent calls for the same
/// email are not coordinated; whichever save lands last wins and the other
/// upload is left orphaned on the media host.
pub struct ProfileImageService {
    media: Arc<dyn MediaHost>,
    profiles: Arc<dyn ProfileRepository>,
    folder: String,
}

impl ProfileImageService {
    pub fn new(media: Arc<dyn MediaHost>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self::with_folder(media, profiles, DEFAULT_FOLDER)
    }

    pub fn with_folder(
        media: Arc<dyn MediaHost>,
        profiles: Arc<dyn ProfileRepository>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            media,
            profiles,
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub async fn replace_image(&self, form: UploadForm) -> Result<StoredAsset> {
        let request = UploadRequest::try_from(form)?;
        let email = request.email.as_str();

        let media_type = if request.file.content_type.is_empty() {
            FALLBACK_MEDIA_TYPE
        } else {
            request.file.content_type.as_str()
        };
        let data_uri = data_uri::encode(media_type, &request.file.bytes);
        tracing::debug!(
            email,
            media_type,
            size = request.file.bytes.len(),
            "uploading profile image"
        );

        let asset = self
            .media
            .upload(&data_uri, &self.folder)
            .await
            .map_err(|e| {
                tracing::error!(email, error = %e, "media host upload failed");
                e
            })?;
        tracing::info!(email, public_id = %asset.public_id, "profile image uploaded");

        let Some(record) = self.profiles.find_by_email(email).await? else {
            // upload already happened; the new asset stays on the host
            tracing::warn!(
                email,
                orphaned_public_id = %asset.public_id,
                "no profile for email, uploaded image left orphaned"
            );
            return Err(ServiceError::NotFoundError {
                identifier: email.to_string(),
            });
        };

        if record.profile_image.is_some() {
            self.remove_previous(email, previous_public_id(&record)).await;
        }

        self.profiles.save_image(email, &asset).await.map_err(|e| {
            tracing::error!(email, error = %e, "failed to persist profile image");
            e
        })?;
        tracing::info!(email, url = %asset.secure_url, "profile image replaced");

        Ok(asset)
    }

    async fn remove_previous(&self, email: &str, public_id: Option<String>) {
        let Some(public_id) = public_id else {
            tracing::warn!(email, "cannot derive identifier of previous image, skipping delete");
            return;
        };

        match self.media.destroy(&public_id).await {
            DeleteOutcome::Deleted => {
                tracing::debug!(email, %public_id, "previous image deleted")
            }
            DeleteOutcome::NotFound => {
                tracing::info!(email, %public_id, "previous image already gone")
            }
            DeleteOutcome::Failed(reason) => {
                tracing::warn!(email, %public_id, %reason, "failed to delete previous image")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProfileRepository;
    use crate::domain::model::FilePart;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeMediaHost {
        uploads: Mutex<Vec<(String, String)>>,
        destroyed: Mutex<Vec<String>>,
        counter: AtomicUsize,
        fail_upload: bool,
        destroy_outcome: Option<DeleteOutcome>,
    }

    #[async_trait]
    impl MediaHost for FakeMediaHost {
        async fn upload(&self, data_uri: &str, folder: &str) -> Result<StoredAsset> {
            self.uploads
                .lock()
                .await
                .push((data_uri.to_string(), folder.to_string()));
            if self.fail_upload {
                return Err(ServiceError::upstream("Invalid api_key"));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(StoredAsset {
                secure_url: format!("https://host/{}/new{}.png", folder, n),
                public_id: format!("{}/new{}", folder, n),
            })
        }

        async fn destroy(&self, public_id: &str) -> DeleteOutcome {
            self.destroyed.lock().await.push(public_id.to_string());
            self.destroy_outcome.clone().unwrap_or(DeleteOutcome::Deleted)
        }
    }

    fn form(email: Option<&str>, with_file: bool) -> UploadForm {
        UploadForm {
            email: email.map(str::to_string),
            file: with_file.then(|| FilePart {
                file_name: Some("me.png".to_string()),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
        }
    }

    fn service(
        media: &Arc<FakeMediaHost>,
        repo: &Arc<InMemoryProfileRepository>,
    ) -> ProfileImageService {
        ProfileImageService::new(media.clone(), repo.clone())
    }

    #[tokio::test]
    async fn test_missing_fields_make_no_external_calls() {
        let media = Arc::new(FakeMediaHost::default());
        let repo = Arc::new(InMemoryProfileRepository::new());
        let svc = service(&media, &repo);

        let err = svc.replace_image(form(None, true)).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        let err = svc
            .replace_image(form(Some("ada@example.com"), false))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        assert!(media.uploads.lock().await.is_empty());
        assert_eq!(repo.save_count().await, 0);
        assert_eq!(repo.lookup_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_email_orphans_upload() {
        let media = Arc::new(FakeMediaHost::default());
        let repo = Arc::new(InMemoryProfileRepository::new());
        let svc = service(&media, &repo);

        let err = svc
            .replace_image(form(Some("nobody@example.com"), true))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFoundError { .. }));
        assert_eq!(media.uploads.lock().await.len(), 1);
        assert!(media.destroyed.lock().await.is_empty());
        assert_eq!(repo.save_count().await, 0);
    }

    #[tokio::test]
    async fn test_first_image_skips_delete() {
        let media = Arc::new(FakeMediaHost::default());
        let repo = Arc::new(InMemoryProfileRepository::with_records([ProfileRecord::new(
            "ada@example.com",
        )]));
        let svc = service(&media, &repo);

        let asset = svc
            .replace_image(form(Some("ada@example.com"), true))
            .await
            .unwrap();

        assert_eq!(asset.secure_url, "https://host/profile-images/new0.png");
        let uploads = media.uploads.lock().await;
        assert_eq!(uploads[0].0, "data:image/png;base64,iVBORw==");
        assert_eq!(uploads[0].1, "profile-images");
        assert!(media.destroyed.lock().await.is_empty());

        let saved = repo.get("ada@example.com").await.unwrap();
        assert_eq!(saved.profile_image.as_deref(), Some(asset.secure_url.as_str()));
        assert_eq!(saved.profile_image_public_id.as_deref(), Some("profile-images/new0"));
    }

    #[tokio::test]
    async fn test_legacy_reference_is_deleted_by_derived_id() {
        let media = Arc::new(FakeMediaHost {
            destroy_outcome: Some(DeleteOutcome::Failed("500 from host".to_string())),
            ..Default::default()
        });
        let mut existing = ProfileRecord::new("ada@example.com");
        existing.profile_image = Some("https://host/profile-images/abc123.jpg".to_string());
        let repo = Arc::new(InMemoryProfileRepository::with_records([existing]));
        let svc = service(&media, &repo);

        let asset = svc
            .replace_image(form(Some("ada@example.com"), true))
            .await
            .unwrap();

        assert_eq!(*media.destroyed.lock().await, vec!["profile-images/abc123"]);
        let saved = repo.get("ada@example.com").await.unwrap();
        assert_eq!(saved.profile_image, Some(asset.secure_url));
    }

    #[tokio::test]
    async fn test_stored_identifier_is_used_for_delete() {
        let media = Arc::new(FakeMediaHost::default());
        let mut existing = ProfileRecord::new("ada@example.com");
        existing.profile_image = Some("https://cdn/v1/profile-images/old.v2.jpg".to_string());
        existing.profile_image_public_id = Some("profile-images/old.v2".to_string());
        let repo = Arc::new(InMemoryProfileRepository::with_records([existing]));

        service(&media, &repo)
            .replace_image(form(Some("ada@example.com"), true))
            .await
            .unwrap();

        assert_eq!(*media.destroyed.lock().await, vec!["profile-images/old.v2"]);
    }

    /// Finds every record but rejects every write.
    struct ReadOnlyProfiles;

    #[async_trait]
    impl ProfileRepository for ReadOnlyProfiles {
        async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>> {
            Ok(Some(ProfileRecord::new(email)))
        }

        async fn save_image(&self, _email: &str, _asset: &StoredAsset) -> Result<()> {
            Err(ServiceError::DatabaseError(sqlx::Error::RowNotFound))
        }
    }

    #[test]
    fn test_previous_public_id_prefers_stored_identifier() {
        let mut record = ProfileRecord::new("ada@example.com");
        assert_eq!(previous_public_id(&record), None);

        record.profile_image = Some("https://host/profile-images/abc123.jpg".to_string());
        assert_eq!(
            previous_public_id(&record).as_deref(),
            Some("profile-images/abc123")
        );

        record.profile_image_public_id = Some("profile-images/abc.123".to_string());
        assert_eq!(
            previous_public_id(&record).as_deref(),
            Some("profile-images/abc.123")
        );
    }

    #[tokio::test]
    async fn test_save_failure_is_generic_500() {
        let media = Arc::new(FakeMediaHost::default());
        let svc = ProfileImageService::new(media.clone(), Arc::new(ReadOnlyProfiles));

        let err = svc
            .replace_image(form(Some("ada@example.com"), true))
            .await
            .unwrap_err();

        assert_eq!(
            err.status_code(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(err.public_message(), "Upload failed");
        assert_eq!(media.uploads.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_commits_nothing() {
        let media = Arc::new(FakeMediaHost {
            fail_upload: true,
            ..Default::default()
        });
        let repo = Arc::new(InMemoryProfileRepository::with_records([ProfileRecord::new(
            "ada@example.com",
        )]));

        let err = service(&media, &repo)
            .replace_image(form(Some("ada@example.com"), true))
            .await
            .unwrap_err();

        assert_eq!(err.public_message(), "Upload failed");
        assert_eq!(repo.lookup_count().await, 0);
        assert_eq!(repo.save_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_content_type_falls_back() {
        let media = Arc::new(FakeMediaHost::default());
        let repo = Arc::new(InMemoryProfileRepository::with_records([ProfileRecord::new(
            "ada@example.com",
        )]));
        let mut upload = form(Some("ada@example.com"), true);
        if let Some(file) = upload.file.as_mut() {
            file.content_type.clear();
        }

        service(&media, &repo).replace_image(upload).await.unwrap();

        let uploads = media.uploads.lock().await;
        assert!(uploads[0].0.starts_with("data:application/octet-stream;base64,"));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_last_save_wins() {
        let media = Arc::new(FakeMediaHost::default());
        let repo = Arc::new(InMemoryProfileRepository::with_records([ProfileRecord::new(
            "ada@example.com",
        )]));
        let svc = Arc::new(service(&media, &repo));

        let a = tokio::spawn({
            let svc = svc.clone();
            async move { svc.replace_image(form(Some("ada@example.com"), true)).await }
        });
        let b = tokio::spawn({
            let svc = svc.clone();
            async move { svc.replace_image(form(Some("ada@example.com"), true)).await }
        });
        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();

        let saved = repo.get("ada@example.com").await.unwrap();
        let last = repo.last_saved_url().await.unwrap();
        assert_eq!(saved.profile_image.as_deref(), Some(last.as_str()));
        assert!(last == first.secure_url || last == second.secure_url);
        assert_eq!(repo.save_count().await, 2);
    }
}

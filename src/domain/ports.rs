use crate::domain::model::{DeleteOutcome, OtpRecord, ProfileRecord, StoredAsset};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// External media host (object storage + CDN).
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Store a data-URI payload under `folder` and return its durable reference.
    async fn upload(&self, data_uri: &str, folder: &str) -> Result<StoredAsset>;

    /// Best-effort delete. Never fails; the outcome is for logging only.
    async fn destroy(&self, public_id: &str) -> DeleteOutcome;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>>;

    /// Overwrite the image reference of an existing record. Last write wins.
    async fn save_image(&self, email: &str, asset: &StoredAsset) -> Result<()>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    async fn insert(&self, record: &OtpRecord) -> Result<()>;

    /// Most recent unexpired passcode for `email`.
    async fn find_active(&self, email: &str, now: DateTime<Utc>) -> Result<Option<OtpRecord>>;

    /// Remove every record whose expiry is at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

//! In-process repositories, selected with `[database] backend = "memory"`.
//! Contents are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::model::{OtpRecord, ProfileRecord, StoredAsset};
use crate::domain::ports::{OtpRepository, ProfileRepository};
use crate::utils::error::{Result, ServiceError};

#[derive(Default)]
struct ProfileState {
    records: HashMap<String, ProfileRecord>,
    lookups: usize,
    saves: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryProfileRepository {
    state: Mutex<ProfileState>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.email.clone(), r))
            .collect();
        Self {
            state: Mutex::new(ProfileState {
                records,
                ..Default::default()
            }),
        }
    }

    pub async fn insert(&self, record: ProfileRecord) {
        let mut state = self.state.lock().await;
        state.records.insert(record.email.clone(), record);
    }

    pub async fn get(&self, email: &str) -> Option<ProfileRecord> {
        self.state.lock().await.records.get(email).cloned()
    }

    pub async fn lookup_count(&self) -> usize {
        self.state.lock().await.lookups
    }

    pub async fn save_count(&self) -> usize {
        self.state.lock().await.saves.len()
    }

    /// URL written by the most recent successful save.
    pub async fn last_saved_url(&self) -> Option<String> {
        self.state.lock().await.saves.last().cloned()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>> {
        let mut state = self.state.lock().await;
        state.lookups += 1;
        Ok(state.records.get(email).cloned())
    }

    async fn save_image(&self, email: &str, asset: &StoredAsset) -> Result<()> {
        let mut state = self.state.lock().await;
        let record = state
            .records
            .get_mut(email)
            .ok_or(ServiceError::DatabaseError(sqlx::Error::RowNotFound))?;
        record.profile_image = Some(asset.secure_url.clone());
        record.profile_image_public_id = Some(asset.public_id.clone());
        record.updated_at = Some(Utc::now());
        state.saves.push(asset.secure_url.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOtpRepository {
    records: Mutex<Vec<OtpRecord>>,
}

impl InMemoryOtpRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    async fn insert(&self, record: &OtpRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn find_active(&self, email: &str, now: DateTime<Utc>) -> Result<Option<OtpRecord>> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.email == email && !r.is_expired(now))
            .cloned())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| !r.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::model::{OtpRecord, ProfileRecord, StoredAsset};
use crate::domain::ports::{OtpRepository, ProfileRepository};
use crate::utils::error::{Result, ServiceError};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the shared pool and brings the schema up to date.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections())
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds()))
        .connect(&config.url)
        .await?;

    MIGRATOR.run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(pool)
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    email: String,
    profile_image: Option<String>,
    profile_image_public_id: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            email: row.email,
            profile_image: row.profile_image,
            profile_image_public_id: row.profile_image_public_id,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT email, profile_image, profile_image_public_id, updated_at
            FROM profiles
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProfileRecord::from))
    }

    async fn save_image(&self, email: &str, asset: &StoredAsset) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET profile_image = $2, profile_image_public_id = $3, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&asset.secure_url)
        .bind(&asset.public_id)
        .execute(&self.pool)
        .await?;

        // 查詢後列被刪除，不是 404
        if result.rows_affected() == 0 {
            tracing::error!(email = %email, "profile row vanished before save");
            return Err(ServiceError::DatabaseError(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    email: String,
    otp: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PgOtpRepository {
    pool: PgPool,
}

impl PgOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OtpRepository for PgOtpRepository {
    async fn insert(&self, record: &OtpRecord) -> Result<()> {
        sqlx::query("INSERT INTO otps (email, otp, expires_at) VALUES ($1, $2, $3)")
            .bind(&record.email)
            .bind(&record.otp)
            .bind(record.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_active(&self, email: &str, now: DateTime<Utc>) -> Result<Option<OtpRecord>> {
        let row = sqlx::query_as::<_, OtpRow>(
            r#"
            SELECT email, otp, expires_at
            FROM otps
            WHERE email = $1 AND expires_at > $2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| OtpRecord {
            email: r.email,
            otp: r.otp,
            expires_at: r.expires_at,
        }))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM otps WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

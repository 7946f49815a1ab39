use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::domain::ports::OtpRepository;
use crate::utils::error::Result;

/// Periodically removes one-time passcodes whose expiry has passed.
///
/// Readers already ignore expired rows, so the sweep only reclaims storage and
/// a missed tick has no visible effect.
pub struct OtpSweeper {
    repo: Arc<dyn OtpRepository>,
    period: Duration,
}

impl OtpSweeper {
    pub fn new(repo: Arc<dyn OtpRepository>, period: Duration) -> Self {
        Self { repo, period }
    }

    pub async fn sweep_once(&self) -> Result<u64> {
        let removed = self.repo.purge_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "purged expired one-time passcodes");
        }
        Ok(removed)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep_once().await {
                    tracing::warn!(error = %e, "otp sweep failed, retrying next tick");
                }
            }
        })
    }
}

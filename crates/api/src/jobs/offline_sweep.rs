//! Offline detection background job.
//!
//! Devices only reach the server through their own poll cadence, so going
//! offline is observed by absence: an online device whose last_seen falls
//! behind the threshold is flipped to offline, with a deduplicated
//! DEVICE_OFFLINE alert.

use sqlx::PgPool;
use tracing::info;

use domain::models::alert::{AlertSeverity, AlertType};
use domain::models::device::Device;
use persistence::repositories::{AlertRepository, DeviceRepository};

use super::scheduler::{Job, JobFrequency};

/// Background job that marks silent devices offline.
pub struct OfflineSweepJob {
    pool: PgPool,
    threshold_secs: i64,
}

impl OfflineSweepJob {
    /// Create a new sweep job.
    ///
    /// `threshold_secs` should cover a few missed ping intervals so one
    /// dropped request does not flap the device offline.
    pub fn new(pool: PgPool, threshold_secs: i64) -> Self {
        Self {
            pool,
            threshold_secs,
        }
    }

    async fn sweep(&self) -> Result<usize, sqlx::Error> {
        let device_repo = DeviceRepository::new(self.pool.clone());
        let alert_repo = AlertRepository::new(self.pool.clone());

        let flipped = device_repo.sweep_offline(self.threshold_secs).await?;
        let count = flipped.len();

        for entity in flipped {
            let device: Device = entity.into();

            if !alert_repo
                .has_open_device_alert(device.id, AlertType::DeviceOffline)
                .await?
            {
                alert_repo
                    .insert_device_alert(
                        device.id,
                        AlertType::DeviceOffline,
                        AlertSeverity::Medium,
                        &format!("Device offline: {}", device.asset_tag),
                        &format!(
                            "Device {} has not pinged for over {} seconds",
                            device.asset_tag, self.threshold_secs
                        ),
                    )
                    .await?;
            }
        }

        Ok(count)
    }
}

#[async_trait::async_trait]
impl Job for OfflineSweepJob {
    fn name(&self) -> &'static str {
        "offline_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(1)
    }

    async fn execute(&self) -> Result<(), String> {
        let flipped = self
            .sweep()
            .await
            .map_err(|e| format!("Offline sweep failed: {}", e))?;

        if flipped > 0 {
            info!(devices = flipped, "Devices marked offline");
        }

        Ok(())
    }
}

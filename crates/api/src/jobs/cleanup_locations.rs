//! Location history retention job.

use sqlx::PgPool;
use tracing::info;

use persistence::repositories::LocationRepository;

use super::scheduler::{Job, JobFrequency};

/// Background job to clean up location samples past the retention window.
pub struct CleanupLocationsJob {
    pool: PgPool,
    retention_days: u32,
    batch_size: i64,
}

impl CleanupLocationsJob {
    /// Create a new cleanup job.
    pub fn new(pool: PgPool, retention_days: u32, batch_size: i64) -> Self {
        Self {
            pool,
            retention_days,
            batch_size,
        }
    }
}

#[async_trait::async_trait]
impl Job for CleanupLocationsJob {
    fn name(&self) -> &'static str {
        "cleanup_locations"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let location_repo = LocationRepository::new(self.pool.clone());

        let deleted = location_repo
            .delete_older_than(self.retention_days, self.batch_size)
            .await
            .map_err(|e| format!("Failed to delete old locations: {}", e))?;

        if deleted > 0 {
            info!(
                deleted,
                retention_days = self.retention_days,
                "Old location samples deleted"
            );
        }

        Ok(())
    }
}

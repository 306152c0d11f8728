//! Location history repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::LocationSampleEntity;
use crate::metrics::QueryTimer;

const LOCATION_COLUMNS: &str = "id, device_id, latitude, longitude, accuracy, altitude, \
     source, ip_address, network_name, battery_level, is_charging, captured_at, recorded_at";

/// Input data for inserting a location sample.
#[derive(Debug, Clone)]
pub struct LocationInput {
    pub device_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub source: String,
    pub ip_address: Option<String>,
    pub network_name: Option<String>,
    pub battery_level: Option<f64>,
    pub is_charging: Option<bool>,
    pub captured_at: DateTime<Utc>,
}

/// Repository for location history operations.
///
/// The table is append-only: rows are inserted by pings and removed by the
/// retention job, never updated.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    /// Creates a new LocationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one sample within the caller's transaction.
    pub async fn insert_sample(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: &LocationInput,
    ) -> Result<LocationSampleEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_location_sample");

        let result = sqlx::query_as::<_, LocationSampleEntity>(&format!(
            r#"
            INSERT INTO location_history (
                device_id, latitude, longitude, accuracy, altitude, source,
                ip_address, network_name, battery_level, is_charging, captured_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {LOCATION_COLUMNS}
            "#,
        ))
        .bind(input.device_id)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.accuracy)
        .bind(input.altitude)
        .bind(&input.source)
        .bind(input.ip_address.as_deref())
        .bind(input.network_name.as_deref())
        .bind(input.battery_level)
        .bind(input.is_charging)
        .bind(input.captured_at)
        .fetch_one(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Get recent samples for a device, newest first.
    pub async fn history_for_device(
        &self,
        device_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LocationSampleEntity>, sqlx::Error> {
        sqlx::query_as::<_, LocationSampleEntity>(&format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM location_history
            WHERE device_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        ))
        .bind(device_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Delete samples older than the retention window, in batches to avoid
    /// long locks. Returns the total number of deleted rows.
    pub async fn delete_older_than(
        &self,
        retention_days: u32,
        batch_size: i64,
    ) -> Result<u64, sqlx::Error> {
        let mut total_deleted: u64 = 0;

        loop {
            let result = sqlx::query(
                r#"
                WITH to_delete AS (
                    SELECT id FROM location_history
                    WHERE recorded_at < NOW() - ($1 || ' days')::INTERVAL
                    LIMIT $2
                )
                DELETE FROM location_history
                WHERE id IN (SELECT id FROM to_delete)
                "#,
            )
            .bind(retention_days as i32)
            .bind(batch_size)
            .execute(&self.pool)
            .await?;

            let deleted = result.rows_affected();
            total_deleted += deleted;

            if deleted < batch_size as u64 {
                break;
            }

            tokio::task::yield_now().await;
        }

        Ok(total_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_input_creation() {
        let input = LocationInput {
            device_id: Uuid::new_v4(),
            latitude: 48.1486,
            longitude: 17.1077,
            accuracy: Some(10.0),
            altitude: None,
            source: "GPS".to_string(),
            ip_address: None,
            network_name: Some("corp-wifi".to_string()),
            battery_level: Some(80.0),
            is_charging: Some(false),
            captured_at: Utc::now(),
        };

        assert_eq!(input.source, "GPS");
        assert!(input.altitude.is_none());
    }

    #[test]
    fn test_location_columns_cover_entity() {
        for field in [
            "device_id",
            "latitude",
            "longitude",
            "accuracy",
            "altitude",
            "source",
            "battery_level",
            "is_charging",
            "captured_at",
            "recorded_at",
        ] {
            assert!(LOCATION_COLUMNS.contains(field), "missing column {}", field);
        }
    }
}

//! Alert repository for database operations.

use std::collections::HashSet;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use domain::models::alert::{AlertSeverity, AlertType};
use domain::services::geofence::{AlertDraft, OpenAlertKey};

use crate::entities::AlertEntity;
use crate::metrics::QueryTimer;

const ALERT_COLUMNS: &str = "id, device_id, alert_type, severity, title, message, \
     latitude, longitude, geofence_id, is_acknowledged, acknowledged_by, acknowledged_at, \
     is_resolved, resolved_at, notes, created_at";

/// Repository for alert operations.
#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    /// Creates a new AlertRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Keys of unresolved geofence alerts for a device, loaded within the
    /// ping transaction so the dedup check-then-insert cannot race another
    /// ping from the same device.
    pub async fn open_geofence_keys(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        device_id: Uuid,
    ) -> Result<HashSet<OpenAlertKey>, sqlx::Error> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT geofence_id, alert_type
            FROM alerts
            WHERE device_id = $1
              AND is_resolved = false
              AND geofence_id IS NOT NULL
            "#,
        )
        .bind(device_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(geofence_id, alert_type)| {
                match AlertType::parse(&alert_type) {
                    Some(t) => Some((geofence_id, t)),
                    None => {
                        warn!(%geofence_id, alert_type, "Unknown alert type in open alerts");
                        None
                    }
                }
            })
            .collect())
    }

    /// Insert a geofence alert draft within the caller's transaction.
    pub async fn insert_draft(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        device_id: Uuid,
        draft: &AlertDraft,
    ) -> Result<AlertEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_alert_draft");

        let result = sqlx::query_as::<_, AlertEntity>(&format!(
            r#"
            INSERT INTO alerts (
                device_id, alert_type, severity, title, message,
                latitude, longitude, geofence_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ALERT_COLUMNS}
            "#,
        ))
        .bind(device_id)
        .bind(draft.alert_type.as_str())
        .bind(draft.severity.as_str())
        .bind(&draft.title)
        .bind(&draft.message)
        .bind(draft.latitude)
        .bind(draft.longitude)
        .bind(draft.geofence_id)
        .fetch_one(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Whether the device has an unresolved alert of this type without a
    /// geofence reference (lock/wipe/offline alerts).
    pub async fn has_open_device_alert(
        &self,
        device_id: Uuid,
        alert_type: AlertType,
    ) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM alerts
                WHERE device_id = $1
                  AND alert_type = $2
                  AND geofence_id IS NULL
                  AND is_resolved = false
            )
            "#,
        )
        .bind(device_id)
        .bind(alert_type.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }

    /// Insert a device-level alert (no geofence reference).
    pub async fn insert_device_alert(
        &self,
        device_id: Uuid,
        alert_type: AlertType,
        severity: AlertSeverity,
        title: &str,
        message: &str,
    ) -> Result<AlertEntity, sqlx::Error> {
        sqlx::query_as::<_, AlertEntity>(&format!(
            r#"
            INSERT INTO alerts (device_id, alert_type, severity, title, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ALERT_COLUMNS}
            "#,
        ))
        .bind(device_id)
        .bind(alert_type.as_str())
        .bind(severity.as_str())
        .bind(title)
        .bind(message)
        .fetch_one(&self.pool)
        .await
    }

    /// Get an alert by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AlertEntity>, sqlx::Error> {
        sqlx::query_as::<_, AlertEntity>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// List alerts, newest first, optionally restricted to unresolved ones.
    pub async fn list(
        &self,
        unresolved_only: bool,
        limit: i64,
    ) -> Result<Vec<AlertEntity>, sqlx::Error> {
        sqlx::query_as::<_, AlertEntity>(&format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM alerts
            WHERE (NOT $1) OR is_resolved = false
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        ))
        .bind(unresolved_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark an alert acknowledged by an operator.
    pub async fn acknowledge(
        &self,
        id: Uuid,
        acknowledged_by: Uuid,
    ) -> Result<Option<AlertEntity>, sqlx::Error> {
        sqlx::query_as::<_, AlertEntity>(&format!(
            r#"
            UPDATE alerts
            SET is_acknowledged = true, acknowledged_by = $2, acknowledged_at = NOW()
            WHERE id = $1
            RETURNING {ALERT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(acknowledged_by)
        .fetch_optional(&self.pool)
        .await
    }

    /// Resolve an alert. Resolution re-arms deduplication: the next
    /// violation of the same (device, zone, type) produces a fresh alert.
    pub async fn resolve(
        &self,
        id: Uuid,
        notes: Option<&str>,
    ) -> Result<Option<AlertEntity>, sqlx::Error> {
        sqlx::query_as::<_, AlertEntity>(&format!(
            r#"
            UPDATE alerts
            SET is_resolved = true, resolved_at = NOW(), notes = COALESCE($2, notes)
            WHERE id = $1
            RETURNING {ALERT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_columns_cover_entity() {
        for field in [
            "device_id",
            "alert_type",
            "severity",
            "title",
            "geofence_id",
            "is_acknowledged",
            "acknowledged_by",
            "is_resolved",
            "resolved_at",
            "notes",
        ] {
            assert!(ALERT_COLUMNS.contains(field), "missing column {}", field);
        }
    }
}

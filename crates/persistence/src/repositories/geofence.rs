//! Geofence repository for database operations.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use domain::models::geofence::GeofenceShape;

use crate::entities::GeofenceEntity;

const GEOFENCE_COLUMNS: &str = "id, name, description, fence_type, center_latitude, \
     center_longitude, radius_meters, polygon_vertices, is_active, alert_on_exit, \
     alert_on_enter, department, created_by, created_at, updated_at";

/// Repository for geofence operations.
#[derive(Debug, Clone)]
pub struct GeofenceRepository {
    pool: PgPool,
}

impl GeofenceRepository {
    /// Creates a new GeofenceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a geofence. The shape must already be validated.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        shape: &GeofenceShape,
        alert_on_exit: bool,
        alert_on_enter: bool,
        is_active: bool,
        department: Option<&str>,
        created_by: Option<Uuid>,
    ) -> Result<GeofenceEntity, sqlx::Error> {
        let (center_latitude, center_longitude, radius_meters, polygon_vertices) = match shape {
            GeofenceShape::Circle {
                center_latitude,
                center_longitude,
                radius_meters,
            } => (
                Some(*center_latitude),
                Some(*center_longitude),
                Some(*radius_meters),
                None,
            ),
            GeofenceShape::Polygon { vertices } => (
                None,
                None,
                None,
                Some(serde_json::to_value(vertices).unwrap_or_default()),
            ),
        };

        sqlx::query_as::<_, GeofenceEntity>(&format!(
            r#"
            INSERT INTO geofences (
                name, description, fence_type, center_latitude, center_longitude,
                radius_meters, polygon_vertices, is_active, alert_on_exit,
                alert_on_enter, department, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {GEOFENCE_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(description)
        .bind(shape.kind_str())
        .bind(center_latitude)
        .bind(center_longitude)
        .bind(radius_meters)
        .bind(polygon_vertices)
        .bind(is_active)
        .bind(alert_on_exit)
        .bind(alert_on_enter)
        .bind(department)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a geofence by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GeofenceEntity>, sqlx::Error> {
        sqlx::query_as::<_, GeofenceEntity>(&format!(
            "SELECT {GEOFENCE_COLUMNS} FROM geofences WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// List geofences, newest first.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<GeofenceEntity>, sqlx::Error> {
        sqlx::query_as::<_, GeofenceEntity>(&format!(
            r#"
            SELECT {GEOFENCE_COLUMNS}
            FROM geofences
            WHERE $1 OR is_active = true
            ORDER BY created_at DESC
            "#,
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
    }

    /// Zones applicable to a device, loaded within the ping transaction:
    /// active, and either unscoped or matching the device's department.
    ///
    /// The scope filter runs here, before evaluation, so the evaluator only
    /// ever sees its explicit zone set.
    pub async fn find_applicable(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        department: Option<&str>,
    ) -> Result<Vec<GeofenceEntity>, sqlx::Error> {
        sqlx::query_as::<_, GeofenceEntity>(&format!(
            r#"
            SELECT {GEOFENCE_COLUMNS}
            FROM geofences
            WHERE is_active = true
              AND (department IS NULL OR department = $1)
            ORDER BY created_at ASC
            "#,
        ))
        .bind(department)
        .fetch_all(&mut **tx)
        .await
    }

    /// Partial update of non-geometry fields.
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        alert_on_exit: Option<bool>,
        alert_on_enter: Option<bool>,
        is_active: Option<bool>,
        department: Option<&str>,
    ) -> Result<Option<GeofenceEntity>, sqlx::Error> {
        sqlx::query_as::<_, GeofenceEntity>(&format!(
            r#"
            UPDATE geofences
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                alert_on_exit = COALESCE($4, alert_on_exit),
                alert_on_enter = COALESCE($5, alert_on_enter),
                is_active = COALESCE($6, is_active),
                department = COALESCE($7, department),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GEOFENCE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(alert_on_exit)
        .bind(alert_on_enter)
        .bind(is_active)
        .bind(department)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a geofence. Alerts that reference it keep their history via
    /// ON DELETE SET NULL.
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM geofences WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

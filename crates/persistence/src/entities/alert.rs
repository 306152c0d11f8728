//! Alert entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::alert::{Alert, AlertSeverity, AlertType};

/// Database row mapping for the alerts table.
#[derive(Debug, Clone, FromRow)]
pub struct AlertEntity {
    pub id: Uuid,
    pub device_id: Uuid,
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub message: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geofence_id: Option<Uuid>,
    pub is_acknowledged: bool,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AlertEntity> for Alert {
    fn from(e: AlertEntity) -> Self {
        Self {
            id: e.id,
            device_id: e.device_id,
            alert_type: AlertType::parse(&e.alert_type).unwrap_or(AlertType::DeviceOffline),
            severity: AlertSeverity::parse(&e.severity).unwrap_or(AlertSeverity::Medium),
            title: e.title,
            message: e.message,
            latitude: e.latitude,
            longitude: e.longitude,
            geofence_id: e.geofence_id,
            is_acknowledged: e.is_acknowledged,
            acknowledged_by: e.acknowledged_by,
            acknowledged_at: e.acknowledged_at,
            is_resolved: e.is_resolved,
            resolved_at: e.resolved_at,
            notes: e.notes,
            created_at: e.created_at,
        }
    }
}

//! Geofence entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

use domain::models::geofence::{GeoPoint, Geofence, GeofenceShape};

/// Database row mapping for the geofences table.
///
/// The shape is stored denormalized: a `fence_type` tag plus nullable
/// circle columns and a nullable JSONB vertex array. Creation-time
/// validation guarantees the columns matching the tag are populated.
#[derive(Debug, Clone, FromRow)]
pub struct GeofenceEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub fence_type: String,
    pub center_latitude: Option<f64>,
    pub center_longitude: Option<f64>,
    pub radius_meters: Option<f64>,
    pub polygon_vertices: Option<serde_json::Value>,
    pub is_active: bool,
    pub alert_on_exit: bool,
    pub alert_on_enter: bool,
    pub department: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GeofenceEntity {
    /// Converts the row into the domain model.
    ///
    /// Returns `None` for rows whose shape columns do not match the tag;
    /// such rows indicate a bug in creation validation and are logged.
    pub fn into_model(self) -> Option<Geofence> {
        let shape = match self.fence_type.as_str() {
            "circle" => match (self.center_latitude, self.center_longitude, self.radius_meters) {
                (Some(center_latitude), Some(center_longitude), Some(radius_meters)) => {
                    Some(GeofenceShape::Circle {
                        center_latitude,
                        center_longitude,
                        radius_meters,
                    })
                }
                _ => None,
            },
            "polygon" => self
                .polygon_vertices
                .and_then(|v| serde_json::from_value::<Vec<GeoPoint>>(v).ok())
                .filter(|vertices| vertices.len() >= 3)
                .map(|vertices| GeofenceShape::Polygon { vertices }),
            _ => None,
        };

        let Some(shape) = shape else {
            warn!(geofence_id = %self.id, fence_type = %self.fence_type,
                "Malformed geofence row, skipping");
            return None;
        };

        Some(Geofence {
            id: self.id,
            name: self.name,
            description: self.description,
            shape,
            is_active: self.is_active,
            alert_on_exit: self.alert_on_exit,
            alert_on_enter: self.alert_on_enter,
            department: self.department,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//! Geofence domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A single polygon vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Geometry of a geofence.
///
/// Modelled as a closed tagged variant so new shapes force every call
/// site (evaluation, validation, persistence mapping) to be updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fenceType", rename_all = "camelCase")]
pub enum GeofenceShape {
    #[serde(rename_all = "camelCase")]
    Circle {
        center_latitude: f64,
        center_longitude: f64,
        radius_meters: f64,
    },
    #[serde(rename_all = "camelCase")]
    Polygon { vertices: Vec<GeoPoint> },
}

impl GeofenceShape {
    /// Database string tag for the shape kind.
    pub fn kind_str(&self) -> &'static str {
        match self {
            GeofenceShape::Circle { .. } => "circle",
            GeofenceShape::Polygon { .. } => "polygon",
        }
    }

    /// Validates the geometry definition.
    ///
    /// Circles require an in-range center and a positive radius; polygons
    /// require at least three in-range vertices. Degenerate definitions are
    /// rejected here so the evaluator never sees them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            GeofenceShape::Circle {
                center_latitude,
                center_longitude,
                radius_meters,
            } => {
                shared::validation::validate_latitude(*center_latitude)?;
                shared::validation::validate_longitude(*center_longitude)?;
                if *radius_meters <= 0.0 {
                    let mut err = ValidationError::new("radius_range");
                    err.message = Some("Radius must be positive".into());
                    return Err(err);
                }
                Ok(())
            }
            GeofenceShape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    let mut err = ValidationError::new("polygon_vertices");
                    err.message = Some("Polygon requires at least 3 vertices".into());
                    return Err(err);
                }
                for v in vertices {
                    shared::validation::validate_latitude(v.latitude)?;
                    shared::validation::validate_longitude(v.longitude)?;
                }
                Ok(())
            }
        }
    }
}

/// An allowed/forbidden zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geofence {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub shape: GeofenceShape,
    pub is_active: bool,
    pub alert_on_exit: bool,
    pub alert_on_enter: bool,
    /// Scope: `None` applies the zone to all devices.
    pub department: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_alert_on_exit() -> bool {
    true
}

fn default_is_active() -> bool {
    true
}

/// Request payload for creating a geofence.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGeofenceRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[serde(flatten)]
    pub shape: GeofenceShape,

    #[serde(default = "default_alert_on_exit")]
    pub alert_on_exit: bool,

    #[serde(default)]
    pub alert_on_enter: bool,

    #[serde(default = "default_is_active")]
    pub is_active: bool,

    pub department: Option<String>,
}

/// Request payload for updating a geofence.
///
/// Geometry is immutable after creation; replace the zone to change it.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGeofenceRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,
    pub alert_on_exit: Option<bool>,
    pub alert_on_enter: Option<bool>,
    pub is_active: Option<bool>,
    pub department: Option<String>,
}

/// Response payload for geofence operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub shape: GeofenceShape,
    pub is_active: bool,
    pub alert_on_exit: bool,
    pub alert_on_enter: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Geofence> for GeofenceResponse {
    fn from(g: Geofence) -> Self {
        Self {
            id: g.id,
            name: g.name,
            description: g.description,
            shape: g.shape,
            is_active: g.is_active,
            alert_on_exit: g.alert_on_exit,
            alert_on_enter: g.alert_on_enter,
            department: g.department,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

/// Response for listing geofences.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGeofencesResponse {
    pub geofences: Vec<GeofenceResponse>,
    pub total: usize,
}

/// Request payload for the point-in-geofence utility check.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckPointRequest {
    pub geofence_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

/// Response payload for the point-in-geofence utility check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPointResponse {
    pub geofence_id: Uuid,
    pub is_inside: bool,
    /// Distance from the circle center; `None` for polygon zones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

//! Location sample entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::location::{LocationSample, LocationSource};

/// Database row mapping for the location_history table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationSampleEntity {
    pub id: Uuid,
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
    pub recorded_at: DateTime<Utc>,
}

impl From<LocationSampleEntity> for LocationSample {
    fn from(e: LocationSampleEntity) -> Self {
        Self {
            id: e.id,
            device_id: e.device_id,
            latitude: e.latitude,
            longitude: e.longitude,
            accuracy: e.accuracy,
            altitude: e.altitude,
            source: LocationSource::parse(&e.source).unwrap_or_default(),
            ip_address: e.ip_address,
            network_name: e.network_name,
            battery_level: e.battery_level,
            is_charging: e.is_charging,
            captured_at: e.captured_at,
            recorded_at: e.recorded_at,
        }
    }
}

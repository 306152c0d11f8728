//! Location sample domain model.
//!
//! Location samples are append-only: once recorded they are never updated,
//! and retention is handled by a background cleanup job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source of a reported coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    #[serde(rename = "GPS")]
    Gps,
    #[serde(rename = "WiFi")]
    Wifi,
    #[serde(rename = "IP")]
    Ip,
    #[serde(rename = "HYBRID")]
    Hybrid,
}

impl LocationSource {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Gps => "GPS",
            LocationSource::Wifi => "WiFi",
            LocationSource::Ip => "IP",
            LocationSource::Hybrid => "HYBRID",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GPS" => Some(LocationSource::Gps),
            "WiFi" => Some(LocationSource::Wifi),
            "IP" => Some(LocationSource::Ip),
            "HYBRID" => Some(LocationSource::Hybrid),
            _ => None,
        }
    }
}

impl Default for LocationSource {
    fn default() -> Self {
        LocationSource::Ip
    }
}

/// One reported position for a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub id: Uuid,
    pub device_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub source: LocationSource,
    pub ip_address: Option<String>,
    pub network_name: Option<String>,
    pub battery_level: Option<f64>,
    pub is_charging: Option<bool>,
    /// When the agent captured the coordinate.
    pub captured_at: DateTime<Utc>,
    /// When the server received it.
    pub recorded_at: DateTime<Utc>,
}

/// Response payload for a single location history entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSampleResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    pub source: LocationSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<f64>,
    pub captured_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl From<LocationSample> for LocationSampleResponse {
    fn from(s: LocationSample) -> Self {
        Self {
            id: s.id,
            device_id: s.device_id,
            latitude: s.latitude,
            longitude: s.longitude,
            accuracy: s.accuracy,
            altitude: s.altitude,
            source: s.source,
            battery_level: s.battery_level,
            captured_at: s.captured_at,
            recorded_at: s.recorded_at,
        }
    }
}

/// Response for listing location history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationHistoryResponse {
    pub locations: Vec<LocationSampleResponse>,
    pub total: usize,
}

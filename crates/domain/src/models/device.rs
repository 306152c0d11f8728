//! Device domain model and agent protocol payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::location::LocationSource;

/// Live status of a tracked device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Locked,
    Wiped,
}

impl DeviceStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Locked => "locked",
            DeviceStatus::Wiped => "wiped",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(DeviceStatus::Online),
            "offline" => Some(DeviceStatus::Offline),
            "locked" => Some(DeviceStatus::Locked),
            "wiped" => Some(DeviceStatus::Wiped),
            _ => None,
        }
    }
}

/// Hardware class of a tracked device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Laptop,
    Desktop,
    Tablet,
    Mobile,
    Workstation,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Laptop => "laptop",
            DeviceType::Desktop => "desktop",
            DeviceType::Tablet => "tablet",
            DeviceType::Mobile => "mobile",
            DeviceType::Workstation => "workstation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "laptop" => Some(DeviceType::Laptop),
            "desktop" => Some(DeviceType::Desktop),
            "tablet" => Some(DeviceType::Tablet),
            "mobile" => Some(DeviceType::Mobile),
            "workstation" => Some(DeviceType::Workstation),
            _ => None,
        }
    }
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Laptop
    }
}

/// A tracked asset.
///
/// Invariants:
/// - `status == Locked` implies `is_locked == true`
/// - `Wiped` is terminal: no further command delivery occurs once set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: Uuid,
    pub serial_number: String,
    pub asset_tag: String,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub mac_address: Option<String>,
    pub employee_name: Option<String>,
    pub department: Option<String>,
    pub status: DeviceStatus,
    pub is_registered: bool,
    pub agent_installed: bool,
    pub agent_version: Option<String>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_location_accuracy: Option<f64>,
    pub last_location_source: Option<LocationSource>,
    pub last_ip_address: Option<String>,
    pub network_name: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub lock_reason: Option<String>,
    pub is_wiped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub registered_at: Option<DateTime<Utc>>,
}

/// Request payload for agent registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAgentRequest {
    #[validate(length(min = 1, max = 100, message = "Serial number must be 1-100 characters"))]
    pub serial_number: String,

    #[validate(length(min = 1, max = 50, message = "Asset tag must be 1-50 characters"))]
    pub asset_tag: Option<String>,

    pub device_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub mac_address: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Agent version must be 1-20 characters"))]
    pub agent_version: String,
}

/// Request payload for an agent status/location ping.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AgentPingRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: Option<f64>,

    pub altitude: Option<f64>,

    #[serde(default)]
    pub location_source: LocationSource,

    pub ip_address: Option<String>,
    pub network_name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_battery_level"))]
    pub battery_level: Option<f64>,

    pub is_charging: Option<bool>,

    #[validate(length(min = 1, max = 20, message = "Agent version must be 1-20 characters"))]
    pub agent_version: String,
}

impl AgentPingRequest {
    /// Returns the reported coordinate when both components are present.
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Response payload for successful registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub device_id: Uuid,
    pub agent_token: String,
    pub message: String,
}

/// Response payload for the agent status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusResponse {
    pub device_id: Uuid,
    pub asset_tag: String,
    pub status: DeviceStatus,
    pub is_locked: bool,
    pub is_wiped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<String>,
    pub server_time: DateTime<Utc>,
}

/// Request payload for locking a device (operator action).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LockDeviceRequest {
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: String,
}

/// Request payload for wiping a device (operator action).
///
/// Wipe is irreversible; `confirm` must be explicitly set.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WipeDeviceRequest {
    #[validate(length(min = 1, max = 500, message = "Reason must be 1-500 characters"))]
    pub reason: String,

    #[serde(default)]
    pub confirm: bool,
}

/// Response payload for device detail views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub id: Uuid,
    pub serial_number: String,
    pub asset_tag: String,
    pub device_name: Option<String>,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub is_registered: bool,
    pub agent_installed: bool,
    pub agent_version: Option<String>,
    pub department: Option<String>,
    pub employee_name: Option<String>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_location_accuracy: Option<f64>,
    pub last_location_source: Option<LocationSource>,
    pub last_ip_address: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub is_wiped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Device> for DeviceResponse {
    fn from(d: Device) -> Self {
        Self {
            id: d.id,
            serial_number: d.serial_number,
            asset_tag: d.asset_tag,
            device_name: d.device_name,
            device_type: d.device_type,
            status: d.status,
            is_registered: d.is_registered,
            agent_installed: d.agent_installed,
            agent_version: d.agent_version,
            department: d.department,
            employee_name: d.employee_name,
            last_latitude: d.last_latitude,
            last_longitude: d.last_longitude,
            last_location_accuracy: d.last_location_accuracy,
            last_location_source: d.last_location_source,
            last_ip_address: d.last_ip_address,
            last_seen: d.last_seen,
            is_locked: d.is_locked,
            is_wiped: d.is_wiped,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// Response for listing devices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceResponse>,
    pub total: usize,
    pub online_count: usize,
}

//! Device entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::device::{Device, DeviceStatus, DeviceType};
use domain::models::location::LocationSource;

/// Database row mapping for the devices table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceEntity {
    pub id: Uuid,
    pub serial_number: String,
    pub asset_tag: String,
    pub device_name: Option<String>,
    pub device_type: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub mac_address: Option<String>,
    pub employee_name: Option<String>,
    pub department: Option<String>,
    pub status: String,
    pub is_registered: bool,
    pub agent_installed: bool,
    pub agent_version: Option<String>,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_location_accuracy: Option<f64>,
    pub last_location_source: Option<String>,
    pub last_ip_address: Option<String>,
    pub network_name: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub is_locked: bool,
    pub lock_reason: Option<String>,
    pub is_wiped: bool,
    pub agent_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub registered_at: Option<DateTime<Utc>>,
}

impl From<DeviceEntity> for Device {
    fn from(e: DeviceEntity) -> Self {
        Self {
            id: e.id,
            serial_number: e.serial_number,
            asset_tag: e.asset_tag,
            device_name: e.device_name,
            device_type: DeviceType::parse(&e.device_type).unwrap_or_default(),
            manufacturer: e.manufacturer,
            model: e.model,
            os_name: e.os_name,
            os_version: e.os_version,
            mac_address: e.mac_address,
            employee_name: e.employee_name,
            department: e.department,
            status: DeviceStatus::parse(&e.status).unwrap_or(DeviceStatus::Offline),
            is_registered: e.is_registered,
            agent_installed: e.agent_installed,
            agent_version: e.agent_version,
            last_latitude: e.last_latitude,
            last_longitude: e.last_longitude,
            last_location_accuracy: e.last_location_accuracy,
            last_location_source: e
                .last_location_source
                .as_deref()
                .and_then(LocationSource::parse),
            last_ip_address: e.last_ip_address,
            network_name: e.network_name,
            last_seen: e.last_seen,
            is_locked: e.is_locked,
            lock_reason: e.lock_reason,
            is_wiped: e.is_wiped,
            created_at: e.created_at,
            updated_at: e.updated_at,
            registered_at: e.registered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entity() -> DeviceEntity {
        DeviceEntity {
            id: Uuid::new_v4(),
            serial_number: "SN-001122".to_string(),
            asset_tag: "IT-0042".to_string(),
            device_name: Some("jdoe-laptop".to_string()),
            device_type: "laptop".to_string(),
            manufacturer: None,
            model: None,
            os_name: Some("Windows".to_string()),
            os_version: Some("11".to_string()),
            mac_address: None,
            employee_name: None,
            department: Some("engineering".to_string()),
            status: "online".to_string(),
            is_registered: true,
            agent_installed: true,
            agent_version: Some("2.1.0".to_string()),
            last_latitude: Some(48.1486),
            last_longitude: Some(17.1077),
            last_location_accuracy: Some(10.0),
            last_location_source: Some("GPS".to_string()),
            last_ip_address: None,
            network_name: None,
            last_seen: Some(Utc::now()),
            is_locked: false,
            lock_reason: None,
            is_wiped: false,
            agent_token_hash: Some("abc123".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            registered_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_device_entity_to_domain() {
        let entity = test_entity();
        let device: Device = entity.clone().into();

        assert_eq!(device.id, entity.id);
        assert_eq!(device.serial_number, entity.serial_number);
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.device_type, DeviceType::Laptop);
        assert_eq!(device.last_location_source, Some(LocationSource::Gps));
    }

    #[test]
    fn test_unknown_status_falls_back_to_offline() {
        let mut entity = test_entity();
        entity.status = "bogus".to_string();
        let device: Device = entity.into();
        assert_eq!(device.status, DeviceStatus::Offline);
    }

    #[test]
    fn test_unknown_location_source_dropped() {
        let mut entity = test_entity();
        entity.last_location_source = Some("CARRIER".to_string());
        let device: Device = entity.into();
        assert!(device.last_location_source.is_none());
    }
}

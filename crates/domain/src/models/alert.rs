//! Alert domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of detected condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    GeofenceExit,
    GeofenceEnter,
    DeviceOffline,
    LockRequested,
    WipeRequested,
}

impl AlertType {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::GeofenceExit => "geofence_exit",
            AlertType::GeofenceEnter => "geofence_enter",
            AlertType::DeviceOffline => "device_offline",
            AlertType::LockRequested => "lock_requested",
            AlertType::WipeRequested => "wipe_requested",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "geofence_exit" => Some(AlertType::GeofenceExit),
            "geofence_enter" => Some(AlertType::GeofenceEnter),
            "device_offline" => Some(AlertType::DeviceOffline),
            "lock_requested" => Some(AlertType::LockRequested),
            "wipe_requested" => Some(AlertType::WipeRequested),
            _ => None,
        }
    }
}

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(AlertSeverity::Low),
            "medium" => Some(AlertSeverity::Medium),
            "high" => Some(AlertSeverity::High),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// A detected condition tied to a device.
///
/// Invariant: at most one unresolved alert per (device, geofence, type)
/// tuple; the evaluator and the offline sweep enforce this before insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub device_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
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

/// Response payload for alert views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geofence_id: Option<Uuid>,
    pub is_acknowledged: bool,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Alert> for AlertResponse {
    fn from(a: Alert) -> Self {
        Self {
            id: a.id,
            device_id: a.device_id,
            alert_type: a.alert_type,
            severity: a.severity,
            title: a.title,
            message: a.message,
            latitude: a.latitude,
            longitude: a.longitude,
            geofence_id: a.geofence_id,
            is_acknowledged: a.is_acknowledged,
            is_resolved: a.is_resolved,
            created_at: a.created_at,
        }
    }
}

/// Response for listing alerts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsResponse {
    pub alerts: Vec<AlertResponse>,
    pub total: usize,
}

/// Request payload for resolving an alert.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertRequest {
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_serialization() {
        assert_eq!(
            serde_json::to_string(&AlertType::GeofenceExit).unwrap(),
            "\"geofence_exit\""
        );
        assert_eq!(
            serde_json::to_string(&AlertType::DeviceOffline).unwrap(),
            "\"device_offline\""
        );
    }

    #[test]
    fn test_alert_type_roundtrip() {
        for ty in [
            AlertType::GeofenceExit,
            AlertType::GeofenceEnter,
            AlertType::DeviceOffline,
            AlertType::LockRequested,
            AlertType::WipeRequested,
        ] {
            assert_eq!(AlertType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(AlertType::parse("unknown"), None);
    }

    #[test]
    fn test_alert_severity_roundtrip() {
        for sev in [
            AlertSeverity::Low,
            AlertSeverity::Medium,
            AlertSeverity::High,
            AlertSeverity::Critical,
        ] {
            assert_eq!(AlertSeverity::parse(sev.as_str()), Some(sev));
        }
        assert_eq!(AlertSeverity::parse(""), None);
    }

    #[test]
    fn test_alert_type_usable_as_map_key() {
        use std::collections::HashSet;

        let mut open: HashSet<(Uuid, AlertType)> = HashSet::new();
        let zone = Uuid::new_v4();
        open.insert((zone, AlertType::GeofenceExit));

        assert!(open.contains(&(zone, AlertType::GeofenceExit)));
        assert!(!open.contains(&(zone, AlertType::GeofenceEnter)));
    }

    #[test]
    fn test_alert_response_skips_none_fields() {
        let response = AlertResponse {
            id: Uuid::new_v4(),
            device_id: Uuid::new_v4(),
            alert_type: AlertType::DeviceOffline,
            severity: AlertSeverity::Medium,
            title: "Device offline".to_string(),
            message: None,
            latitude: None,
            longitude: None,
            geofence_id: None,
            is_acknowledged: false,
            is_resolved: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("geofenceId"));
        assert!(!json.contains("latitude"));
        assert!(json.contains("\"alertType\":\"device_offline\""));
    }
}

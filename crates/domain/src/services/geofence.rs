//! Geofence evaluation engine.
//!
//! The evaluator is a pure function of its inputs: the device's live
//! coordinate, the set of zones that apply to it, and the keys of alerts
//! already open. It performs no I/O; the caller persists the returned
//! drafts atomically with the triggering location write.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::alert::{AlertSeverity, AlertType};
use crate::models::geofence::{Geofence, GeofenceShape};
use crate::services::geo::{haversine_distance_meters, point_in_polygon};

/// Key identifying an open alert for dedup purposes.
pub type OpenAlertKey = (Uuid, AlertType);

/// An alert the caller should persist.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub latitude: f64,
    pub longitude: f64,
    pub geofence_id: Uuid,
}

/// Checks a single coordinate against a single zone.
///
/// Circle zones return the distance from center and are boundary-inclusive:
/// a point at exactly `radius_meters` counts as inside. Polygon zones use
/// the ray-casting rule and have no meaningful distance.
pub fn check_zone(zone: &Geofence, latitude: f64, longitude: f64) -> (bool, Option<f64>) {
    match &zone.shape {
        GeofenceShape::Circle {
            center_latitude,
            center_longitude,
            radius_meters,
        } => {
            let distance =
                haversine_distance_meters(latitude, longitude, *center_latitude, *center_longitude);
            (distance <= *radius_meters, Some(distance))
        }
        GeofenceShape::Polygon { vertices } => {
            (point_in_polygon(latitude, longitude, vertices), None)
        }
    }
}

/// Evaluates a coordinate against the zones applicable to a device.
///
/// `zones` must already be filtered to active zones in scope for the device
/// (department match or unscoped); filtering happens before this call so the
/// evaluator stays a pure function of its explicit zone set. `open_alerts`
/// carries the `(geofence_id, alert_type)` keys of unresolved alerts; a zone
/// that already has an open alert of the same type emits nothing.
pub fn evaluate(
    asset_tag: &str,
    latitude: f64,
    longitude: f64,
    zones: &[Geofence],
    open_alerts: &HashSet<OpenAlertKey>,
) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    for zone in zones {
        let (is_inside, _distance) = check_zone(zone, latitude, longitude);

        if zone.alert_on_exit
            && !is_inside
            && !open_alerts.contains(&(zone.id, AlertType::GeofenceExit))
        {
            drafts.push(AlertDraft {
                alert_type: AlertType::GeofenceExit,
                severity: AlertSeverity::High,
                title: format!("Device left geofence: {}", zone.name),
                message: format!(
                    "Device {} has left the allowed zone '{}'",
                    asset_tag, zone.name
                ),
                latitude,
                longitude,
                geofence_id: zone.id,
            });
        }

        if zone.alert_on_enter
            && is_inside
            && !open_alerts.contains(&(zone.id, AlertType::GeofenceEnter))
        {
            drafts.push(AlertDraft {
                alert_type: AlertType::GeofenceEnter,
                severity: AlertSeverity::Medium,
                title: format!("Device entered geofence: {}", zone.name),
                message: format!("Device {} has entered zone '{}'", asset_tag, zone.name),
                latitude,
                longitude,
                geofence_id: zone.id,
            });
        }
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geofence::GeoPoint;
    use chrono::Utc;

    fn circle_zone(radius_meters: f64, alert_on_exit: bool, alert_on_enter: bool) -> Geofence {
        Geofence {
            id: Uuid::new_v4(),
            name: "HQ".to_string(),
            description: None,
            shape: GeofenceShape::Circle {
                center_latitude: 48.1486,
                center_longitude: 17.1077,
                radius_meters,
            },
            is_active: true,
            alert_on_exit,
            alert_on_enter,
            department: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn square_zone() -> Geofence {
        Geofence {
            id: Uuid::new_v4(),
            name: "Yard".to_string(),
            description: None,
            shape: GeofenceShape::Polygon {
                vertices: vec![
                    GeoPoint {
                        latitude: 0.0,
                        longitude: 0.0,
                    },
                    GeoPoint {
                        latitude: 0.0,
                        longitude: 10.0,
                    },
                    GeoPoint {
                        latitude: 10.0,
                        longitude: 10.0,
                    },
                    GeoPoint {
                        latitude: 10.0,
                        longitude: 0.0,
                    },
                ],
            },
            is_active: true,
            alert_on_exit: true,
            alert_on_enter: false,
            department: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_circle_center_is_inside() {
        let zone = circle_zone(500.0, true, false);
        let (inside, distance) = check_zone(&zone, 48.1486, 17.1077);
        assert!(inside);
        assert_eq!(distance, Some(0.0));
    }

    #[test]
    fn test_circle_boundary_is_inclusive() {
        let zone = circle_zone(500.0, true, false);

        // Walk north until the distance is just at/over the radius. One
        // degree of latitude is ~111 km, so 500 m is ~0.0045 degrees.
        let on_boundary_lat = 48.1486 + 500.0 / 111_194.9;
        let (_, distance) = check_zone(&zone, on_boundary_lat, 17.1077);
        let d = distance.unwrap();
        assert!((d - 500.0).abs() < 1.0, "distance {} not near radius", d);

        // Exactly the radius counts as inside
        let exact = circle_zone(d, true, false);
        let (inside, _) = check_zone(&exact, on_boundary_lat, 17.1077);
        assert!(inside);

        // Epsilon beyond is outside
        let just_under = circle_zone(d - 0.001, true, false);
        let (inside, _) = check_zone(&just_under, on_boundary_lat, 17.1077);
        assert!(!inside);
    }

    #[test]
    fn test_polygon_zone_has_no_distance() {
        let zone = square_zone();
        let (inside, distance) = check_zone(&zone, 5.0, 5.0);
        assert!(inside);
        assert_eq!(distance, None);

        let (inside, distance) = check_zone(&zone, 15.0, 15.0);
        assert!(!inside);
        assert_eq!(distance, None);
    }

    #[test]
    fn test_exit_alert_emitted_outside_zone() {
        let zone = circle_zone(500.0, true, false);
        let open = HashSet::new();

        // A point in another city, far outside the 500 m circle
        let drafts = evaluate("IT-0042", 50.0755, 14.4378, &[zone.clone()], &open);

        assert_eq!(drafts.len(), 1);
        let draft = &drafts[0];
        assert_eq!(draft.alert_type, AlertType::GeofenceExit);
        assert_eq!(draft.severity, AlertSeverity::High);
        assert_eq!(draft.geofence_id, zone.id);
        assert!(draft.title.contains("HQ"));
        assert!(draft.message.contains("IT-0042"));
        assert_eq!(draft.latitude, 50.0755);
        assert_eq!(draft.longitude, 14.4378);
    }

    #[test]
    fn test_no_exit_alert_inside_zone() {
        let zone = circle_zone(500.0, true, false);
        let drafts = evaluate("IT-0042", 48.1486, 17.1077, &[zone], &HashSet::new());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_enter_alert_emitted_inside_zone() {
        let zone = circle_zone(500.0, false, true);
        let drafts = evaluate("IT-0042", 48.1486, 17.1077, &[zone.clone()], &HashSet::new());

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::GeofenceEnter);
        assert_eq!(drafts[0].severity, AlertSeverity::Medium);
    }

    #[test]
    fn test_open_alert_suppresses_duplicate() {
        let zone = circle_zone(500.0, true, false);
        let mut open = HashSet::new();
        open.insert((zone.id, AlertType::GeofenceExit));

        let drafts = evaluate("IT-0042", 50.0755, 14.4378, &[zone], &open);
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_resolving_rearms_alerting() {
        let zone = circle_zone(500.0, true, false);

        let mut open = HashSet::new();
        open.insert((zone.id, AlertType::GeofenceExit));
        assert!(evaluate("IT-0042", 50.0755, 14.4378, &[zone.clone()], &open).is_empty());

        // Resolution removes the key; the next outside point alerts again
        open.clear();
        let drafts = evaluate("IT-0042", 50.0755, 14.4378, &[zone], &open);
        assert_eq!(drafts.len(), 1);
    }

    #[test]
    fn test_dedup_is_per_alert_type() {
        // Zone alerting on both enter and exit; an open exit alert must
        // not suppress a fresh enter alert
        let zone = circle_zone(500.0, true, true);
        let mut open = HashSet::new();
        open.insert((zone.id, AlertType::GeofenceExit));

        let drafts = evaluate("IT-0042", 48.1486, 17.1077, &[zone], &open);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::GeofenceEnter);
    }

    #[test]
    fn test_dedup_is_per_zone() {
        let zone_a = circle_zone(500.0, true, false);
        let zone_b = circle_zone(500.0, true, false);
        let mut open = HashSet::new();
        open.insert((zone_a.id, AlertType::GeofenceExit));

        let drafts = evaluate(
            "IT-0042",
            50.0755,
            14.4378,
            &[zone_a, zone_b.clone()],
            &open,
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].geofence_id, zone_b.id);
    }

    #[test]
    fn test_multiple_zones_emit_independently() {
        let circle = circle_zone(500.0, true, false);
        let square = square_zone();

        // Outside both zones
        let drafts = evaluate(
            "IT-0042",
            -30.0,
            100.0,
            &[circle, square],
            &HashSet::new(),
        );
        assert_eq!(drafts.len(), 2);
        assert!(drafts
            .iter()
            .all(|d| d.alert_type == AlertType::GeofenceExit));
    }

    #[test]
    fn test_zone_without_flags_emits_nothing() {
        let zone = circle_zone(500.0, false, false);
        let drafts = evaluate("IT-0042", 50.0755, 14.4378, &[zone], &HashSet::new());
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_polygon_exit_alert() {
        let zone = square_zone();
        let drafts = evaluate("IT-0042", 15.0, 15.0, &[zone], &HashSet::new());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::GeofenceExit);
    }
}

//! Integration tests for the agent protocol: registration and pings.

mod common;

use axum::extract::State;
use axum::Json;

use domain::models::command::{CommandType, DeliveredCommandKind};
use domain::models::device::{AgentPingRequest, DeviceStatus, RegisterAgentRequest};
use domain::models::geofence::GeofenceShape;
use domain::models::location::LocationSource;
use persistence::repositories::{
    AlertRepository, CommandRepository, DeviceRepository, GeofenceRepository,
};
use trace_api::error::ApiError;
use trace_api::routes::agent;
use trace_api::services::PingOrchestrator;
use uuid::Uuid;

fn register_request(serial: &str) -> RegisterAgentRequest {
    RegisterAgentRequest {
        serial_number: serial.to_string(),
        asset_tag: None,
        device_name: Some("integration-laptop".to_string()),
        manufacturer: Some("Lenovo".to_string()),
        model: Some("T14".to_string()),
        os_name: Some("Linux".to_string()),
        os_version: Some("6.8".to_string()),
        mac_address: None,
        agent_version: "2.0.0".to_string(),
    }
}

fn ping_at(latitude: f64, longitude: f64) -> AgentPingRequest {
    AgentPingRequest {
        latitude: Some(latitude),
        longitude: Some(longitude),
        accuracy: Some(10.0),
        altitude: None,
        location_source: LocationSource::Gps,
        ip_address: Some("10.0.0.5".to_string()),
        network_name: Some("corp-wifi".to_string()),
        battery_level: Some(75.0),
        is_charging: Some(false),
        agent_version: "2.0.0".to_string(),
    }
}

fn ping_without_location() -> AgentPingRequest {
    AgentPingRequest {
        latitude: None,
        longitude: None,
        accuracy: None,
        altitude: None,
        location_source: LocationSource::Ip,
        ip_address: None,
        network_name: None,
        battery_level: None,
        is_charging: None,
        agent_version: "2.0.0".to_string(),
    }
}

async fn geofence_alert_count(pool: &sqlx::PgPool, device_id: Uuid, geofence_id: Uuid) -> i64 {
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM alerts WHERE device_id = $1 AND geofence_id = $2",
    )
    .bind(device_id)
    .bind(geofence_id)
    .fetch_one(pool)
    .await
    .expect("count alerts");
    count.0
}

#[tokio::test]
async fn registration_issues_validating_agent_token() {
    let pool = require_test_db!();
    let state = common::test_state(pool.clone());
    let serial = common::unique_serial();

    let Json(response) = agent::register(State(state.clone()), Json(register_request(&serial)))
        .await
        .expect("register");

    // The token is a real agent token for the new device
    let claims = state
        .jwt
        .validate_agent_token(&response.agent_token)
        .expect("token validates");
    assert_eq!(claims.sub, response.device_id.to_string());

    // The record is registered, online, and carries only the fingerprint
    let device = DeviceRepository::new(pool.clone())
        .find_by_id(response.device_id)
        .await
        .expect("find")
        .expect("exists");
    assert!(device.is_registered);
    assert!(device.agent_installed);
    assert_eq!(device.status, "online");
    let hash = device.agent_token_hash.expect("hash stored");
    assert_ne!(hash, response.agent_token);
    assert_eq!(hash, shared::crypto::sha256_hex(&response.agent_token));
}

#[tokio::test]
async fn registration_rejected_once_installed() {
    let pool = require_test_db!();
    let state = common::test_state(pool.clone());
    let serial = common::unique_serial();

    agent::register(State(state.clone()), Json(register_request(&serial)))
        .await
        .expect("first register");

    // Same serial again: the device is fully registered now
    let second = agent::register(State(state.clone()), Json(register_request(&serial))).await;
    assert!(matches!(second, Err(ApiError::AlreadyRegistered(_))));
}

#[tokio::test]
async fn registration_auto_generates_asset_tag() {
    let pool = require_test_db!();
    let state = common::test_state(pool.clone());
    let serial = common::unique_serial();

    let Json(response) = agent::register(State(state.clone()), Json(register_request(&serial)))
        .await
        .expect("register");

    let device = DeviceRepository::new(pool)
        .find_by_id(response.device_id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(device.asset_tag, format!("AUTO-{serial}"));
}

#[tokio::test]
async fn ping_persists_location_and_updates_device() {
    let pool = require_test_db!();
    let device = common::provision_device(&pool).await;
    let orchestrator = PingOrchestrator::new(pool.clone(), 5);

    let response = orchestrator
        .process(device.id, &ping_at(48.1486, 17.1077))
        .await
        .expect("ping");
    assert!(response.commands.is_empty());

    let updated = DeviceRepository::new(pool.clone())
        .find_by_id(device.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(updated.status, "online");
    assert_eq!(updated.last_latitude, Some(48.1486));
    assert_eq!(updated.last_longitude, Some(17.1077));
    assert!(updated.last_seen.is_some());

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM location_history WHERE device_id = $1")
            .bind(device.id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn ping_without_location_stores_no_sample() {
    let pool = require_test_db!();
    let device = common::provision_device(&pool).await;
    let orchestrator = PingOrchestrator::new(pool.clone(), 5);

    orchestrator
        .process(device.id, &ping_without_location())
        .await
        .expect("ping");

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM location_history WHERE device_id = $1")
            .bind(device.id)
            .fetch_one(&pool)
            .await
            .expect("count");
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn ping_for_unknown_device_is_not_found() {
    let pool = require_test_db!();
    let orchestrator = PingOrchestrator::new(pool.clone(), 5);

    let result = orchestrator
        .process(Uuid::new_v4(), &ping_without_location())
        .await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn geofence_exit_alert_deduplicated_until_resolved() {
    let pool = require_test_db!();
    let device = common::provision_device(&pool).await;
    let orchestrator = PingOrchestrator::new(pool.clone(), 5);

    // 500 m circle around Bratislava HQ, alerting on exit
    let zone = GeofenceRepository::new(pool.clone())
        .create(
            "HQ",
            None,
            &GeofenceShape::Circle {
                center_latitude: 48.1486,
                center_longitude: 17.1077,
                radius_meters: 500.0,
            },
            true,
            false,
            true,
            None,
            None,
        )
        .await
        .expect("create zone");

    // Inside: no alert
    orchestrator
        .process(device.id, &ping_at(48.1486, 17.1077))
        .await
        .expect("ping inside");
    assert_eq!(geofence_alert_count(&pool, device.id, zone.id).await, 0);

    // Outside (Prague): one alert
    orchestrator
        .process(device.id, &ping_at(50.0755, 14.4378))
        .await
        .expect("ping outside");
    assert_eq!(geofence_alert_count(&pool, device.id, zone.id).await, 1);

    // Still outside: deduplicated while the alert is open
    orchestrator
        .process(device.id, &ping_at(50.0755, 14.4378))
        .await
        .expect("ping outside again");
    assert_eq!(geofence_alert_count(&pool, device.id, zone.id).await, 1);

    // Resolving re-arms alerting
    let alert_repo = AlertRepository::new(pool.clone());
    let alert_id: (Uuid,) = sqlx::query_as(
        "SELECT id FROM alerts WHERE device_id = $1 AND geofence_id = $2",
    )
    .bind(device.id)
    .bind(zone.id)
    .fetch_one(&pool)
    .await
    .expect("alert id");
    alert_repo
        .resolve(alert_id.0, Some("found in cafeteria"))
        .await
        .expect("resolve");

    orchestrator
        .process(device.id, &ping_at(50.0755, 14.4378))
        .await
        .expect("ping after resolve");
    assert_eq!(geofence_alert_count(&pool, device.id, zone.id).await, 2);
}

#[tokio::test]
async fn department_scoped_zone_skips_other_devices() {
    let pool = require_test_db!();
    let scoped = common::provision_device(&pool).await;
    let unscoped = common::provision_device(&pool).await;
    common::set_department(&pool, scoped.id, "logistics").await;

    let zone = GeofenceRepository::new(pool.clone())
        .create(
            "Warehouse",
            None,
            &GeofenceShape::Circle {
                center_latitude: 48.1486,
                center_longitude: 17.1077,
                radius_meters: 100.0,
            },
            true,
            false,
            true,
            Some("logistics"),
            None,
        )
        .await
        .expect("create zone");

    let orchestrator = PingOrchestrator::new(pool.clone(), 5);

    // The unscoped device is outside the zone but out of its scope
    orchestrator
        .process(unscoped.id, &ping_at(50.0, 14.0))
        .await
        .expect("ping unscoped");
    assert_eq!(geofence_alert_count(&pool, unscoped.id, zone.id).await, 0);

    // The logistics device gets the exit alert
    orchestrator
        .process(scoped.id, &ping_at(50.0, 14.0))
        .await
        .expect("ping scoped");
    assert_eq!(geofence_alert_count(&pool, scoped.id, zone.id).await, 1);
}

#[tokio::test]
async fn ping_drains_commands_in_batch() {
    let pool = require_test_db!();
    let device = common::provision_device(&pool).await;
    let command_repo = CommandRepository::new(pool.clone());

    let first = command_repo
        .create(device.id, CommandType::Restart, None, None, None)
        .await
        .expect("create");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    command_repo
        .create(device.id, CommandType::Screenshot, None, None, None)
        .await
        .expect("create");

    let orchestrator = PingOrchestrator::new(pool.clone(), 5);
    let response = orchestrator
        .process(device.id, &ping_without_location())
        .await
        .expect("ping");

    assert_eq!(response.commands.len(), 2);
    assert_eq!(response.command, Some(DeliveredCommandKind::Restart));
    assert_eq!(response.command_id, Some(first.id));

    // Delivered once; a second ping sees an empty queue
    let again = orchestrator
        .process(device.id, &ping_without_location())
        .await
        .expect("second ping");
    assert!(again.commands.is_empty());
}

#[tokio::test]
async fn locked_device_receives_lock_pseudo_command() {
    let pool = require_test_db!();
    let device = common::provision_device(&pool).await;
    let device_repo = DeviceRepository::new(pool.clone());

    device_repo
        .set_locked(device.id, "Reported stolen")
        .await
        .expect("lock")
        .expect("exists");

    let orchestrator = PingOrchestrator::new(pool.clone(), 5);
    let response = orchestrator
        .process(device.id, &ping_without_location())
        .await
        .expect("ping");

    assert_eq!(response.command, Some(DeliveredCommandKind::Lock));
    assert_eq!(response.message.as_deref(), Some("Reported stolen"));
    assert!(response.commands[0].id.is_none());

    // The ping brought it back online, but the lock flag stays
    let updated = device_repo
        .find_by_id(device.id)
        .await
        .expect("find")
        .expect("exists");
    assert!(updated.is_locked);
    assert_eq!(updated.status, DeviceStatus::Online.as_str());
}

#[tokio::test]
async fn wiped_device_gets_only_wipe_and_no_drain() {
    let pool = require_test_db!();
    let device = common::provision_device(&pool).await;
    let device_repo = DeviceRepository::new(pool.clone());
    let command_repo = CommandRepository::new(pool.clone());

    // A command queued before the wipe
    let stranded = command_repo
        .create(device.id, CommandType::Restart, None, None, None)
        .await
        .expect("create");

    device_repo.set_wiped(device.id).await.expect("wipe").expect("exists");

    let orchestrator = PingOrchestrator::new(pool.clone(), 5);
    let response = orchestrator
        .process(device.id, &ping_without_location())
        .await
        .expect("ping");

    assert_eq!(response.commands.len(), 1);
    assert_eq!(response.command, Some(DeliveredCommandKind::Wipe));

    // The queued command was never delivered and the status stays wiped
    let entity = command_repo
        .find_by_id(stranded.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(entity.status, "pending");

    let updated = device_repo
        .find_by_id(device.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(updated.status, "wiped");
}

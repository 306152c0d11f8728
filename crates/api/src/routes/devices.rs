//! Device management handlers (operator control plane).
//!
//! Lock/unlock/wipe write the device flag channel directly. The flags are
//! redundant with LOCK commands in the structured queue by design: agents
//! predating the queue read only the flags, so both paths stay live.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use domain::models::alert::{AlertSeverity, AlertType};
use domain::models::device::{
    Device, DeviceResponse, DeviceStatus, ListDevicesResponse, LockDeviceRequest,
    WipeDeviceRequest,
};
use domain::models::location::{LocationHistoryResponse, LocationSample};
use persistence::repositories::{AlertRepository, DeviceRepository, LocationRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OperatorAuth;

/// List all devices, most recently seen first.
///
/// GET /api/v1/devices
pub async fn list_devices(
    State(state): State<AppState>,
    _operator: OperatorAuth,
) -> Result<Json<ListDevicesResponse>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let entities = device_repo.list_all().await?;

    let devices: Vec<DeviceResponse> = entities
        .into_iter()
        .map(|e| Device::from(e).into())
        .collect();
    let total = devices.len();
    let online_count = devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Online)
        .count();

    Ok(Json(ListDevicesResponse {
        devices,
        total,
        online_count,
    }))
}

/// Get a specific device by ID.
///
/// GET /api/v1/devices/:device_id
pub async fn get_device(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let device: Device = device_repo
        .find_by_id(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
        .into();

    Ok(Json(device.into()))
}

/// Lock a device via the flag channel.
///
/// POST /api/v1/devices/:device_id/lock
pub async fn lock_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
    Json(request): Json<LockDeviceRequest>,
) -> Result<Json<DeviceResponse>, ApiError> {
    request.validate()?;

    let device_repo = DeviceRepository::new(state.pool.clone());
    let device: Device = device_repo
        .set_locked(device_id, &request.reason)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
        .into();

    raise_device_alert(
        &state,
        &device,
        AlertType::LockRequested,
        AlertSeverity::High,
        format!("Lock requested for {}", device.asset_tag),
        request.reason.clone(),
    )
    .await?;

    info!(
        device_id = %device_id,
        locked_by = %operator.user_id,
        "Device lock requested"
    );

    Ok(Json(device.into()))
}

/// Clear the lock flag.
///
/// POST /api/v1/devices/:device_id/unlock
pub async fn unlock_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let device: Device = device_repo
        .set_unlocked(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
        .into();

    info!(
        device_id = %device_id,
        unlocked_by = %operator.user_id,
        "Device unlocked"
    );

    Ok(Json(device.into()))
}

/// Wipe a device. Irreversible; requires explicit confirmation.
///
/// POST /api/v1/devices/:device_id/wipe
pub async fn wipe_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
    Json(request): Json<WipeDeviceRequest>,
) -> Result<Json<DeviceResponse>, ApiError> {
    request.validate()?;

    if !request.confirm {
        return Err(ApiError::Validation(
            "Wipe is irreversible; set confirm=true to proceed".to_string(),
        ));
    }

    let device_repo = DeviceRepository::new(state.pool.clone());
    let device: Device = device_repo
        .set_wiped(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
        .into();

    raise_device_alert(
        &state,
        &device,
        AlertType::WipeRequested,
        AlertSeverity::Critical,
        format!("Wipe requested for {}", device.asset_tag),
        request.reason.clone(),
    )
    .await?;

    warn!(
        device_id = %device_id,
        wiped_by = %operator.user_id,
        reason = %request.reason,
        "Device wipe requested"
    );

    Ok(Json(device.into()))
}

/// Location history for a device, newest first.
///
/// GET /api/v1/devices/:device_id/locations
pub async fn location_history(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
    Query(query): Query<LocationHistoryQuery>,
) -> Result<Json<LocationHistoryResponse>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    if device_repo.find_by_id(device_id).await?.is_none() {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }

    let location_repo = LocationRepository::new(state.pool.clone());
    let entities = location_repo
        .history_for_device(device_id, query.limit.clamp(1, 500))
        .await?;

    let locations: Vec<_> = entities
        .into_iter()
        .map(|e| LocationSample::from(e).into())
        .collect();
    let total = locations.len();

    Ok(Json(LocationHistoryResponse { locations, total }))
}

/// Query parameters for location history.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationHistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    100
}

/// Hard-delete a device and all dependent rows.
///
/// DELETE /api/v1/devices/:device_id
pub async fn delete_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let deleted = device_repo.delete(device_id).await?;

    if deleted == 0 {
        return Err(ApiError::NotFound("Device not found".to_string()));
    }

    warn!(
        device_id = %device_id,
        deleted_by = %operator.user_id,
        "Device deleted with location history, alerts, and commands"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Insert a device-level alert unless one of the same type is already open.
async fn raise_device_alert(
    state: &AppState,
    device: &Device,
    alert_type: AlertType,
    severity: AlertSeverity,
    title: String,
    message: String,
) -> Result<(), ApiError> {
    let alert_repo = AlertRepository::new(state.pool.clone());

    if !alert_repo.has_open_device_alert(device.id, alert_type).await? {
        alert_repo
            .insert_device_alert(device.id, alert_type, severity, &title, &message)
            .await?;
    }

    Ok(())
}

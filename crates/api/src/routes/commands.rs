//! Remote command control-plane handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::command::{
    CommandListResponse, CommandResponse, CommandStatus, CommandType, CreateCommandRequest,
    RemoteCommand,
};
use domain::models::device::{Device, LockDeviceRequest};
use persistence::repositories::{CommandRepository, DeviceRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OperatorAuth;

/// Loads the target device and refuses to queue work for wiped ones.
///
/// Wiped is terminal: the queue would never drain for such a device, so
/// creation is rejected up front instead of letting commands rot.
async fn queueable_device(state: &AppState, device_id: Uuid) -> Result<Device, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let device: Device = device_repo
        .find_by_id(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
        .into();

    if device.is_wiped {
        return Err(ApiError::Conflict(
            "Device has been wiped; no further commands can be delivered".to_string(),
        ));
    }

    Ok(device)
}

async fn enqueue(
    state: &AppState,
    operator: &OperatorAuth,
    device_id: Uuid,
    command_type: CommandType,
    payload: Option<&serde_json::Value>,
    message: Option<&str>,
) -> Result<RemoteCommand, ApiError> {
    let device = queueable_device(state, device_id).await?;

    let command_repo = CommandRepository::new(state.pool.clone());
    let entity = command_repo
        .create(device_id, command_type, payload, message, Some(operator.user_id))
        .await?;

    info!(
        command_id = %entity.id,
        device_id = %device_id,
        serial_number = %device.serial_number,
        command_type = command_type.as_str(),
        "Command queued"
    );

    Ok(entity.into())
}

/// Create a new remote command for a device.
///
/// POST /api/v1/commands
pub async fn create_command(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Json(request): Json<CreateCommandRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = enqueue(
        &state,
        &operator,
        request.device_id,
        request.command_type,
        request.payload.as_ref(),
        request.message.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(command.into())))
}

/// Query parameters for listing device commands.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCommandsQuery {
    pub status: Option<CommandStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

/// List commands for a device, newest first.
///
/// GET /api/v1/commands/device/:device_id
pub async fn list_device_commands(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
    Query(query): Query<ListCommandsQuery>,
) -> Result<Json<CommandListResponse>, ApiError> {
    let command_repo = CommandRepository::new(state.pool.clone());
    let entities = command_repo
        .list_for_device(device_id, query.status, query.limit.clamp(1, 200))
        .await?;

    let commands: Vec<CommandResponse> = entities
        .into_iter()
        .map(|e| RemoteCommand::from(e).into())
        .collect();
    let total = commands.len();

    Ok(Json(CommandListResponse { commands, total }))
}

/// Get a specific command by ID.
///
/// GET /api/v1/commands/:command_id
pub async fn get_command(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(command_id): Path<Uuid>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command_repo = CommandRepository::new(state.pool.clone());
    let entity = command_repo
        .find_by_id(command_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Command not found".to_string()))?;

    Ok(Json(RemoteCommand::from(entity).into()))
}

/// Cancel a pending command.
///
/// DELETE /api/v1/commands/:command_id
///
/// Racing a concurrent drain is settled by transaction ordering; losing the
/// race surfaces as `InvalidTransition` (the command was already delivered).
pub async fn cancel_command(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(command_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command_repo = CommandRepository::new(state.pool.clone());
    let command = command_repo.cancel(command_id).await?;

    info!(
        command_id = %command.id,
        cancelled_by = %operator.user_id,
        command_type = command.command_type.as_str(),
        "Command cancelled"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Queue a lock command.
///
/// POST /api/v1/commands/lock/:device_id
pub async fn lock_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
    Json(request): Json<LockDeviceRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    request.validate()?;
    let command = enqueue(
        &state,
        &operator,
        device_id,
        CommandType::Lock,
        None,
        Some(&request.reason),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(command.into())))
}

/// Queue a restart command.
///
/// POST /api/v1/commands/restart/:device_id
pub async fn restart_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = enqueue(&state, &operator, device_id, CommandType::Restart, None, None).await?;
    Ok((StatusCode::CREATED, Json(command.into())))
}

/// Queue a shutdown command.
///
/// POST /api/v1/commands/shutdown/:device_id
pub async fn shutdown_device(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command = enqueue(&state, &operator, device_id, CommandType::Shutdown, None, None).await?;
    Ok((StatusCode::CREATED, Json(command.into())))
}

/// Request a screenshot from a device.
///
/// POST /api/v1/commands/screenshot/:device_id
pub async fn request_screenshot(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    let command =
        enqueue(&state, &operator, device_id, CommandType::Screenshot, None, None).await?;
    Ok((StatusCode::CREATED, Json(command.into())))
}

/// Request payload for the message quick action.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,
}

/// Queue a message to be displayed on the device.
///
/// POST /api/v1/commands/message/:device_id
pub async fn send_message(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(device_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<CommandResponse>), ApiError> {
    request.validate()?;
    let command = enqueue(
        &state,
        &operator,
        device_id,
        CommandType::Message,
        None,
        Some(&request.message),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(command.into())))
}

//! Device agent endpoint handlers: registration, ping, result reporting.

use axum::{extract::State, Json};
use base64::Engine;
use chrono::Utc;
use tracing::info;
use validator::Validate;

use domain::models::command::{
    CommandResponse, CommandResult, PingResponse, RemoteCommand, ReportResultRequest,
    ScreenshotUploadRequest,
};
use domain::models::device::{
    AgentPingRequest, AgentStatusResponse, Device, RegisterAgentRequest, RegistrationResponse,
};
use persistence::repositories::{CommandRepository, DeviceRepository, RegistrationInput};
use shared::crypto::sha256_hex;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AgentAuth;
use crate::services::PingOrchestrator;

/// Register a device agent.
///
/// POST /api/v1/agent/register
///
/// Idempotent upsert keyed on serial number: the device record is
/// auto-provisioned when the serial is new, and repeated registrations are
/// accepted until the agent is fully installed, after which the call fails
/// with `AlreadyRegistered`. The issued token is returned exactly once;
/// only its fingerprint is stored.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterAgentRequest>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    request.validate()?;

    let device_repo = DeviceRepository::new(state.pool.clone());
    let mut tx = state.pool.begin().await.map_err(ApiError::from)?;

    let asset_tag = request
        .asset_tag
        .clone()
        .unwrap_or_else(|| format!("AUTO-{}", request.serial_number));
    let device_name = request
        .device_name
        .clone()
        .unwrap_or_else(|| format!("Device-{}", request.serial_number));

    let device = device_repo
        .upsert_by_serial(&mut tx, &request.serial_number, &asset_tag, &device_name)
        .await?;

    if device.is_registered && device.agent_installed {
        return Err(ApiError::AlreadyRegistered(
            "Device already registered".to_string(),
        ));
    }

    let (agent_token, _jti) = state
        .jwt
        .generate_agent_token(device.id)
        .map_err(ApiError::from)?;
    let token_hash = sha256_hex(&agent_token);

    let input = RegistrationInput {
        device_name: request.device_name.clone(),
        manufacturer: request.manufacturer.clone(),
        model: request.model.clone(),
        os_name: request.os_name.clone(),
        os_version: request.os_version.clone(),
        mac_address: request.mac_address.clone(),
        agent_version: request.agent_version.clone(),
    };
    device_repo
        .complete_registration(&mut tx, device.id, &input, &token_hash)
        .await?;

    tx.commit().await.map_err(ApiError::from)?;

    info!(
        device_id = %device.id,
        serial_number = %request.serial_number,
        "Agent registered"
    );

    Ok(Json(RegistrationResponse {
        device_id: device.id,
        agent_token,
        message: "Device registered successfully. Store the token securely.".to_string(),
    }))
}

/// Receive a status/location ping and return pending commands.
///
/// POST /api/v1/agent/ping
pub async fn ping(
    State(state): State<AppState>,
    agent: AgentAuth,
    Json(request): Json<AgentPingRequest>,
) -> Result<Json<PingResponse>, ApiError> {
    request.validate()?;

    let orchestrator = PingOrchestrator::new(
        state.pool.clone(),
        state.config.agent.command_batch_size,
    );
    let response = orchestrator.process(agent.device_id, &request).await?;

    Ok(Json(response))
}

/// Record the outcome of a previously delivered command.
///
/// POST /api/v1/agent/command-result
///
/// A `failed` outcome is a successful recording, not a protocol error.
pub async fn command_result(
    State(state): State<AppState>,
    agent: AgentAuth,
    Json(request): Json<ReportResultRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command_repo = CommandRepository::new(state.pool.clone());

    let command = command_repo
        .report_result(
            request.command_id,
            agent.device_id,
            request.status,
            request.result.as_deref(),
            request.error_message.as_deref(),
            request.screenshot_data.as_deref(),
        )
        .await?;

    info!(
        command_id = %command.id,
        device_id = %agent.device_id,
        status = command.status.as_str(),
        "Command result recorded"
    );

    Ok(Json(command.into()))
}

/// Upload a screenshot, attached to a pending request or standalone.
///
/// POST /api/v1/agent/screenshot
pub async fn screenshot(
    State(state): State<AppState>,
    agent: AgentAuth,
    Json(request): Json<ScreenshotUploadRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    base64::engine::general_purpose::STANDARD
        .decode(&request.screenshot_data)
        .map_err(|_| ApiError::Validation("screenshotData must be valid base64".to_string()))?;

    let command_repo = CommandRepository::new(state.pool.clone());

    let command = match request.command_id {
        // Attach to the requesting command and complete it
        Some(command_id) => {
            command_repo
                .report_result(
                    command_id,
                    agent.device_id,
                    CommandResult::Executed,
                    None,
                    None,
                    Some(&request.screenshot_data),
                )
                .await?
        }
        // Unsolicited screenshot: record it as an already-executed command
        None => {
            let entity = command_repo
                .create_completed_screenshot(agent.device_id, &request.screenshot_data)
                .await?;
            RemoteCommand::from(entity)
        }
    };

    Ok(Json(command.into()))
}

/// Current device status as seen by the server.
///
/// GET /api/v1/agent/status
pub async fn status(
    State(state): State<AppState>,
    agent: AgentAuth,
) -> Result<Json<AgentStatusResponse>, ApiError> {
    let device_repo = DeviceRepository::new(state.pool.clone());
    let device: Device = device_repo
        .find_by_id(agent.device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
        .into();

    Ok(Json(AgentStatusResponse {
        device_id: device.id,
        asset_tag: device.asset_tag,
        status: device.status,
        is_locked: device.is_locked,
        is_wiped: device.is_wiped,
        lock_reason: device.lock_reason,
        server_time: Utc::now(),
    }))
}

//! The agent ping protocol driver.
//!
//! Each inbound ping runs as one database transaction: status update,
//! location sample, geofence evaluation with alert dedup, and command
//! queue drain either all commit together or none do. A device never
//! observes partial state (a stored location with a lost alert, say).
//!
//! The transaction opens with a locking read on the device row, which
//! serializes concurrent pings from the same device while pings from
//! different devices proceed fully in parallel.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use domain::models::command::{
    CommandInfo, DeliveredCommandKind, PingResponse, RemoteCommand,
};
use domain::models::device::{AgentPingRequest, Device, DeviceStatus};
use domain::services::geofence;
use persistence::repositories::{
    AlertRepository, CommandRepository, DeviceRepository, GeofenceRepository, LocationInput,
    LocationRepository,
};

use crate::error::ApiError;

/// Drives the single request/response ping cycle.
pub struct PingOrchestrator {
    pool: PgPool,
    command_batch_size: i64,
}

impl PingOrchestrator {
    /// Creates a new orchestrator.
    pub fn new(pool: PgPool, command_batch_size: i64) -> Self {
        Self {
            pool,
            command_batch_size,
        }
    }

    /// Process one authenticated ping.
    ///
    /// `device_id` comes from the validated agent token. `NotFound` covers
    /// the post-auth deletion race where the token still validates but the
    /// record is gone.
    pub async fn process(
        &self,
        device_id: Uuid,
        request: &AgentPingRequest,
    ) -> Result<PingResponse, ApiError> {
        let device_repo = DeviceRepository::new(self.pool.clone());
        let location_repo = LocationRepository::new(self.pool.clone());
        let geofence_repo = GeofenceRepository::new(self.pool.clone());
        let alert_repo = AlertRepository::new(self.pool.clone());
        let command_repo = CommandRepository::new(self.pool.clone());

        let mut tx = self.pool.begin().await.map_err(ApiError::from)?;

        // Per-device serialization point
        let device: Device = device_repo
            .lock_by_id(&mut tx, device_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Device not found".to_string()))?
            .into();

        // Wiped is terminal; everything else comes back online on ping
        let status = if device.is_wiped {
            DeviceStatus::Wiped
        } else {
            DeviceStatus::Online
        };

        device_repo
            .record_ping(
                &mut tx,
                device_id,
                status.as_str(),
                &request.agent_version,
                request.ip_address.as_deref(),
                request.network_name.as_deref(),
            )
            .await?;

        if let Some((latitude, longitude)) = request.coordinate() {
            let input = LocationInput {
                device_id,
                latitude,
                longitude,
                accuracy: request.accuracy,
                altitude: request.altitude,
                source: request.location_source.as_str().to_string(),
                ip_address: request.ip_address.clone(),
                network_name: request.network_name.clone(),
                battery_level: request.battery_level,
                is_charging: request.is_charging,
                captured_at: Utc::now(),
            };
            location_repo.insert_sample(&mut tx, &input).await?;

            device_repo
                .update_last_location(
                    &mut tx,
                    device_id,
                    latitude,
                    longitude,
                    request.accuracy,
                    request.location_source.as_str(),
                )
                .await?;

            // Zones are filtered (active + department scope) before the
            // evaluator runs; the dedup set is read inside this transaction
            // so a concurrent ping cannot double-insert
            let zones: Vec<_> = geofence_repo
                .find_applicable(&mut tx, device.department.as_deref())
                .await?
                .into_iter()
                .filter_map(|e| e.into_model())
                .collect();

            let open_alerts = alert_repo.open_geofence_keys(&mut tx, device_id).await?;

            let drafts =
                geofence::evaluate(&device.asset_tag, latitude, longitude, &zones, &open_alerts);

            for draft in &drafts {
                alert_repo.insert_draft(&mut tx, device_id, draft).await?;
            }

            if !drafts.is_empty() {
                info!(
                    device_id = %device_id,
                    alerts = drafts.len(),
                    "Geofence violations detected"
                );
            }
        }

        // No command delivery once wiped
        let drained = if device.is_wiped {
            Vec::new()
        } else {
            command_repo
                .drain_pending(&mut tx, device_id, self.command_batch_size)
                .await?
        };

        tx.commit().await.map_err(ApiError::from)?;

        if !drained.is_empty() {
            info!(
                device_id = %device_id,
                count = drained.len(),
                "Commands delivered"
            );
        }

        Ok(build_ping_response(&device, drained))
    }
}

/// Assembles the ping response, merging legacy lock/wipe pseudo-commands
/// from the device flags into the drained batch.
///
/// The flags are a deliberate redundant channel: older delivery paths set
/// `is_locked`/`is_wiped` directly, and agents predating the structured
/// queue only understand the single `command` field, which carries the
/// first entry of the batch.
pub fn build_ping_response(device: &Device, drained: Vec<RemoteCommand>) -> PingResponse {
    let mut commands: Vec<CommandInfo> = drained.iter().map(CommandInfo::from_command).collect();

    if device.is_wiped {
        // Terminal state: the only thing a wiped device ever hears again
        commands = vec![CommandInfo::pseudo(
            DeliveredCommandKind::Wipe,
            Some("Remote wipe requested"),
        )];
    } else if device.is_locked
        && !commands
            .iter()
            .any(|c| c.kind == DeliveredCommandKind::Lock)
    {
        let reason = device.lock_reason.as_deref().unwrap_or("Device lock requested");
        commands.insert(0, CommandInfo::pseudo(DeliveredCommandKind::Lock, Some(reason)));
    }

    let first = commands.first();
    let message = match first.map(|c| c.kind) {
        Some(DeliveredCommandKind::Wipe) => Some("Remote wipe requested".to_string()),
        Some(DeliveredCommandKind::Lock) => Some(
            device
                .lock_reason
                .clone()
                .unwrap_or_else(|| "Device lock requested".to_string()),
        ),
        _ => None,
    };

    PingResponse {
        command: first.map(|c| c.kind),
        command_id: first.and_then(|c| c.id),
        message,
        commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::models::command::{CommandStatus, CommandType};
    use domain::models::device::DeviceType;

    fn test_device() -> Device {
        Device {
            id: Uuid::new_v4(),
            serial_number: "SN-1".to_string(),
            asset_tag: "AT-1".to_string(),
            device_name: None,
            device_type: DeviceType::Laptop,
            manufacturer: None,
            model: None,
            os_name: None,
            os_version: None,
            mac_address: None,
            employee_name: None,
            department: None,
            status: DeviceStatus::Online,
            is_registered: true,
            agent_installed: true,
            agent_version: Some("2.0.0".to_string()),
            last_latitude: None,
            last_longitude: None,
            last_location_accuracy: None,
            last_location_source: None,
            last_ip_address: None,
            network_name: None,
            last_seen: None,
            is_locked: false,
            lock_reason: None,
            is_wiped: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            registered_at: None,
        }
    }

    fn sent_command(command_type: CommandType) -> RemoteCommand {
        RemoteCommand {
            id: Uuid::new_v4(),
            device_id: Uuid::new_v4(),
            command_type,
            status: CommandStatus::Sent,
            payload: None,
            message: None,
            result: None,
            error_message: None,
            screenshot_data: None,
            created_by: None,
            created_at: Utc::now(),
            sent_at: Some(Utc::now()),
            executed_at: None,
        }
    }

    #[test]
    fn test_empty_queue_yields_empty_response() {
        let response = build_ping_response(&test_device(), Vec::new());
        assert!(response.command.is_none());
        assert!(response.command_id.is_none());
        assert!(response.message.is_none());
        assert!(response.commands.is_empty());
    }

    #[test]
    fn test_first_command_is_primary() {
        let first = sent_command(CommandType::Restart);
        let second = sent_command(CommandType::Screenshot);
        let response = build_ping_response(&test_device(), vec![first.clone(), second]);

        assert_eq!(response.command, Some(DeliveredCommandKind::Restart));
        assert_eq!(response.command_id, Some(first.id));
        assert_eq!(response.commands.len(), 2);
    }

    #[test]
    fn test_locked_device_gets_lock_pseudo_command_first() {
        let mut device = test_device();
        device.is_locked = true;
        device.lock_reason = Some("Reported stolen".to_string());

        let response = build_ping_response(&device, vec![sent_command(CommandType::Screenshot)]);

        assert_eq!(response.commands.len(), 2);
        assert_eq!(response.commands[0].kind, DeliveredCommandKind::Lock);
        assert!(response.commands[0].id.is_none());
        assert_eq!(response.command, Some(DeliveredCommandKind::Lock));
        assert_eq!(response.message.as_deref(), Some("Reported stolen"));
    }

    #[test]
    fn test_lock_pseudo_command_not_duplicated() {
        let mut device = test_device();
        device.is_locked = true;

        // A structured lock command is already in the batch
        let lock = sent_command(CommandType::Lock);
        let response = build_ping_response(&device, vec![lock.clone()]);

        assert_eq!(response.commands.len(), 1);
        assert_eq!(response.commands[0].id, Some(lock.id));
    }

    #[test]
    fn test_wiped_device_gets_only_wipe() {
        let mut device = test_device();
        device.is_wiped = true;

        // Even with drained commands the wiped device hears only the wipe
        let response = build_ping_response(&device, vec![sent_command(CommandType::Restart)]);

        assert_eq!(response.commands.len(), 1);
        assert_eq!(response.commands[0].kind, DeliveredCommandKind::Wipe);
        assert!(response.commands[0].id.is_none());
        assert_eq!(response.command, Some(DeliveredCommandKind::Wipe));
        assert_eq!(response.message.as_deref(), Some("Remote wipe requested"));
    }

    #[test]
    fn test_locked_device_default_reason() {
        let mut device = test_device();
        device.is_locked = true;

        let response = build_ping_response(&device, Vec::new());
        assert_eq!(response.message.as_deref(), Some("Device lock requested"));
    }

    #[test]
    fn test_unlocked_device_with_commands_has_no_message() {
        let response = build_ping_response(&test_device(), vec![sent_command(CommandType::Restart)]);
        assert!(response.message.is_none());
    }
}

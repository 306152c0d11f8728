//! Remote command domain model and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of queued remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Lock,
    Unlock,
    Restart,
    Shutdown,
    Screenshot,
    Message,
    Execute,
}

impl CommandType {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Lock => "lock",
            CommandType::Unlock => "unlock",
            CommandType::Restart => "restart",
            CommandType::Shutdown => "shutdown",
            CommandType::Screenshot => "screenshot",
            CommandType::Message => "message",
            CommandType::Execute => "execute",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lock" => Some(CommandType::Lock),
            "unlock" => Some(CommandType::Unlock),
            "restart" => Some(CommandType::Restart),
            "shutdown" => Some(CommandType::Shutdown),
            "screenshot" => Some(CommandType::Screenshot),
            "message" => Some(CommandType::Message),
            "execute" => Some(CommandType::Execute),
            _ => None,
        }
    }
}

/// Lifecycle state of a remote command.
///
/// Legal transitions:
/// `Pending -> Sent -> {Executed | Failed}` and `Pending -> Cancelled`.
/// Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Sent,
    Executed,
    Failed,
    Cancelled,
}

impl CommandStatus {
    /// Converts to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Sent => "sent",
            CommandStatus::Executed => "executed",
            CommandStatus::Failed => "failed",
            CommandStatus::Cancelled => "cancelled",
        }
    }

    /// Parses from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CommandStatus::Pending),
            "sent" => Some(CommandStatus::Sent),
            "executed" => Some(CommandStatus::Executed),
            "failed" => Some(CommandStatus::Failed),
            "cancelled" => Some(CommandStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CommandStatus::Executed | CommandStatus::Failed | CommandStatus::Cancelled
        )
    }

    /// Whether the transition to `next` is legal.
    pub fn can_transition_to(&self, next: CommandStatus) -> bool {
        match (self, next) {
            (CommandStatus::Pending, CommandStatus::Sent) => true,
            (CommandStatus::Pending, CommandStatus::Cancelled) => true,
            (CommandStatus::Sent, CommandStatus::Executed) => true,
            (CommandStatus::Sent, CommandStatus::Failed) => true,
            _ => false,
        }
    }
}

/// A unit of work queued for a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommand {
    pub id: Uuid,
    pub device_id: Uuid,
    pub command_type: CommandType,
    pub status: CommandStatus,
    pub payload: Option<serde_json::Value>,
    pub message: Option<String>,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub screenshot_data: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Request payload for creating a command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommandRequest {
    pub device_id: Uuid,
    pub command_type: CommandType,
    pub payload: Option<serde_json::Value>,
    pub message: Option<String>,
}

/// Outcome an agent reports for a sent command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandResult {
    Executed,
    Failed,
}

impl CommandResult {
    /// The terminal status this result maps to.
    pub fn final_status(&self) -> CommandStatus {
        match self {
            CommandResult::Executed => CommandStatus::Executed,
            CommandResult::Failed => CommandStatus::Failed,
        }
    }
}

/// Request payload for reporting a command result.
///
/// A `failed` status here is not a protocol error: it is a successful
/// recording of a failed outcome, stored for operator visibility.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResultRequest {
    pub command_id: Uuid,
    pub status: CommandResult,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub screenshot_data: Option<String>,
}

/// Request payload for uploading a screenshot out of band.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotUploadRequest {
    pub screenshot_data: String,
    pub command_id: Option<Uuid>,
}

/// Commands as delivered to an agent.
///
/// Covers every queued command type plus the wipe pseudo-command that is
/// surfaced from the device wipe flag rather than the structured queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveredCommandKind {
    Lock,
    Unlock,
    Restart,
    Shutdown,
    Screenshot,
    Message,
    Execute,
    Wipe,
}

impl DeliveredCommandKind {
    /// Legacy single-command wire tag for old agents.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveredCommandKind::Lock => "lock",
            DeliveredCommandKind::Unlock => "unlock",
            DeliveredCommandKind::Restart => "restart",
            DeliveredCommandKind::Shutdown => "shutdown",
            DeliveredCommandKind::Screenshot => "screenshot",
            DeliveredCommandKind::Message => "message",
            DeliveredCommandKind::Execute => "execute",
            DeliveredCommandKind::Wipe => "wipe",
        }
    }
}

impl From<CommandType> for DeliveredCommandKind {
    fn from(t: CommandType) -> Self {
        match t {
            CommandType::Lock => DeliveredCommandKind::Lock,
            CommandType::Unlock => DeliveredCommandKind::Unlock,
            CommandType::Restart => DeliveredCommandKind::Restart,
            CommandType::Shutdown => DeliveredCommandKind::Shutdown,
            CommandType::Screenshot => DeliveredCommandKind::Screenshot,
            CommandType::Message => DeliveredCommandKind::Message,
            CommandType::Execute => DeliveredCommandKind::Execute,
        }
    }
}

/// One entry of the command batch delivered in a ping response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    /// `None` for legacy lock/wipe pseudo-commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: DeliveredCommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl CommandInfo {
    /// Builds a delivery entry from a drained queue command.
    ///
    /// Message-type commands carry their human message inside the payload
    /// so single-payload agents need no second field.
    pub fn from_command(command: &RemoteCommand) -> Self {
        let payload = command.payload.clone().or_else(|| {
            command
                .message
                .as_ref()
                .map(|m| serde_json::json!({ "message": m }))
        });

        Self {
            id: Some(command.id),
            kind: command.command_type.into(),
            payload,
        }
    }

    /// Builds a legacy pseudo-command entry from device flags.
    pub fn pseudo(kind: DeliveredCommandKind, message: Option<&str>) -> Self {
        Self {
            id: None,
            kind,
            payload: message.map(|m| serde_json::json!({ "message": m })),
        }
    }
}

/// Response payload for the agent ping.
///
/// `command`/`command_id`/`message` form the legacy single-command channel
/// for agents that only understand one command at a time; `commands` is the
/// full drained batch.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<DeliveredCommandKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub commands: Vec<CommandInfo>,
}

/// Response payload for command views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub command_type: CommandType,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_data: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

impl From<RemoteCommand> for CommandResponse {
    fn from(c: RemoteCommand) -> Self {
        Self {
            id: c.id,
            device_id: c.device_id,
            command_type: c.command_type,
            status: c.status,
            payload: c.payload,
            message: c.message,
            result: c.result,
            error_message: c.error_message,
            screenshot_data: c.screenshot_data,
            created_at: c.created_at,
            sent_at: c.sent_at,
            executed_at: c.executed_at,
        }
    }
}

/// Response for listing commands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandListResponse {
    pub commands: Vec<CommandResponse>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_command(status: CommandStatus) -> RemoteCommand {
        RemoteCommand {
            id: Uuid::new_v4(),
            device_id: Uuid::new_v4(),
            command_type: CommandType::Restart,
            status,
            payload: None,
            message: None,
            result: None,
            error_message: None,
            screenshot_data: None,
            created_by: Some(Uuid::new_v4()),
            created_at: Utc::now(),
            sent_at: None,
            executed_at: None,
        }
    }

    #[test]
    fn test_command_type_roundtrip() {
        for ty in [
            CommandType::Lock,
            CommandType::Unlock,
            CommandType::Restart,
            CommandType::Shutdown,
            CommandType::Screenshot,
            CommandType::Message,
            CommandType::Execute,
        ] {
            assert_eq!(CommandType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(CommandType::parse("wipe"), None);
    }

    #[test]
    fn test_command_status_roundtrip() {
        for status in [
            CommandStatus::Pending,
            CommandStatus::Sent,
            CommandStatus::Executed,
            CommandStatus::Failed,
            CommandStatus::Cancelled,
        ] {
            assert_eq!(CommandStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_legal_transitions() {
        assert!(CommandStatus::Pending.can_transition_to(CommandStatus::Sent));
        assert!(CommandStatus::Pending.can_transition_to(CommandStatus::Cancelled));
        assert!(CommandStatus::Sent.can_transition_to(CommandStatus::Executed));
        assert!(CommandStatus::Sent.can_transition_to(CommandStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        // No skipping the sent state
        assert!(!CommandStatus::Pending.can_transition_to(CommandStatus::Executed));
        assert!(!CommandStatus::Pending.can_transition_to(CommandStatus::Failed));
        // Sent commands cannot be cancelled; the device may already be executing
        assert!(!CommandStatus::Sent.can_transition_to(CommandStatus::Cancelled));
        // Terminal states never change
        for terminal in [
            CommandStatus::Executed,
            CommandStatus::Failed,
            CommandStatus::Cancelled,
        ] {
            for next in [
                CommandStatus::Pending,
                CommandStatus::Sent,
                CommandStatus::Executed,
                CommandStatus::Failed,
                CommandStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        // No self-loops or reverse edges
        assert!(!CommandStatus::Sent.can_transition_to(CommandStatus::Pending));
        assert!(!CommandStatus::Pending.can_transition_to(CommandStatus::Pending));
    }

    #[test]
    fn test_is_terminal() {
        assert!(!CommandStatus::Pending.is_terminal());
        assert!(!CommandStatus::Sent.is_terminal());
        assert!(CommandStatus::Executed.is_terminal());
        assert!(CommandStatus::Failed.is_terminal());
        assert!(CommandStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_command_result_final_status() {
        assert_eq!(
            CommandResult::Executed.final_status(),
            CommandStatus::Executed
        );
        assert_eq!(CommandResult::Failed.final_status(), CommandStatus::Failed);
    }

    #[test]
    fn test_command_info_from_command_with_payload() {
        let mut command = test_command(CommandStatus::Sent);
        command.command_type = CommandType::Execute;
        command.payload = Some(serde_json::json!({"script": "uptime"}));

        let info = CommandInfo::from_command(&command);
        assert_eq!(info.id, Some(command.id));
        assert_eq!(info.kind, DeliveredCommandKind::Execute);
        assert_eq!(info.payload, command.payload);
    }

    #[test]
    fn test_command_info_message_becomes_payload() {
        let mut command = test_command(CommandStatus::Sent);
        command.command_type = CommandType::Message;
        command.message = Some("Return the laptop to IT".to_string());

        let info = CommandInfo::from_command(&command);
        assert_eq!(info.kind, DeliveredCommandKind::Message);
        assert_eq!(
            info.payload,
            Some(serde_json::json!({"message": "Return the laptop to IT"}))
        );
    }

    #[test]
    fn test_pseudo_command_has_no_id() {
        let info = CommandInfo::pseudo(DeliveredCommandKind::Wipe, None);
        assert!(info.id.is_none());
        assert_eq!(info.kind, DeliveredCommandKind::Wipe);
        assert!(info.payload.is_none());
    }

    #[test]
    fn test_delivered_kind_covers_every_command_type() {
        for ty in [
            CommandType::Lock,
            CommandType::Unlock,
            CommandType::Restart,
            CommandType::Shutdown,
            CommandType::Screenshot,
            CommandType::Message,
            CommandType::Execute,
        ] {
            let kind: DeliveredCommandKind = ty.into();
            assert_eq!(kind.as_str(), ty.as_str());
        }
    }

    #[test]
    fn test_ping_response_serialization() {
        let command = test_command(CommandStatus::Sent);
        let info = CommandInfo::from_command(&command);
        let response = PingResponse {
            command: Some(info.kind),
            command_id: info.id,
            message: None,
            commands: vec![info],
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"command\":\"restart\""));
        assert!(json.contains("\"commands\":[{"));
        assert!(json.contains("\"type\":\"restart\""));
    }

    #[test]
    fn test_ping_response_empty() {
        let response = PingResponse::default();
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, "{\"commands\":[]}");
    }

    #[test]
    fn test_report_result_deserialization() {
        let json = r#"{
            "commandId": "550e8400-e29b-41d4-a716-446655440000",
            "status": "failed",
            "errorMessage": "screen already locked"
        }"#;

        let request: ReportResultRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.status, CommandResult::Failed);
        assert_eq!(request.error_message.as_deref(), Some("screen already locked"));
    }
}

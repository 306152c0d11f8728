//! Remote command entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::command::{CommandStatus, CommandType, RemoteCommand};

/// Database row mapping for the remote_commands table.
#[derive(Debug, Clone, FromRow)]
pub struct RemoteCommandEntity {
    pub id: Uuid,
    pub device_id: Uuid,
    pub command_type: String,
    pub status: String,
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

impl From<RemoteCommandEntity> for RemoteCommand {
    fn from(e: RemoteCommandEntity) -> Self {
        Self {
            id: e.id,
            device_id: e.device_id,
            command_type: CommandType::parse(&e.command_type).unwrap_or(CommandType::Message),
            status: CommandStatus::parse(&e.status).unwrap_or(CommandStatus::Pending),
            payload: e.payload,
            message: e.message,
            result: e.result,
            error_message: e.error_message,
            screenshot_data: e.screenshot_data,
            created_by: e.created_by,
            created_at: e.created_at,
            sent_at: e.sent_at,
            executed_at: e.executed_at,
        }
    }
}

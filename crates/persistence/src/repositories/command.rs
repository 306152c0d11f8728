//! Remote command repository: the command queue lifecycle.
//!
//! All state transitions go through locking reads so that concurrent pings,
//! result reports, and operator cancellations for the same device serialize
//! on the command rows instead of racing.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use domain::models::command::{CommandResult, CommandStatus, CommandType, RemoteCommand};

use crate::entities::RemoteCommandEntity;
use crate::metrics::QueryTimer;

const COMMAND_COLUMNS: &str = "id, device_id, command_type, status, payload, message, \
     result, error_message, screenshot_data, created_by, created_at, sent_at, executed_at";

/// Error type for command queue operations.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Command not found")]
    NotFound,

    #[error("Command belongs to another device")]
    Forbidden,

    #[error("Illegal command transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: CommandStatus,
        to: CommandStatus,
    },
}

/// Repository for remote command operations.
#[derive(Debug, Clone)]
pub struct CommandRepository {
    pool: PgPool,
}

impl CommandRepository {
    /// Creates a new CommandRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new command in the pending state.
    ///
    /// Multiple pending commands of the same type may coexist; there is no
    /// uniqueness constraint on (device, type).
    pub async fn create(
        &self,
        device_id: Uuid,
        command_type: CommandType,
        payload: Option<&serde_json::Value>,
        message: Option<&str>,
        created_by: Option<Uuid>,
    ) -> Result<RemoteCommandEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_command");

        let result = sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            r#"
            INSERT INTO remote_commands (device_id, command_type, status, payload, message, created_by)
            VALUES ($1, $2, 'pending', $3, $4, $5)
            RETURNING {COMMAND_COLUMNS}
            "#,
        ))
        .bind(device_id)
        .bind(command_type.as_str())
        .bind(payload)
        .bind(message)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Get a command by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RemoteCommandEntity>, sqlx::Error> {
        sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            "SELECT {COMMAND_COLUMNS} FROM remote_commands WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Atomically drain up to `max_batch` pending commands for a device,
    /// oldest first, transitioning each to sent.
    ///
    /// Runs inside the caller's transaction with a locking read, so two
    /// concurrent pings from the same device (a retry after timeout, say)
    /// can never both receive the same command. The second transaction
    /// blocks on the row locks and, once the first commits, no longer sees
    /// the rows as pending.
    pub async fn drain_pending(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        device_id: Uuid,
        max_batch: i64,
    ) -> Result<Vec<RemoteCommand>, sqlx::Error> {
        let timer = QueryTimer::new("drain_pending_commands");

        let rows = sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            r#"
            SELECT {COMMAND_COLUMNS}
            FROM remote_commands
            WHERE device_id = $1 AND status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT $2
            FOR UPDATE
            "#,
        ))
        .bind(device_id)
        .bind(max_batch)
        .fetch_all(&mut **tx)
        .await?;

        if rows.is_empty() {
            timer.record();
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let sent_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE remote_commands
            SET status = 'sent', sent_at = $2
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .bind(sent_at)
        .execute(&mut **tx)
        .await?;

        timer.record();

        Ok(rows
            .into_iter()
            .map(|mut entity| {
                entity.status = CommandStatus::Sent.as_str().to_string();
                entity.sent_at = Some(sent_at);
                entity.into()
            })
            .collect())
    }

    /// Record the outcome an agent reports for a sent command.
    ///
    /// The command must belong to the calling device and must currently be
    /// sent; anything else is rejected before any write happens.
    pub async fn report_result(
        &self,
        command_id: Uuid,
        device_id: Uuid,
        outcome: CommandResult,
        result: Option<&str>,
        error_message: Option<&str>,
        screenshot_data: Option<&str>,
    ) -> Result<RemoteCommand, CommandError> {
        let timer = QueryTimer::new("report_command_result");
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            "SELECT {COMMAND_COLUMNS} FROM remote_commands WHERE id = $1 FOR UPDATE",
        ))
        .bind(command_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CommandError::NotFound)?;

        if entity.device_id != device_id {
            return Err(CommandError::Forbidden);
        }

        let current = CommandStatus::parse(&entity.status).unwrap_or(CommandStatus::Pending);
        let next = outcome.final_status();
        if !current.can_transition_to(next) {
            return Err(CommandError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        let updated = sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            r#"
            UPDATE remote_commands
            SET status = $2,
                result = $3,
                error_message = $4,
                screenshot_data = COALESCE($5, screenshot_data),
                executed_at = NOW()
            WHERE id = $1
            RETURNING {COMMAND_COLUMNS}
            "#,
        ))
        .bind(command_id)
        .bind(next.as_str())
        .bind(result)
        .bind(error_message)
        .bind(screenshot_data)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(updated.into())
    }

    /// Cancel a pending command (operator action).
    ///
    /// Only legal from pending. A cancel racing a drain is settled by
    /// transaction ordering: whichever commits first wins, and the loser
    /// sees `InvalidTransition`.
    pub async fn cancel(&self, command_id: Uuid) -> Result<RemoteCommand, CommandError> {
        let timer = QueryTimer::new("cancel_command");
        let mut tx = self.pool.begin().await?;

        let entity = sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            "SELECT {COMMAND_COLUMNS} FROM remote_commands WHERE id = $1 FOR UPDATE",
        ))
        .bind(command_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CommandError::NotFound)?;

        let current = CommandStatus::parse(&entity.status).unwrap_or(CommandStatus::Pending);
        if !current.can_transition_to(CommandStatus::Cancelled) {
            return Err(CommandError::InvalidTransition {
                from: current,
                to: CommandStatus::Cancelled,
            });
        }

        let updated = sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            r#"
            UPDATE remote_commands
            SET status = 'cancelled'
            WHERE id = $1
            RETURNING {COMMAND_COLUMNS}
            "#,
        ))
        .bind(command_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(updated.into())
    }

    /// Record a screenshot that arrived without a matching request as a
    /// synthetic, already-executed screenshot command.
    pub async fn create_completed_screenshot(
        &self,
        device_id: Uuid,
        screenshot_data: &str,
    ) -> Result<RemoteCommandEntity, sqlx::Error> {
        sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            r#"
            INSERT INTO remote_commands (device_id, command_type, status, screenshot_data, sent_at, executed_at)
            VALUES ($1, 'screenshot', 'executed', $2, NOW(), NOW())
            RETURNING {COMMAND_COLUMNS}
            "#,
        ))
        .bind(device_id)
        .bind(screenshot_data)
        .fetch_one(&self.pool)
        .await
    }

    /// List commands for a device, newest first, optionally filtered by status.
    pub async fn list_for_device(
        &self,
        device_id: Uuid,
        status: Option<CommandStatus>,
        limit: i64,
    ) -> Result<Vec<RemoteCommandEntity>, sqlx::Error> {
        sqlx::query_as::<_, RemoteCommandEntity>(&format!(
            r#"
            SELECT {COMMAND_COLUMNS}
            FROM remote_commands
            WHERE device_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        ))
        .bind(device_id)
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Count pending commands for a device.
    pub async fn count_pending(&self, device_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM remote_commands
            WHERE device_id = $1 AND status = 'pending'
            "#,
        )
        .bind(device_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}

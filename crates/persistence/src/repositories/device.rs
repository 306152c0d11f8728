//! Device repository for database operations.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::DeviceEntity;
use crate::metrics::QueryTimer;

const DEVICE_COLUMNS: &str = "id, serial_number, asset_tag, device_name, device_type, \
     manufacturer, model, os_name, os_version, mac_address, employee_name, department, \
     status, is_registered, agent_installed, agent_version, last_latitude, last_longitude, \
     last_location_accuracy, last_location_source, last_ip_address, network_name, last_seen, \
     is_locked, lock_reason, is_wiped, agent_token_hash, created_at, updated_at, registered_at";

/// Fields an agent supplies at registration time.
#[derive(Debug, Clone, Default)]
pub struct RegistrationInput {
    pub device_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub mac_address: Option<String>,
    pub agent_version: String,
}

/// Repository for device-related database operations.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a device by its UUID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Find and lock a device row for the duration of the transaction.
    ///
    /// This is the per-device serialization point: every ping, and every
    /// mutation that must not race a ping, locks the row first. Cross-device
    /// operations proceed fully in parallel.
    pub async fn lock_by_id(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1 FOR UPDATE",
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Upsert a device row by serial number, locking it against concurrent
    /// registrations of the same serial.
    ///
    /// Auto-provisions an offline, unregistered record when the serial is
    /// new; otherwise returns the existing row unchanged.
    pub async fn upsert_by_serial(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        serial_number: &str,
        asset_tag: &str,
        device_name: &str,
    ) -> Result<DeviceEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_device_by_serial");

        let result = sqlx::query_as::<_, DeviceEntity>(&format!(
            r#"
            INSERT INTO devices (serial_number, asset_tag, device_name, device_type, status)
            VALUES ($1, $2, $3, 'laptop', 'offline')
            ON CONFLICT (serial_number) DO UPDATE SET updated_at = NOW()
            RETURNING {DEVICE_COLUMNS}
            "#,
        ))
        .bind(serial_number)
        .bind(asset_tag)
        .bind(device_name)
        .fetch_one(&mut **tx)
        .await;

        timer.record();
        result
    }

    /// Mark a device registered: stores the agent details and the token
    /// fingerprint, flips the registration flags, and brings it online.
    pub async fn complete_registration(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        input: &RegistrationInput,
        agent_token_hash: &str,
    ) -> Result<DeviceEntity, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            r#"
            UPDATE devices
            SET device_name = COALESCE($2, device_name),
                manufacturer = COALESCE($3, manufacturer),
                model = COALESCE($4, model),
                os_name = $5,
                os_version = $6,
                mac_address = $7,
                agent_version = $8,
                agent_installed = true,
                is_registered = true,
                registered_at = NOW(),
                status = 'online',
                last_seen = NOW(),
                agent_token_hash = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(input.device_name.as_deref())
        .bind(input.manufacturer.as_deref())
        .bind(input.model.as_deref())
        .bind(input.os_name.as_deref())
        .bind(input.os_version.as_deref())
        .bind(input.mac_address.as_deref())
        .bind(&input.agent_version)
        .bind(agent_token_hash)
        .fetch_one(&mut **tx)
        .await
    }

    /// Record the status/metadata side of a ping.
    pub async fn record_ping(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: &str,
        agent_version: &str,
        ip_address: Option<&str>,
        network_name: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE devices
            SET status = $2,
                last_seen = NOW(),
                agent_version = $3,
                last_ip_address = COALESCE($4, last_ip_address),
                network_name = COALESCE($5, network_name),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(agent_version)
        .bind(ip_address)
        .bind(network_name)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Refresh the cached last-known coordinate.
    pub async fn update_last_location(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        latitude: f64,
        longitude: f64,
        accuracy: Option<f64>,
        source: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE devices
            SET last_latitude = $2,
                last_longitude = $3,
                last_location_accuracy = $4,
                last_location_source = $5,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(latitude)
        .bind(longitude)
        .bind(accuracy)
        .bind(source)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Set the lock flag and reason (operator action, legacy channel).
    pub async fn set_locked(
        &self,
        id: Uuid,
        reason: &str,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            r#"
            UPDATE devices
            SET is_locked = true, lock_reason = $2, status = 'locked', updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
    }

    /// Clear the lock flag. A previously locked device reads offline until
    /// its next ping brings it back online.
    pub async fn set_unlocked(&self, id: Uuid) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            r#"
            UPDATE devices
            SET is_locked = false,
                lock_reason = NULL,
                status = CASE WHEN status = 'locked' THEN 'offline' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Set the wipe flag. Wiped is terminal.
    pub async fn set_wiped(&self, id: Uuid) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            r#"
            UPDATE devices
            SET is_wiped = true, status = 'wiped', updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// List all devices, most recently seen first.
    pub async fn list_all(&self) -> Result<Vec<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY last_seen DESC NULLS LAST",
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Mark online devices that have not pinged within the threshold as
    /// offline, returning the rows that flipped.
    pub async fn sweep_offline(
        &self,
        threshold_secs: i64,
    ) -> Result<Vec<DeviceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("sweep_offline_devices");

        let result = sqlx::query_as::<_, DeviceEntity>(&format!(
            r#"
            UPDATE devices
            SET status = 'offline', updated_at = NOW()
            WHERE status = 'online'
              AND (last_seen IS NULL OR last_seen < NOW() - make_interval(secs => $1))
            RETURNING {DEVICE_COLUMNS}
            "#,
        ))
        .bind(threshold_secs as f64)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Hard-delete a device and (by cascade) its samples, alerts, and
    /// commands. Explicit operator action only.
    pub async fn delete(&self, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

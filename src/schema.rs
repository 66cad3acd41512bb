//! Database schema management for `hydrolog`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `sensor_readings` table shared by the HTTP ingestion
/// endpoint and the CSV importer. Safe to call on every startup; no-op if
/// objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id        SERIAL PRIMARY KEY,
            device_id TEXT        NOT NULL,
            ldr       INTEGER     NOT NULL,
            water     SMALLINT    NOT NULL,
            buzzer    SMALLINT    NOT NULL,
            ts        TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Covers both the latest-N query and the per-device aggregates
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_device_ts
            ON sensor_readings (device_id, ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_ts
            ON sensor_readings (ts);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

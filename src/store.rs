//! Storage gateway for the `sensor_readings` table.
//!
//! [`ReadingStore`] is the persistence contract shared by the HTTP service
//! and the CSV importer; [`PgStore`] implements it over a PostgreSQL pool.
//! Each call is atomic on its own (a multi-row insert commits all rows or
//! none) and checks a connection out of the pool only for its duration, so
//! callers hold no connection state between calls.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use crate::models::{DeviceStats, NormalizedReading, StoredReading};

// ---

/// Failure of a single storage call.
#[derive(Debug, Error)]
pub enum StoreError {
    // ---
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence operations the pipeline needs, independent of the backing
/// engine. The loader and verifier are generic over this trait so tests
/// can substitute an in-memory store.
#[allow(async_fn_in_trait)]
pub trait ReadingStore {
    // ---
    /// Insert a single reading; returns the affected row count.
    async fn insert(
        &self,
        device_id: &str,
        ldr: i32,
        water: i16,
        buzzer: i16,
        ts: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Insert a batch of readings in one atomic statement; returns the
    /// affected row count.
    async fn insert_many(&self, readings: &[NormalizedReading]) -> Result<u64, StoreError>;

    /// Delete every reading for a device; returns the deleted row count.
    async fn delete_by_device(&self, device_id: &str) -> Result<u64, StoreError>;

    /// Fetch the most recent readings, newest first, optionally scoped to
    /// one device.
    async fn query_latest(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<StoredReading>, StoreError>;

    /// Summary aggregates for one device.
    async fn aggregate_stats(&self, device_id: &str) -> Result<DeviceStats, StoreError>;
}

// ---

/// PostgreSQL-backed store over an sqlx connection pool.
#[derive(Clone)]
pub struct PgStore {
    // ---
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReadingStore for PgStore {
    // ---
    async fn insert(
        &self,
        device_id: &str,
        ldr: i32,
        water: i16,
        buzzer: i16,
        ts: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        // ---
        let result = sqlx::query(
            r#"
            INSERT INTO sensor_readings (device_id, ldr, water, buzzer, ts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(device_id)
        .bind(ldr)
        .bind(water)
        .bind(buzzer)
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_many(&self, readings: &[NormalizedReading]) -> Result<u64, StoreError> {
        // ---
        if readings.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO sensor_readings (device_id, ldr, water, buzzer, ts) ");
        builder.push_values(readings, |mut b, r| {
            b.push_bind(&r.device_id)
                .push_bind(r.light_proxy)
                .push_bind(r.water_detected)
                .push_bind(r.buzzer)
                .push_bind(r.timestamp);
        });

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_device(&self, device_id: &str) -> Result<u64, StoreError> {
        // ---
        let result = sqlx::query("DELETE FROM sensor_readings WHERE device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn query_latest(
        &self,
        device_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<StoredReading>, StoreError> {
        // ---
        let rows = match device_id {
            Some(id) => {
                sqlx::query_as::<_, StoredReading>(
                    r#"
                    SELECT id, device_id, ldr, water, buzzer, ts
                    FROM sensor_readings
                    WHERE device_id = $1
                    ORDER BY ts DESC
                    LIMIT $2
                    "#,
                )
                .bind(id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StoredReading>(
                    r#"
                    SELECT id, device_id, ldr, water, buzzer, ts
                    FROM sensor_readings
                    ORDER BY ts DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    async fn aggregate_stats(&self, device_id: &str) -> Result<DeviceStats, StoreError> {
        // ---
        let stats = sqlx::query_as::<_, DeviceStats>(
            r#"
            SELECT
                COUNT(*)                             AS total,
                MIN(ts)                              AS earliest_ts,
                MAX(ts)                              AS latest_ts,
                COUNT(*) FILTER (WHERE buzzer = 1)   AS buzzer_on
            FROM sensor_readings
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

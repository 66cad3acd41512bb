//! Sensor ingestion and query endpoints.
//!
//! `POST /api/v1/sensor` accepts one reading from a device; `GET
//! /api/v1/sensor/latest` serves the newest rows for the dashboard.

use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get,
    routing::post, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::store::{PgStore, ReadingStore};

// ---

pub fn router() -> Router<PgStore> {
    // ---
    Router::new()
        .route("/api/v1/sensor", post(ingest))
        .route("/api/v1/sensor/latest", get(latest))
}

/// One reading as posted by a device.
///
/// `ts` is optional ISO-8601; absent or unparsable values fall back to
/// the current time. Older firmware sends the device under `id`.
#[derive(Debug, Deserialize)]
struct SensorPayload {
    // ---
    device_id: Option<String>,
    id: Option<String>,
    ldr: i32,
    water: i16,
    buzzer: i16,
    ts: Option<String>,
}

/// Handle `POST /api/v1/sensor`.
async fn ingest(
    State(store): State<PgStore>,
    Json(payload): Json<SensorPayload>,
) -> impl IntoResponse {
    // ---
    let Some(device_id) = payload.device_id.or(payload.id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "device_id is required"})),
        );
    };

    let ts = payload
        .ts
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(Utc::now);

    match store
        .insert(&device_id, payload.ldr, payload.water, payload.buzzer, ts)
        .await
    {
        Ok(_) => {
            debug!("Stored reading for device '{device_id}' at {ts}");
            (StatusCode::CREATED, Json(json!({"status": "ok"})))
        }
        Err(e) => {
            error!("Failed to store reading for device '{device_id}': {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Query parameters for the latest-N endpoint.
#[derive(Debug, Deserialize)]
struct LatestQuery {
    // ---
    device_id: Option<String>,
    limit: Option<i64>,
}

/// Handle `GET /api/v1/sensor/latest`.
async fn latest(
    State(store): State<PgStore>,
    Query(params): Query<LatestQuery>,
) -> impl IntoResponse {
    // ---
    let limit = params.limit.unwrap_or(10);

    match store.query_latest(params.device_id.as_deref(), limit).await {
        Ok(rows) => {
            info!("Returning {} readings", rows.len());
            (StatusCode::OK, Json(rows)).into_response()
        }
        Err(e) => {
            error!("Failed to fetch latest readings: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

// ---

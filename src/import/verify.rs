//! Post-import verification: re-read what was just written so the
//! operator can confirm the load. Purely read-only; an empty device is
//! reported, not an error.

use tracing::{info, warn};

use crate::store::{ReadingStore, StoreError};

// ---

/// Fetch and render the most recent readings for a device.
pub async fn verify_latest<S: ReadingStore>(
    store: &S,
    device_id: &str,
    limit: i64,
) -> Result<(), StoreError> {
    // ---
    info!("Verifying upload - fetching latest {limit} records");
    let rows = store.query_latest(Some(device_id), limit).await?;

    if rows.is_empty() {
        warn!("No records found for device '{device_id}'");
        return Ok(());
    }

    info!("Found {} records. Latest entries:", rows.len());
    for row in &rows {
        info!(
            "  #{:<8} {:<15} ldr={:<4} water={} buzzer={} ts={}",
            row.id, row.device_id, row.ldr, row.water, row.buzzer, row.ts
        );
    }

    Ok(())
}

/// Fetch and render summary aggregates for a device.
pub async fn report_stats<S: ReadingStore>(store: &S, device_id: &str) -> Result<(), StoreError> {
    // ---
    let stats = store.aggregate_stats(device_id).await?;

    info!("Database statistics for '{device_id}':");
    info!("  Total records      : {}", stats.total);
    match (stats.earliest_ts, stats.latest_ts) {
        (Some(first), Some(last)) => info!("  Date range         : {first} to {last}"),
        _ => info!("  Date range         : (no rows)"),
    }
    info!("  Buzzer activations : {}", stats.buzzer_on);

    Ok(())
}

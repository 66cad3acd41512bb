//! CSV to database uploader.
//!
//! Bulk-loads a historical sensor CSV export into the `sensor_readings`
//! table, then re-reads the latest rows and summary statistics so the
//! operator can confirm the load.
//!
//! Exit status is non-zero on fatal failure (file missing, purge failed,
//! zero valid records) and when no row was ultimately inserted; a partial
//! import that committed at least one row exits zero.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info};

use hydrolog::import::{self, ImportOptions};
use hydrolog::{config, schema, telemetry, PgStore};

// ---

#[derive(Parser)]
#[command(name = "csv-import")]
#[command(version, about = "Upload a sensor CSV export to the database")]
struct Cli {
    // ---
    /// Path to the CSV export
    #[arg(long, default_value = "sensorWater.csv")]
    file: PathBuf,

    /// Device identifier assigned to every imported record
    #[arg(long, default_value = "csv_import")]
    device_id: String,

    /// Number of records per batch insert
    #[arg(long, default_value_t = 100)]
    batch_size: usize,

    /// Delete existing records for the device before importing
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // ---
    telemetry::init_tracing("info");
    dotenv().ok();

    let cli = Cli::parse();
    if cli.clear {
        info!("Mode: CLEAR existing data before upload");
    }

    let cfg = config::load_from_env()?;

    info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    schema::create_schema(&pool).await?;
    let store = PgStore::new(pool);

    let opts = ImportOptions {
        file: cli.file,
        device_id: cli.device_id,
        batch_size: cli.batch_size,
        clear_existing: cli.clear,
    };

    let report = import::run(&store, &opts).await?;
    report.log_summary();

    if !report.succeeded() {
        error!("Upload failed: no rows inserted");
        return Ok(ExitCode::FAILURE);
    }

    import::verify::verify_latest(&store, &report.device_id, 5).await?;
    import::verify::report_stats(&store, &report.device_id).await?;

    info!("Upload completed successfully");
    Ok(ExitCode::SUCCESS)
}

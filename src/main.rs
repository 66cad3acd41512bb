//! Application entry point for the `hydrolog` backend service.
//!
//! This binary orchestrates the full startup sequence for the sensor data
//! pipeline API, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool
//! - Creating the database schema if it does not exist
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `PORT` (optional) – HTTP listen port (default: 8080)
//! - `LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP) by
//! delegating schema setup to `schema`, configuration parsing to `config`,
//! and route registration to `routes`.

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;

use hydrolog::{config, routes, schema, telemetry, PgStore};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    telemetry::init_tracing("debug");
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(PgStore::new(pool));

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use axum::Router;

use crate::store::PgStore;

mod health;
mod sensor;

// ---

pub fn router(store: PgStore) -> Router {
    // ---
    Router::new()
        .merge(sensor::router())
        .merge(health::router())
        .with_state(store)
}

//! `/gateway` route

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::RealtimeState;

use axum::{routing::get, Router};

/// Gateway routes with their state applied, ready to merge into any router
pub fn routes<S>(state: RealtimeState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/gateway", get(gateway_handler))
        .with_state(state)
}

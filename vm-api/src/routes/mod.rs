pub mod hash;
pub mod health;
pub mod virtual_machines;

use crate::state::AppState;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_app(state: AppState) -> Router {
    // Browser consoles connect from other origins
    let cors = CorsLayer::permissive();

    Router::new()
        .merge(health::routes())
        .merge(hash::routes())
        .merge(virtual_machines::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

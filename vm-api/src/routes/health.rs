use crate::state::AppState;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/1.0/", get(hello))
        .route("/1.0/health", get(health_check))
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "alive": true }))
}

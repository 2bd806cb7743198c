use crate::{error::Envelope, state::AppState};
use axum::{extract::Path, routing::get, Router};
use vm_orchestrator::namespace_for_email;

pub fn routes() -> Router<AppState> {
    Router::new().route("/1.0/hash/{email}", get(project_for_email))
}

/// Project namespace owned by an account email.
async fn project_for_email(Path(email): Path<String>) -> Envelope<String> {
    Envelope::ok(namespace_for_email(&email))
}

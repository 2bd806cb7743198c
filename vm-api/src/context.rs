use crate::{error::ApiError, state::AppState};
use axum::{extract::FromRequestParts, extract::Query, http::request::Parts};
use serde::Deserialize;
use uuid::Uuid;
use vm_cluster::RequestScope;
use vm_orchestrator::VmState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Deserialize)]
struct ContextQuery {
    project: Option<String>,
    state: Option<String>,
}

/// Per-request identity and limits: the target project, a trace id, the `state`
/// flag and the deadline every cluster call inherits.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub project: String,
    pub request_id: String,
    pub state: VmState,
    pub scope: RequestScope,
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Query(query) = Query::<ContextQuery>::try_from_uri(&parts.uri)
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let project = query
            .project
            .filter(|project| !project.is_empty())
            .ok_or_else(|| ApiError::BadRequest("project is required".to_string()))?;

        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let scope = RequestScope::new(project.clone(), request_id.clone(), state.request_timeout);

        Ok(Self {
            project,
            request_id,
            state: VmState::from_flag(query.state.as_deref()),
            scope,
        })
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use vm_cluster::ClusterError;
use vm_orchestrator::OrchestratorError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of every `/1.0` response except hello and health. Absent fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub status: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

fn is_zero(status: &u16) -> bool {
    *status == 0
}

impl<T> Envelope<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            data,
            meta: None,
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, "success", Some(data))
    }

    pub fn ok_empty() -> Self {
        Self::new(StatusCode::OK, "success", None)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Rejected before reaching the cluster.
    BadRequest(String),
    /// Status reported by the cluster, passed through.
    Cluster { code: u16, message: String },
    NotImplemented(String),
    DeadlineExceeded(String),
    /// Serialization, transport and other failures without a cluster status.
    Unprocessable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Cluster { code, .. } => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY)
            }
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::NotImplemented(msg)
            | ApiError::DeadlineExceeded(msg)
            | ApiError::Unprocessable(msg) => msg,
            ApiError::Cluster { message, .. } => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Cluster { code, message } => {
                error!(code, message = %message, "Kubernetes error")
            }
            ApiError::BadRequest(message) => warn!(message = %message, "Rejected request"),
            _ => error!(status = status.as_u16(), message = %self.message(), "Request failed"),
        }

        Envelope::<Value>::new(status, self.message(), None).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        if err.is_not_implemented() {
            return ApiError::NotImplemented(err.to_string());
        }

        match err {
            OrchestratorError::Cluster(ClusterError::Status { code, message, .. }) => {
                ApiError::Cluster { code, message }
            }
            OrchestratorError::Cluster(err @ ClusterError::DeadlineExceeded { .. }) => {
                ApiError::DeadlineExceeded(err.to_string())
            }
            other => ApiError::Unprocessable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_omits_absent_fields() {
        let envelope = Envelope::<Value>::new(StatusCode::BAD_REQUEST, "project is required", None);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "status": 400, "message": "project is required" })
        );

        let envelope = Envelope::ok(json!(["a", "b"]));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "data": ["a", "b"], "status": 200, "message": "success" })
        );
    }

    #[test]
    fn test_cluster_status_passes_through() {
        let err: ApiError = OrchestratorError::Cluster(ClusterError::Status {
            code: 404,
            reason: "NotFound".to_string(),
            message: "virtualmachines.kubevirt.io \"vm1\" not found".to_string(),
        })
        .into();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "virtualmachines.kubevirt.io \"vm1\" not found");
    }

    #[test]
    fn test_error_classification() {
        let not_implemented: ApiError = OrchestratorError::NotImplemented("patch").into();
        assert_eq!(not_implemented.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(not_implemented.message(), "patch is not implemented yet");

        let watch: ApiError =
            OrchestratorError::Cluster(ClusterError::NotImplemented("watch")).into();
        assert_eq!(watch.status(), StatusCode::NOT_IMPLEMENTED);

        let deadline: ApiError = OrchestratorError::Cluster(ClusterError::DeadlineExceeded {
            request_id: "req-1".to_string(),
        })
        .into();
        assert_eq!(deadline.status(), StatusCode::GATEWAY_TIMEOUT);

        let upgrade: ApiError =
            OrchestratorError::Cluster(ClusterError::Upgrade("connection reset".to_string()))
                .into();
        assert_eq!(upgrade.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let invalid: ApiError =
            OrchestratorError::Cluster(ClusterError::InvalidDocument("metadata.name")).into();
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_unknown_cluster_code_is_unprocessable() {
        let err = ApiError::Cluster {
            code: 0,
            message: "no code".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    /// A status the cluster API reported itself. Code, reason and message are kept verbatim.
    #[error("{message}")]
    Status {
        code: u16,
        reason: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[source] kube::Error),

    #[error("Console upgrade failed: {0}")]
    Upgrade(String),

    #[error("Invalid document: missing {0}")]
    InvalidDocument(&'static str),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Cluster configuration error: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("Request {request_id} exceeded its deadline")]
    DeadlineExceeded { request_id: String },

    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(status) => ClusterError::Status {
                code: status.code,
                reason: status.reason.clone(),
                message: status.message.clone(),
            },
            other => ClusterError::Transport(other),
        }
    }
}

impl ClusterError {
    /// Status code reported by the cluster, if this error came from the cluster.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClusterError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ClusterError::Status {
            code: 404,
            reason: "NotFound".to_string(),
            message: "virtualmachines.kubevirt.io \"vm1\" not found".to_string(),
        };

        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(
            err.to_string(),
            "virtualmachines.kubevirt.io \"vm1\" not found"
        );
    }

    #[test]
    fn test_internal_errors_carry_no_status() {
        let err = ClusterError::InvalidDocument("metadata.name");
        assert_eq!(err.status_code(), None);
        assert!(!err.is_not_found());

        let err = ClusterError::NotImplemented("watch");
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "watch is not implemented yet");
    }
}

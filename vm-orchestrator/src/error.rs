use thiserror::Error;
use vm_cluster::ClusterError;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} is not implemented yet")]
    NotImplemented(&'static str),
}

impl OrchestratorError {
    /// Status code reported by the cluster, if the failure came from it.
    pub fn cluster_status(&self) -> Option<u16> {
        match self {
            OrchestratorError::Cluster(err) => err.status_code(),
            _ => None,
        }
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(
            self,
            OrchestratorError::NotImplemented(_)
                | OrchestratorError::Cluster(ClusterError::NotImplemented(_))
        )
    }
}

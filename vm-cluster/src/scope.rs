use crate::error::{ClusterError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Per-request call scope: target namespace, trace id and deadline.
///
/// Built once per inbound request and passed down explicitly; every cluster call
/// made on behalf of the request runs inside [`RequestScope::run`].
#[derive(Debug, Clone)]
pub struct RequestScope {
    namespace: String,
    request_id: String,
    deadline: Instant,
}

impl RequestScope {
    pub fn new(
        namespace: impl Into<String>,
        request_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            request_id: request_id.into(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run a cluster call, failing with [`ClusterError::DeadlineExceeded`] once the
    /// deadline passes. The call future is dropped at that point.
    pub async fn run<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ClusterError::DeadlineExceeded {
                request_id: self.request_id.clone(),
            }),
        }
    }
}

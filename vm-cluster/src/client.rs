//! Construction of the shared cluster client.
//!
//! The client is built once at startup and cloned into every accessor; kube pools
//! connections internally, so it is never rebuilt per request.

use crate::error::Result;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use std::path::Path;
use tracing::{debug, instrument};

/// Connect using an explicit kubeconfig file, or the inferred configuration
/// (`$KUBECONFIG`, `~/.kube/config`, in-cluster service account) when none is given.
#[instrument(skip_all, fields(kubeconfig = ?kubeconfig))]
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };

    client_from_config(config)
}

/// Build the shared client. Request deadlines are enforced per call by
/// [`RequestScope::run`](crate::RequestScope::run); the transport read timeout is
/// cleared because upgraded console connections reuse the same socket and a quiet
/// console must stay open.
pub fn client_from_config(mut config: Config) -> Result<Client> {
    config.read_timeout = None;

    debug!(
        cluster_url = %config.cluster_url,
        default_namespace = %config.default_namespace,
        "cluster client configured"
    );

    Ok(Client::try_from(config)?)
}

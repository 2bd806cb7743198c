//! Wire model of a VM request.
//!
//! Every field is optional on the wire; missing values decode to their defaults and
//! are left for the cluster to reject.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmRequest {
    pub id: String,
    pub compute: ComputeSpec,
    pub user: UserCredential,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSpec {
    pub name: String,
    /// Fractional CPU cores, passed to the cluster unrounded.
    pub vcpu: f64,
    pub ram: String,
    pub storage: String,
    pub instances: f64,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
    /// Boot image the OS disk is imported from.
    pub url: String,
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserCredential {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSpec {
    pub image: String,
    pub ports: Vec<PortSpec>,
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortSpec {
    pub container_port: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

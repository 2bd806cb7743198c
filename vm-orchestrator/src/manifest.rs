//! KubeVirt `VirtualMachine` manifests.
//!
//! The manifest is assembled from typed structs and only turned into a loose
//! [`Document`] at the cluster boundary. Values are passed through as given; the
//! cluster is the one that validates sizes, names and URLs.

use crate::cloud_init;
use crate::error::Result;
use crate::request::{ComputeSpec, UserCredential};
use serde::Serialize;
use std::collections::BTreeMap;
use vm_cluster::{Document, ResourceIdentity};

pub const RUN_STRATEGY: &str = "RerunOnFailure";
pub const CLOUD_INIT_DISK: &str = "cloudinitdisk";
pub const DEFAULT_NETWORK: &str = "default";
const VM_LABEL: &str = "kubevirt.io/vm";

pub fn os_disk_name(vm: &str) -> String {
    format!("os-disk-{vm}")
}

pub fn os_volume_name(vm: &str) -> String {
    format!("os-volume-disk-{vm}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: VirtualMachineSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectMeta {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    pub run_strategy: String,
    pub template: InstanceTemplate,
    pub data_volume_templates: Vec<DataVolumeTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceTemplate {
    pub metadata: TemplateMeta,
    pub spec: InstanceSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMeta {
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSpec {
    pub domain: Domain,
    pub networks: Vec<Network>,
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Domain {
    pub cpu: Cpu,
    pub devices: Devices,
    pub resources: Resources,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cpu {
    pub cores: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Devices {
    pub disks: Vec<Disk>,
    pub interfaces: Vec<Interface>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disk {
    pub name: String,
    #[serde(flatten)]
    pub target: DiskTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskTarget {
    Disk { bus: String },
    Cdrom { bus: String },
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interface {
    pub name: String,
    pub masquerade: Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resources {
    pub limits: MemoryLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryLimits {
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    pub name: String,
    pub pod: Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Volume {
    pub name: String,
    #[serde(flatten)]
    pub source: VolumeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    DataVolume {
        name: String,
    },
    CloudInitNoCloud {
        #[serde(rename = "userDataBase64")]
        user_data_base64: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataVolumeTemplate {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: DataVolumeSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataVolumeSpec {
    pub storage: StorageSpec,
    pub source: DataVolumeSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    pub access_modes: Vec<String>,
    pub resources: StorageResources,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageResources {
    pub requests: StorageRequests,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageRequests {
    pub storage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataVolumeSource {
    pub http: HttpSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpSource {
    pub url: String,
}

impl VirtualMachine {
    /// Desired-state VM with one imported OS disk and a cloud-init disk.
    pub fn new(spec: &ComputeSpec, credential: &UserCredential) -> Self {
        let name = spec.name.clone();
        let os_disk = os_disk_name(&name);
        let os_volume = os_volume_name(&name);
        let vm = ResourceIdentity::VIRTUAL_MACHINE;
        let data_volume = ResourceIdentity::DATA_VOLUME;

        let template = InstanceTemplate {
            metadata: TemplateMeta {
                labels: BTreeMap::from([(VM_LABEL.to_string(), name.clone())]),
            },
            spec: InstanceSpec {
                domain: Domain {
                    cpu: Cpu { cores: spec.vcpu },
                    devices: Devices {
                        disks: vec![
                            Disk {
                                name: os_disk.clone(),
                                target: DiskTarget::Disk {
                                    bus: "virtio".to_string(),
                                },
                            },
                            Disk {
                                name: CLOUD_INIT_DISK.to_string(),
                                target: DiskTarget::Cdrom {
                                    bus: "sata".to_string(),
                                },
                            },
                        ],
                        interfaces: vec![Interface {
                            name: DEFAULT_NETWORK.to_string(),
                            masquerade: Empty {},
                        }],
                    },
                    resources: Resources {
                        limits: MemoryLimits {
                            memory: spec.ram.clone(),
                        },
                    },
                },
                networks: vec![Network {
                    name: DEFAULT_NETWORK.to_string(),
                    pod: Empty {},
                }],
                volumes: vec![
                    Volume {
                        name: os_disk,
                        source: VolumeSource::DataVolume {
                            name: os_volume.clone(),
                        },
                    },
                    Volume {
                        name: CLOUD_INIT_DISK.to_string(),
                        source: VolumeSource::CloudInitNoCloud {
                            user_data_base64: cloud_init::encode_user_data(
                                credential,
                                spec.ssh_key.as_deref(),
                            ),
                        },
                    },
                ],
            },
        };

        let data_volume_template = DataVolumeTemplate {
            api_version: data_volume.api_version(),
            kind: data_volume.kind.to_string(),
            metadata: ObjectMeta { name: os_volume },
            spec: DataVolumeSpec {
                storage: StorageSpec {
                    access_modes: vec!["ReadWriteOnce".to_string()],
                    resources: StorageResources {
                        requests: StorageRequests {
                            storage: spec.storage.clone(),
                        },
                    },
                },
                source: DataVolumeSource {
                    http: HttpSource {
                        url: spec.url.clone(),
                    },
                },
            },
        };

        Self {
            api_version: vm.api_version(),
            kind: vm.kind.to_string(),
            metadata: ObjectMeta { name },
            spec: VirtualMachineSpec {
                run_strategy: RUN_STRATEGY.to_string(),
                template,
                data_volume_templates: vec![data_volume_template],
            },
        }
    }
}

/// Build the cluster document for a new VM.
pub fn build_vm_manifest(spec: &ComputeSpec, credential: &UserCredential) -> Result<Document> {
    Ok(serde_json::to_value(VirtualMachine::new(spec, credential))?)
}

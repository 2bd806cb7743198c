use kube::{core::GroupVersionKind, discovery::ApiResource};
use std::fmt;

/// Group/version/kind of a cluster resource, plus the plural used in API paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl ResourceIdentity {
    /// Declarative VM specification (desired state).
    pub const VIRTUAL_MACHINE: Self =
        Self::new("kubevirt.io", "v1", "VirtualMachine", "virtualmachines");

    /// Currently running instantiation of a VM (live instance).
    pub const VIRTUAL_MACHINE_INSTANCE: Self = Self::new(
        "kubevirt.io",
        "v1",
        "VirtualMachineInstance",
        "virtualmachineinstances",
    );

    pub const DATA_VOLUME: Self =
        Self::new("cdi.kubevirt.io", "v1beta1", "DataVolume", "datavolumes");

    pub const fn new(
        group: &'static str,
        version: &'static str,
        kind: &'static str,
        plural: &'static str,
    ) -> Self {
        Self {
            group,
            version,
            kind,
            plural,
        }
    }

    /// The `apiVersion` string as it appears in manifests.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(self.group, self.version, self.kind)
    }

    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(&self.gvk(), self.plural)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

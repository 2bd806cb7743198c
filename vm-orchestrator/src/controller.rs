use crate::error::{OrchestratorError, Result};
use crate::manifest::build_vm_manifest;
use crate::request::VmRequest;
use std::sync::Arc;
use tracing::{info, instrument};
use vm_cluster::{
    ConsoleConnector, ConsoleStream, Document, RequestScope, ResourceAccessor, ResourceIdentity,
    WatchStream,
};

/// Which side of a VM a lookup reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VmState {
    /// The declared `VirtualMachine`.
    #[default]
    Desired,
    /// The running `VirtualMachineInstance`.
    Up,
}

impl VmState {
    /// Interpret the `state` query flag. Only `up` selects the live instance.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("up") => VmState::Up,
            _ => VmState::Desired,
        }
    }

    pub fn identity(self) -> ResourceIdentity {
        match self {
            VmState::Desired => ResourceIdentity::VIRTUAL_MACHINE,
            VmState::Up => ResourceIdentity::VIRTUAL_MACHINE_INSTANCE,
        }
    }
}

/// Stateless VM lifecycle operations. Each call maps to one or more accessor calls
/// made within the caller's scope.
#[derive(Clone)]
pub struct VirtualMachineController {
    accessor: Arc<dyn ResourceAccessor>,
    console: Arc<dyn ConsoleConnector>,
}

impl VirtualMachineController {
    pub fn new(accessor: Arc<dyn ResourceAccessor>, console: Arc<dyn ConsoleConnector>) -> Self {
        Self { accessor, console }
    }

    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        project = %scope.namespace(),
        name = %request.compute.name,
    ))]
    pub async fn create(&self, scope: &RequestScope, request: &VmRequest) -> Result<Document> {
        let manifest = build_vm_manifest(&request.compute, &request.user)?;
        let created = self
            .accessor
            .create(scope, &ResourceIdentity::VIRTUAL_MACHINE, manifest)
            .await?;

        info!("virtual machine created");
        Ok(created)
    }

    pub async fn find(&self, scope: &RequestScope, name: &str, state: VmState) -> Result<Document> {
        Ok(self.accessor.get(scope, &state.identity(), name).await?)
    }

    pub async fn find_all(&self, scope: &RequestScope, state: VmState) -> Result<Vec<Document>> {
        Ok(self.accessor.list(scope, &state.identity()).await?)
    }

    /// Deletes the desired-state object; the cluster tears down the instance.
    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        project = %scope.namespace(),
        name = %name,
    ))]
    pub async fn delete(&self, scope: &RequestScope, name: &str) -> Result<()> {
        self.accessor
            .delete(scope, &ResourceIdentity::VIRTUAL_MACHINE, name)
            .await?;

        info!("virtual machine deleted");
        Ok(())
    }

    pub async fn patch(&self, _scope: &RequestScope, _name: &str) -> Result<Document> {
        Err(OrchestratorError::NotImplemented("patch"))
    }

    /// Subscribe to changes of the selected kind. The cluster accessor does not
    /// support watches yet and fails with [`vm_cluster::ClusterError::NotImplemented`].
    pub async fn watch(&self, scope: &RequestScope, state: VmState) -> Result<WatchStream> {
        Ok(self.accessor.watch(scope, &state.identity()).await?)
    }

    /// Open the console of the running instance `name`.
    pub async fn console(&self, scope: &RequestScope, name: &str) -> Result<ConsoleStream> {
        Ok(self.console.open(scope, name).await?)
    }
}

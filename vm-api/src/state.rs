use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;
use vm_cluster::{KubeAccessor, KubevirtConsole};
use vm_orchestrator::VirtualMachineController;

#[derive(Clone)]
pub struct AppState {
    pub controller: VirtualMachineController,
    pub request_timeout: Duration,
    pub console_chunk_size: usize,
}

impl AppState {
    pub fn new(controller: VirtualMachineController, config: &Config) -> Self {
        Self {
            controller,
            request_timeout: config.request_timeout(),
            console_chunk_size: config.console_chunk_size,
        }
    }

    /// State backed by a live cluster. The client is shared by every request.
    pub fn from_client(client: kube::Client, config: &Config) -> Self {
        let controller = VirtualMachineController::new(
            Arc::new(KubeAccessor::new(client.clone())),
            Arc::new(KubevirtConsole::new(client)),
        );
        Self::new(controller, config)
    }
}

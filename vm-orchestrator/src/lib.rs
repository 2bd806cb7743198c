//! VM lifecycle business logic
//!
//! This crate turns VM requests into cluster documents and cluster calls, and
//! relays console sessions. It holds no state of its own; it is consumed by the
//! vm-api HTTP service but can be driven by any caller that builds a
//! [`vm_cluster::RequestScope`].

pub mod cloud_init;
pub mod console;
pub mod controller;
pub mod error;
pub mod manifest;
pub mod project;
pub mod request;

pub use console::{run_console_session, Direction, PumpExit, SessionSummary, DEFAULT_CHUNK_SIZE};
pub use controller::{VirtualMachineController, VmState};
pub use error::{OrchestratorError, Result};
pub use manifest::build_vm_manifest;
pub use project::namespace_for_email;
pub use request::{ComputeSpec, ContainerSpec, EnvVar, PortSpec, UserCredential, VmRequest};

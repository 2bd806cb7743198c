//! Cluster access for the VM control plane
//!
//! Everything this service knows about the cluster goes through this crate: the
//! kind-agnostic [`ResourceAccessor`], the KubeVirt console connector, and the
//! construction of the shared kube client. Callers never hold documents past a
//! single request; the cluster stays the system of record.

pub mod accessor;
pub mod client;
pub mod console;
pub mod error;
pub mod identity;
pub mod scope;

pub use accessor::{Document, KubeAccessor, ResourceAccessor, WatchEvent, WatchStream};
pub use client::connect;
pub use console::{ConsoleConnector, ConsoleIo, ConsoleStream, KubevirtConsole, WebSocketIo};
pub use error::{ClusterError, Result};
pub use identity::ResourceIdentity;
pub use scope::RequestScope;

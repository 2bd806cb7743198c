//! Common test utilities and helpers for vm-api tests
//!
//! The router is built over in-memory fakes of the cluster accessor and console
//! connector, so every route can be driven without a cluster.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use futures_util::{stream, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::DuplexStream;
use tower::ServiceExt;
use vm_api::{create_app, AppState, Config};
use vm_cluster::{
    ClusterError, ConsoleConnector, ConsoleStream, Document, RequestScope, ResourceAccessor,
    ResourceIdentity, WatchEvent, WatchStream,
};
use vm_orchestrator::VirtualMachineController;

/// One accessor call as seen by the fake cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenCall {
    pub op: &'static str,
    pub kind: &'static str,
    pub namespace: String,
    pub request_id: String,
    pub name: Option<String>,
}

/// In-memory cluster. Objects are `(kind, document)` pairs in insertion order.
#[derive(Default)]
pub struct FakeCluster {
    pub calls: Mutex<Vec<SeenCall>>,
    pub objects: Mutex<Vec<(&'static str, Value)>>,
    /// Returned by every call instead of touching the objects.
    pub failure: Mutex<Option<fn() -> ClusterError>>,
    /// Held before answering, to exercise request deadlines.
    pub delay: Mutex<Option<Duration>>,
    /// When set, watches stream these events and then end.
    pub watch_events: Mutex<Option<Vec<WatchEvent>>>,
}

impl FakeCluster {
    pub fn with_vm(self, kind: &'static str, name: &str) -> Self {
        self.objects
            .lock()
            .unwrap()
            .push((kind, vm_document(kind, name)));
        self
    }

    pub fn failing_with(self, failure: fn() -> ClusterError) -> Self {
        *self.failure.lock().unwrap() = Some(failure);
        self
    }

    pub fn slow(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SeenCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(
        &self,
        op: &'static str,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: Option<&str>,
    ) -> vm_cluster::Result<()> {
        self.calls.lock().unwrap().push(SeenCall {
            op,
            kind: identity.kind,
            namespace: scope.namespace().to_string(),
            request_id: scope.request_id().to_string(),
            name: name.map(str::to_string),
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            scope.run(async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }

        let failure = *self.failure.lock().unwrap();
        match failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

pub fn vm_document(kind: &str, name: &str) -> Value {
    json!({
        "apiVersion": "kubevirt.io/v1",
        "kind": kind,
        "metadata": { "name": name, "namespace": "proj1" }
    })
}

pub fn status(code: u16, reason: &str, message: String) -> ClusterError {
    ClusterError::Status {
        code,
        reason: reason.to_string(),
        message,
    }
}

#[async_trait]
impl ResourceAccessor for FakeCluster {
    async fn create(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        document: Document,
    ) -> vm_cluster::Result<Document> {
        let name = document["metadata"]["name"].as_str().unwrap_or_default().to_string();
        self.record("create", scope, identity, Some(&name)).await?;

        let mut objects = self.objects.lock().unwrap();
        if objects
            .iter()
            .any(|(kind, doc)| *kind == identity.kind && doc["metadata"]["name"] == name.as_str())
        {
            return Err(status(
                409,
                "AlreadyExists",
                format!("virtualmachines.kubevirt.io \"{name}\" already exists"),
            ));
        }
        objects.push((identity.kind, document.clone()));
        Ok(document)
    }

    async fn get(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: &str,
    ) -> vm_cluster::Result<Document> {
        self.record("get", scope, identity, Some(name)).await?;
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(kind, doc)| *kind == identity.kind && doc["metadata"]["name"] == name)
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| {
                status(
                    404,
                    "NotFound",
                    format!("{}.{} \"{name}\" not found", identity.plural, identity.group),
                )
            })
    }

    async fn list(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
    ) -> vm_cluster::Result<Vec<Document>> {
        self.record("list", scope, identity, None).await?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == identity.kind)
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn delete(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: &str,
    ) -> vm_cluster::Result<()> {
        self.record("delete", scope, identity, Some(name)).await?;
        let mut objects = self.objects.lock().unwrap();
        let before = objects.len();
        objects.retain(|(kind, doc)| !(*kind == identity.kind && doc["metadata"]["name"] == name));
        if objects.len() == before {
            return Err(status(
                404,
                "NotFound",
                format!("{}.{} \"{name}\" not found", identity.plural, identity.group),
            ));
        }
        Ok(())
    }

    async fn watch(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
    ) -> vm_cluster::Result<WatchStream> {
        self.record("watch", scope, identity, None).await?;
        match self.watch_events.lock().unwrap().clone() {
            Some(events) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            None => Err(ClusterError::NotImplemented("watch")),
        }
    }
}

/// Console connector handing out one end of an in-memory pipe per open. The other
/// end runs an echo loop unless a custom peer is installed.
#[derive(Default)]
pub struct FakeConsole {
    pub opened: Mutex<Vec<(String, String)>>,
    pub unavailable: bool,
    pub peer: Mutex<Option<tokio::sync::oneshot::Sender<DuplexStream>>>,
}

impl FakeConsole {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Receive the cluster side of the next console instead of echoing.
    pub fn capture_peer(&self) -> tokio::sync::oneshot::Receiver<DuplexStream> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        *self.peer.lock().unwrap() = Some(tx);
        rx
    }
}

#[async_trait]
impl ConsoleConnector for FakeConsole {
    async fn open(&self, scope: &RequestScope, name: &str) -> vm_cluster::Result<ConsoleStream> {
        self.opened
            .lock()
            .unwrap()
            .push((scope.namespace().to_string(), name.to_string()));

        if self.unavailable {
            return Err(status(
                404,
                "NotFound",
                format!("virtualmachineinstances.kubevirt.io \"{name}\" not found"),
            ));
        }

        let (session_end, cluster_end) = tokio::io::duplex(64 * 1024);
        let peer = self.peer.lock().unwrap().take();
        match peer {
            Some(peer) => {
                let _ = peer.send(cluster_end);
            }
            None => {
                tokio::spawn(async move {
                    let (mut reader, mut writer) = tokio::io::split(cluster_end);
                    let _ = tokio::io::copy(&mut reader, &mut writer).await;
                });
            }
        }
        Ok(Box::new(session_end))
    }
}

pub fn test_config() -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        kubeconfig: None,
        request_timeout_secs: 5,
        console_chunk_size: 1024,
    }
}

/// Create a test app over the given fakes
pub fn create_test_app(cluster: Arc<FakeCluster>, console: Arc<FakeConsole>) -> Router {
    create_test_app_with_config(cluster, console, &test_config())
}

pub fn create_test_app_with_config(
    cluster: Arc<FakeCluster>,
    console: Arc<FakeConsole>,
    config: &Config,
) -> Router {
    let controller = VirtualMachineController::new(cluster, console);
    create_app(AppState::new(controller, config))
}

/// Helper to extract JSON body from axum response
pub async fn extract_json_body<T>(response: axum::response::Response) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}

/// TestClient to encapsulate API interaction logic
pub struct TestClient {
    pub app: Router,
    pub cluster: Arc<FakeCluster>,
    pub console: Arc<FakeConsole>,
}

impl TestClient {
    pub fn new(cluster: FakeCluster) -> Self {
        Self::with_console(cluster, FakeConsole::default())
    }

    pub fn with_console(cluster: FakeCluster, console: FakeConsole) -> Self {
        let cluster = Arc::new(cluster);
        let console = Arc::new(console);
        let app = create_test_app(cluster.clone(), console.clone());
        Self {
            app,
            cluster,
            console,
        }
    }

    /// Send a request to the API
    pub async fn send_request(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send_request(request).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_request(request).await
    }

    pub async fn post(&self, uri: &str, body: &Value) -> Response<Body> {
        self.post_raw(uri, &body.to_string()).await
    }

    pub async fn put(&self, uri: &str, body: &Value) -> Response<Body> {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_request(request).await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send_request(request).await
    }
}

//! Kind-agnostic create/get/list/delete over the cluster API.
//!
//! Documents are plain JSON trees; the same code path serves every resource kind
//! by varying only the [`ResourceIdentity`].

use crate::error::{ClusterError, Result};
use crate::identity::ResourceIdentity;
use crate::scope::RequestScope;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use kube::{
    api::{Api, DeleteParams, DynamicObject, ListParams, PostParams},
    Client,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// Schema-agnostic cluster object.
pub type Document = serde_json::Value;

/// One change observed on a watched resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "object", rename_all = "UPPERCASE")]
pub enum WatchEvent {
    Added(Document),
    Modified(Document),
    Deleted(Document),
}

/// Subscription to watch events. Dropping the stream stops the watch.
pub type WatchStream = BoxStream<'static, Result<WatchEvent>>;

#[async_trait]
pub trait ResourceAccessor: Send + Sync {
    /// Submit a new object. Fails with a 409 status if the name is taken.
    async fn create(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        document: Document,
    ) -> Result<Document>;

    /// Fetch one object by name. Fails with a 404 status if absent.
    async fn get(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: &str,
    ) -> Result<Document>;

    /// Every object of the kind in the scope's namespace, in cluster order.
    async fn list(&self, scope: &RequestScope, identity: &ResourceIdentity)
        -> Result<Vec<Document>>;

    async fn delete(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: &str,
    ) -> Result<()>;

    async fn patch(
        &self,
        _scope: &RequestScope,
        _identity: &ResourceIdentity,
        _name: &str,
        _patch: Document,
    ) -> Result<Document> {
        Err(ClusterError::NotImplemented("patch"))
    }

    async fn watch(
        &self,
        _scope: &RequestScope,
        _identity: &ResourceIdentity,
    ) -> Result<WatchStream> {
        Err(ClusterError::NotImplemented("watch"))
    }
}

/// Check the fields the cluster needs to route and name a new object.
pub fn validate_for_create(document: &Document) -> Result<()> {
    let present = |pointer: &str| {
        document
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.is_empty())
    };

    if !present("/apiVersion") {
        return Err(ClusterError::InvalidDocument("apiVersion"));
    }
    if !present("/kind") {
        return Err(ClusterError::InvalidDocument("kind"));
    }
    if !present("/metadata/name") {
        return Err(ClusterError::InvalidDocument("metadata.name"));
    }
    Ok(())
}

/// [`ResourceAccessor`] backed by a shared kube client.
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, scope: &RequestScope, identity: &ResourceIdentity) -> Api<DynamicObject> {
        Api::namespaced_with(
            self.client.clone(),
            scope.namespace(),
            &identity.api_resource(),
        )
    }
}

#[async_trait]
impl ResourceAccessor for KubeAccessor {
    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        namespace = %scope.namespace(),
        kind = identity.kind,
    ))]
    async fn create(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        document: Document,
    ) -> Result<Document> {
        validate_for_create(&document)?;
        let object: DynamicObject = serde_json::from_value(document)?;
        let api = self.api(scope, identity);

        let created = scope
            .run(async {
                api.create(&PostParams::default(), &object)
                    .await
                    .map_err(ClusterError::from)
            })
            .await?;

        debug!(name = ?created.metadata.name, "created resource");
        Ok(serde_json::to_value(created)?)
    }

    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        namespace = %scope.namespace(),
        kind = identity.kind,
        name = %name,
    ))]
    async fn get(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: &str,
    ) -> Result<Document> {
        let api = self.api(scope, identity);
        let object = scope
            .run(async { api.get(name).await.map_err(ClusterError::from) })
            .await?;
        Ok(serde_json::to_value(object)?)
    }

    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        namespace = %scope.namespace(),
        kind = identity.kind,
    ))]
    async fn list(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
    ) -> Result<Vec<Document>> {
        let api = self.api(scope, identity);
        let list = scope
            .run(async {
                api.list(&ListParams::default())
                    .await
                    .map_err(ClusterError::from)
            })
            .await?;

        debug!(count = list.items.len(), "listed resources");
        list.items
            .into_iter()
            .map(|item| serde_json::to_value(item).map_err(ClusterError::from))
            .collect()
    }

    #[instrument(skip_all, fields(
        request_id = %scope.request_id(),
        namespace = %scope.namespace(),
        kind = identity.kind,
        name = %name,
    ))]
    async fn delete(
        &self,
        scope: &RequestScope,
        identity: &ResourceIdentity,
        name: &str,
    ) -> Result<()> {
        let api = self.api(scope, identity);
        scope
            .run(async {
                api.delete(name, &DeleteParams::default())
                    .await
                    .map_err(ClusterError::from)
            })
            .await?;
        Ok(())
    }
}

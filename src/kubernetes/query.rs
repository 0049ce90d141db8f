// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Single-shot query execution with a per-instance result cache
//!
//! A [`Query`] pairs a [`QueryBuilder`] with a transport. The first read
//! (`len`, `objects`, `nth`, `response`) issues one list request and keeps the
//! decoded objects for the lifetime of that `Query`; later reads reuse them.
//! `filter()`/`all()` return a new `Query` with its own, empty cache.
//! [`Query::iterator`] bypasses the cache entirely.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use super::builder::{Filter, QueryBuilder, Scope};
use super::resources::{ApiObject, ResourceKind, TypedObject};
use super::selector::Selector;
use super::transport::{ApiResponse, Transport};
use super::watch::{Since, Watch};
use crate::error::{Error, Result};

/// How [`Query::get`] finds its single object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Direct `endpoint/name` request, selectors ignored
    Name(String),
    /// Apply the filter and require exactly one match
    Filter(Filter),
}

impl Lookup {
    pub fn name(name: impl Into<String>) -> Self {
        Lookup::Name(name.into())
    }
}

impl From<Filter> for Lookup {
    fn from(filter: Filter) -> Self {
        Lookup::Filter(filter)
    }
}

/// Single-pass iterator returned by [`Query::iterator`]
pub type ObjectIter<K> = std::iter::Map<std::vec::IntoIter<Value>, fn(Value) -> K>;

/// Decoded list response and its wrapped items
struct QueryCache<K> {
    response: Value,
    objects: Vec<K>,
}

/// A list query against one resource kind
pub struct Query<K> {
    transport: Arc<dyn Transport>,
    builder: QueryBuilder,
    cache: OnceCell<QueryCache<K>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: TypedObject> Query<K> {
    /// Query over every object of `K`'s kind
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_kind(transport, K::KIND)
    }
}

impl<K: ApiObject> Query<K> {
    /// Query over a kind chosen at runtime
    pub fn with_kind(transport: Arc<dyn Transport>, kind: ResourceKind) -> Self {
        Self::from_builder(transport, QueryBuilder::new(kind))
    }

    pub fn from_builder(transport: Arc<dyn Transport>, builder: QueryBuilder) -> Self {
        Self {
            transport,
            builder,
            cache: OnceCell::new(),
            _kind: PhantomData,
        }
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn kind(&self) -> &ResourceKind {
        self.builder.kind()
    }

    pub fn namespace(&self) -> &Scope {
        self.builder.namespace()
    }

    pub fn label_selector(&self) -> Option<&Selector> {
        self.builder.label_selector()
    }

    pub fn field_selector(&self) -> Option<&Selector> {
        self.builder.field_selector()
    }

    /// New query with the same constraints and an empty cache
    pub fn all(&self) -> Self {
        Self::from_builder(Arc::clone(&self.transport), self.builder.all())
    }

    /// New query with the given overrides and an empty cache
    pub fn filter(&self, filter: Filter) -> Self {
        Self::from_builder(Arc::clone(&self.transport), self.builder.filter(filter))
    }

    pub fn build_request_path(&self) -> Result<String> {
        self.builder.build_request_path()
    }

    /// Issue the list request; non-success statuses are errors
    pub async fn execute(&self) -> Result<ApiResponse> {
        let request = self.builder.request(self.builder.build_request_path()?);
        debug!(
            endpoint = %self.kind().endpoint,
            namespace = ?request.namespace,
            uri = %request.uri(),
            "Listing resources"
        );
        self.transport.get(&request).await?.error_for_status()
    }

    /// Fetch one object by name, bypassing selectors
    ///
    /// A namespaced kind needs a concrete namespace here: the cluster-wide
    /// route has no `endpoint/name` form and would always answer 404.
    pub async fn get_by_name(&self, name: &str) -> Result<K> {
        let path = format!("{}/{}", self.kind().endpoint, name);
        if self.kind().namespaced && self.namespace().as_namespace().is_none() {
            return Err(Error::NamespaceRequired(path));
        }
        let request = self.builder.request(path);
        debug!(
            endpoint = %self.kind().endpoint,
            name = %name,
            namespace = ?request.namespace,
            "Fetching resource by name"
        );

        let response = self.transport.get(&request).await?;
        if response.status == 404 {
            return Err(Error::ObjectDoesNotExist(format!("{} does not exist.", name)));
        }
        let response = response.error_for_status()?;
        Ok(K::wrap(response.json()?))
    }

    /// Fetch exactly one object, by name or by filter
    pub async fn get(&self, lookup: impl Into<Lookup>) -> Result<K> {
        let filter = match lookup.into() {
            Lookup::Name(name) => return self.get_by_name(&name).await,
            Lookup::Filter(filter) => filter,
        };

        let mut objects = self.filter(filter).into_objects().await?;
        match objects.len() {
            0 => Err(Error::ObjectDoesNotExist(
                "get() returned zero objects".to_string(),
            )),
            1 => Ok(objects.remove(0)),
            count => Err(Error::AmbiguousResult { count }),
        }
    }

    /// Like [`Query::get`], with "does not exist" turned into `None`
    pub async fn get_or_none(&self, lookup: impl Into<Lookup>) -> Result<Option<K>> {
        match self.get(lookup).await {
            Ok(obj) => Ok(Some(obj)),
            Err(Error::ObjectDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn cache(&self) -> Result<&QueryCache<K>> {
        self.cache
            .get_or_try_init(|| async {
                let response: Value = self.execute().await?.json()?;
                let objects = wrap_items(&response);
                debug!(
                    endpoint = %self.kind().endpoint,
                    count = objects.len(),
                    "Cached query result"
                );
                Ok::<_, Error>(QueryCache { response, objects })
            })
            .await
    }

    /// All matching objects, fetched once per `Query`
    pub async fn objects(&self) -> Result<&[K]> {
        Ok(&self.cache().await?.objects)
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.cache().await?.objects.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Object at `index` in the cached result
    pub async fn nth(&self, index: usize) -> Result<Option<&K>> {
        Ok(self.cache().await?.objects.get(index))
    }

    /// Raw decoded list response backing the cache
    pub async fn response(&self) -> Result<&Value> {
        Ok(&self.cache().await?.response)
    }

    /// Consume the query and take ownership of its (possibly freshly fetched) objects
    pub async fn into_objects(self) -> Result<Vec<K>> {
        self.cache().await?;
        Ok(self
            .cache
            .into_inner()
            .map(|cache| cache.objects)
            .unwrap_or_default())
    }

    /// Fetch anew and iterate once over the results without caching them
    pub async fn iterator(&self) -> Result<ObjectIter<K>> {
        let response: Value = self.execute().await?.json()?;
        let items = match response {
            Value::Object(mut body) => match body.remove("items") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        Ok(items.into_iter().map(K::wrap as fn(Value) -> K))
    }

    /// Turn this query into a watch with the same kind, namespace and selectors
    pub async fn watch(&self, since: Since) -> Result<Watch<K>> {
        let resource_version = match since {
            Since::Server => None,
            Since::Version(version) => Some(version),
            Since::Now => {
                let version = self
                    .response()
                    .await?
                    .pointer("/metadata/resourceVersion")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::MissingResourceVersion(self.kind().endpoint.to_string()))?;
                Some(version.to_string())
            }
        };
        Ok(Watch::new(
            Arc::clone(&self.transport),
            self.builder.all(),
            resource_version,
        ))
    }
}

fn wrap_items<K: ApiObject>(response: &Value) -> Vec<K> {
    response
        .get("items")
        .and_then(Value::as_array)
        .map(|items| items.iter().cloned().map(K::wrap).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::resources::{DynamicObject, Pod};
    use crate::kubernetes::testing::{MockTransport, list_body};
    use serde_json::json;

    fn pods(transport: &Arc<MockTransport>) -> Query<Pod> {
        Query::new(transport.clone())
    }

    #[tokio::test]
    async fn test_materialization_is_cached() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("7", &["a", "b"]));
        let query = pods(&transport);

        assert_eq!(query.len().await.unwrap(), 2);
        let names: Vec<_> = query
            .objects()
            .await
            .unwrap()
            .iter()
            .filter_map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(query.nth(1).await.unwrap().and_then(|p| p.name()), Some("b"));
        assert!(query.nth(2).await.unwrap().is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_filter_gets_its_own_cache() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("1", &["a", "b"]));
        transport.push_response(200, list_body("1", &["a"]));
        let base = pods(&transport);

        assert_eq!(base.len().await.unwrap(), 2);
        let narrowed = base.filter(Filter::new().selector("app=a"));
        assert_eq!(narrowed.len().await.unwrap(), 1);
        assert_eq!(base.len().await.unwrap(), 2);
        assert_eq!(transport.request_count(), 2);
        assert_eq!(
            transport.requests()[1].path,
            "pods?labelSelector=app%3Da"
        );
    }

    #[tokio::test]
    async fn test_execute_scopes_namespace() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("1", &[]));
        transport.push_response(200, list_body("1", &[]));
        let query = pods(&transport).filter(Filter::new().namespace("prod"));
        query.execute().await.unwrap();
        query.filter(Filter::new().all_namespaces()).execute().await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].uri(), "/api/v1/namespaces/prod/pods");
        assert_eq!(requests[1].uri(), "/api/v1/pods");
    }

    #[tokio::test]
    async fn test_execute_propagates_failure() {
        let transport = MockTransport::new();
        transport.push_response(500, r#"{"message":"etcd unavailable"}"#);
        let err = pods(&transport).len().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_null_items_is_empty() {
        let transport = MockTransport::new();
        transport.push_response(200, r#"{"metadata":{"resourceVersion":"3"},"items":null}"#);
        let query = pods(&transport);
        assert!(query.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let transport = MockTransport::new();
        transport.push_response(200, json!({"metadata": {"name": "web"}}).to_string());
        let query = pods(&transport).filter(Filter::new().namespace("prod").selector("app=x"));

        let pod = query.get(Lookup::name("web")).await.unwrap();
        assert_eq!(pod.name(), Some("web"));
        assert_eq!(
            transport.requests()[0].uri(),
            "/api/v1/namespaces/prod/pods/web"
        );
    }

    #[tokio::test]
    async fn test_get_by_name_not_found() {
        let transport = MockTransport::new();
        transport.push_response(404, r#"{"message":"pods \"x\" not found"}"#);
        transport.push_response(404, r#"{"message":"pods \"x\" not found"}"#);
        let query = pods(&transport).filter(Filter::new().namespace("prod"));

        let err = query.get(Lookup::name("x")).await.unwrap_err();
        assert!(matches!(err, Error::ObjectDoesNotExist(_)));
        assert!(query.get_or_none(Lookup::name("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_name_other_status_propagates() {
        let transport = MockTransport::new();
        transport.push_response(403, r#"{"message":"forbidden"}"#);
        transport.push_response(403, r#"{"message":"forbidden"}"#);
        let query = pods(&transport).filter(Filter::new().namespace("prod"));

        let err = query.get(Lookup::name("x")).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        let err = query.get_or_none(Lookup::name("x")).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_get_by_name_needs_namespace() {
        let transport = MockTransport::new();
        let query = pods(&transport).filter(Filter::new().all_namespaces());

        let err = query.get_by_name("web").await.unwrap_err();
        assert!(matches!(err, Error::NamespaceRequired(ref path) if path == "pods/web"));
        let err = pods(&transport).get_or_none(Lookup::name("web")).await.unwrap_err();
        assert!(matches!(err, Error::NamespaceRequired(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_name_cluster_scoped_all_namespaces() {
        let transport = MockTransport::new();
        transport.push_response(200, json!({"metadata": {"name": "node-1"}}).to_string());
        let kind = crate::kubernetes::resources::lookup("nodes").unwrap();
        let query: Query<DynamicObject> =
            Query::with_kind(transport.clone(), kind).filter(Filter::new().all_namespaces());

        let node = query.get_by_name("node-1").await.unwrap();
        assert_eq!(node.name(), Some("node-1"));
        assert_eq!(transport.requests()[0].uri(), "/api/v1/nodes/node-1");
    }

    #[tokio::test]
    async fn test_get_exactly_one() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("1", &["only"]));
        let pod = pods(&transport)
            .get(Filter::new().selector("app=web"))
            .await
            .unwrap();
        assert_eq!(pod.name(), Some("only"));
    }

    #[tokio::test]
    async fn test_get_zero_and_many() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("1", &[]));
        transport.push_response(200, list_body("1", &["a", "b"]));
        transport.push_response(200, list_body("1", &[]));
        transport.push_response(200, list_body("1", &["a", "b"]));
        let query = pods(&transport);

        let err = query.get(Filter::new()).await.unwrap_err();
        assert!(matches!(err, Error::ObjectDoesNotExist(_)));

        let err = query.get(Filter::new()).await.unwrap_err();
        assert!(matches!(err, Error::AmbiguousResult { count: 2 }));

        assert!(query.get_or_none(Filter::new()).await.unwrap().is_none());
        assert!(matches!(
            query.get_or_none(Filter::new()).await,
            Err(Error::AmbiguousResult { .. })
        ));
    }

    #[tokio::test]
    async fn test_iterator_is_uncached() {
        let transport = MockTransport::new();
        for _ in 0..3 {
            transport.push_response(200, list_body("1", &["a", "b"]));
        }
        let query = pods(&transport);

        let first: Vec<Pod> = query.iterator().await.unwrap().collect();
        let second: Vec<Pod> = query.iterator().await.unwrap().collect();
        assert_eq!(transport.request_count(), 2);

        let cached = query.objects().await.unwrap();
        assert_eq!(first, cached);
        assert_eq!(second, cached);
        query.len().await.unwrap();
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_watch_since_now_uses_list_version() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("1234", &["a"]));
        let query = pods(&transport);
        let watch = query.watch(Since::Now).await.unwrap();
        assert_eq!(watch.resource_version(), Some("1234"));

        let watch = query.watch(Since::Version("99".to_string())).await.unwrap();
        assert_eq!(watch.resource_version(), Some("99"));
        let watch = query.watch(Since::Server).await.unwrap();
        assert_eq!(watch.resource_version(), None);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_watch_since_now_without_version() {
        let transport = MockTransport::new();
        transport.push_response(200, r#"{"items":[]}"#);
        let err = pods(&transport).watch(Since::Now).await.unwrap_err();
        assert!(matches!(err, Error::MissingResourceVersion(_)));
    }

    #[tokio::test]
    async fn test_dynamic_kind() {
        let transport = MockTransport::new();
        transport.push_response(200, list_body("1", &["n1"]));
        let kind = crate::kubernetes::resources::lookup("deploy").unwrap();
        let query: Query<DynamicObject> = Query::with_kind(transport.clone(), kind);
        assert_eq!(query.len().await.unwrap(), 1);
        assert_eq!(transport.requests()[0].uri(), "/apis/apps/v1/deployments");
    }
}

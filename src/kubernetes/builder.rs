// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Immutable query builder
//!
//! A [`QueryBuilder`] records what to fetch (kind, namespace scope, label and
//! field selectors) and renders request paths from it. Filtering never mutates
//! a builder; it returns a new one, so a base builder can be shared between any
//! number of independent queries.

use tracing::warn;

use super::field_selectors::FIELD_SELECTOR_REGISTRY;
use super::resources::ResourceKind;
use super::selector::Selector;
use super::transport::ApiRequest;
use crate::error::Result;

/// Namespace scope of a query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// No namespace chosen; requests go to the cluster-wide endpoint
    #[default]
    Unset,
    /// One specific namespace
    Namespace(String),
    /// Explicitly every namespace
    All,
}

impl Scope {
    pub fn namespace(name: impl Into<String>) -> Self {
        Scope::Namespace(name.into())
    }

    /// The namespace to put in the request path, if any
    pub fn as_namespace(&self) -> Option<&str> {
        match self {
            Scope::Namespace(ns) => Some(ns),
            Scope::Unset | Scope::All => None,
        }
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::Namespace(name.to_string())
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        Scope::Namespace(name)
    }
}

/// Overrides applied by [`QueryBuilder::filter`]; unset fields keep the parent's value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub namespace: Option<Scope>,
    pub selector: Option<Selector>,
    pub field_selector: Option<Selector>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, scope: impl Into<Scope>) -> Self {
        self.namespace = Some(scope.into());
        self
    }

    pub fn all_namespaces(mut self) -> Self {
        self.namespace = Some(Scope::All);
        self
    }

    pub fn selector(mut self, selector: impl Into<Selector>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn field_selector(mut self, selector: impl Into<Selector>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }
}

/// What to query: kind, namespace scope and selectors
///
/// A `None` selector matches everything and is left out of the request;
/// `Some` of an empty selector is sent as an empty filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    kind: ResourceKind,
    namespace: Scope,
    label_selector: Option<Selector>,
    field_selector: Option<Selector>,
}

impl QueryBuilder {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            namespace: Scope::Unset,
            label_selector: None,
            field_selector: None,
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn namespace(&self) -> &Scope {
        &self.namespace
    }

    pub fn label_selector(&self) -> Option<&Selector> {
        self.label_selector.as_ref()
    }

    pub fn field_selector(&self) -> Option<&Selector> {
        self.field_selector.as_ref()
    }

    /// Fresh copy with no new constraints
    pub fn all(&self) -> Self {
        self.clone()
    }

    /// Copy with the given overrides applied
    pub fn filter(&self, filter: Filter) -> Self {
        let mut clone = self.clone();
        if let Some(namespace) = filter.namespace {
            clone.namespace = namespace;
        }
        if let Some(selector) = filter.selector {
            clone.label_selector = Some(selector);
        }
        if let Some(selector) = filter.field_selector {
            clone.field_selector = Some(selector);
        }
        clone
    }

    /// Endpoint path with the selector query string, e.g. `pods?labelSelector=app%3Dweb`
    pub fn build_request_path(&self) -> Result<String> {
        self.build_api_path(Vec::new())
    }

    /// Endpoint path with `params` followed by the selector parameters
    pub(crate) fn build_api_path(&self, mut params: Vec<(&'static str, String)>) -> Result<String> {
        if let Some(selector) = &self.label_selector {
            params.push(("labelSelector", selector.compile()?));
        }
        if let Some(selector) = &self.field_selector {
            let unsupported = FIELD_SELECTOR_REGISTRY.unsupported_fields(self.kind.endpoint, selector);
            if !unsupported.is_empty() {
                warn!(
                    endpoint = %self.kind.endpoint,
                    fields = ?unsupported,
                    "Field selector uses fields the API server may reject"
                );
            }
            params.push(("fieldSelector", selector.compile()?));
        }

        let query_string = encode_params(&params);
        if query_string.is_empty() {
            Ok(self.kind.endpoint.to_string())
        } else {
            Ok(format!("{}?{}", self.kind.endpoint, query_string))
        }
    }

    /// Request for `path`, scoped to the namespace when the kind is namespaced
    pub(crate) fn request(&self, path: String) -> ApiRequest {
        let namespace = if self.kind.namespaced {
            self.namespace.as_namespace().map(String::from)
        } else {
            None
        };
        ApiRequest {
            path,
            namespace,
            base: self.kind.base,
            version: self.kind.version,
        }
    }
}

fn encode_params(params: &[(&str, String)]) -> String {
    // Serializing a list of string pairs cannot fail
    serde_urlencoded::to_string(params).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::resources::{Deployment, Node, Pod, TypedObject};

    #[test]
    fn test_path_without_selectors() {
        let builder = QueryBuilder::new(Pod::KIND);
        assert_eq!(builder.build_request_path().unwrap(), "pods");
    }

    #[test]
    fn test_path_with_selectors_is_url_encoded() {
        let builder = QueryBuilder::new(Pod::KIND).filter(
            Filter::new()
                .selector(Selector::new().with("app", "web").with("tier__in", ["a", "b"]))
                .field_selector(Selector::new().with("status.phase", "Running")),
        );
        assert_eq!(
            builder.build_request_path().unwrap(),
            "pods?labelSelector=app%3Dweb%2Ctier+in+%28a%2Cb%29&fieldSelector=status.phase%3DRunning"
        );
    }

    #[test]
    fn test_empty_selector_is_not_everything() {
        let builder = QueryBuilder::new(Pod::KIND).filter(Filter::new().selector(Selector::new()));
        assert_eq!(builder.build_request_path().unwrap(), "pods?labelSelector=");
    }

    #[test]
    fn test_invalid_selector_fails_path() {
        let builder =
            QueryBuilder::new(Pod::KIND).filter(Filter::new().selector(Selector::new().with("a__x", "1")));
        assert!(builder.build_request_path().is_err());
    }

    #[test]
    fn test_filter_does_not_mutate_receiver() {
        let base = QueryBuilder::new(Pod::KIND);
        let scoped = base.filter(Filter::new().namespace("ns"));
        assert_eq!(base.namespace(), &Scope::Unset);
        assert_eq!(scoped.namespace(), &Scope::Namespace("ns".to_string()));
    }

    #[test]
    fn test_filter_keeps_unset_fields() {
        let base = QueryBuilder::new(Pod::KIND)
            .filter(Filter::new().namespace("prod").selector("app=web"));
        let narrowed = base.filter(Filter::new().field_selector("status.phase=Running"));
        assert_eq!(narrowed.namespace(), &Scope::namespace("prod"));
        assert_eq!(narrowed.label_selector(), Some(&Selector::raw("app=web")));
        assert_eq!(
            narrowed.field_selector(),
            Some(&Selector::raw("status.phase=Running"))
        );
    }

    #[test]
    fn test_all_namespaces_overrides_namespace() {
        let base = QueryBuilder::new(Pod::KIND).filter(Filter::new().namespace("prod"));
        let wide = base.filter(Filter::new().all_namespaces());
        assert_eq!(wide.namespace(), &Scope::All);
        assert_eq!(wide.all(), wide);
    }

    #[test]
    fn test_request_scoping() {
        let ns = QueryBuilder::new(Deployment::KIND).filter(Filter::new().namespace("prod"));
        let req = ns.request("deployments".to_string());
        assert_eq!(req.uri(), "/apis/apps/v1/namespaces/prod/deployments");

        let all = ns.filter(Filter::new().all_namespaces());
        assert_eq!(all.request("deployments".to_string()).namespace, None);

        // Cluster-scoped kinds never get a namespace segment
        let nodes = QueryBuilder::new(Node::KIND).filter(Filter::new().namespace("prod"));
        assert_eq!(nodes.request("nodes".to_string()).uri(), "/api/v1/nodes");
    }

    #[test]
    fn test_extra_params_come_first() {
        let builder = QueryBuilder::new(Pod::KIND).filter(Filter::new().selector("app=web"));
        let path = builder
            .build_api_path(vec![("watch", "true".to_string())])
            .unwrap();
        assert_eq!(path, "pods?watch=true&labelSelector=app%3Dweb");
    }
}

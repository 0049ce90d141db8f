// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Registry of field selectors supported per resource endpoint
//!
//! The API server rejects a `fieldSelector` naming a field it does not index,
//! and it does not expose which fields those are. This registry mirrors the
//! documented list so a query can flag a likely rejection before sending it:
//! https://kubernetes.io/docs/concepts/overview/working-with-objects/field-selectors/#supported-fields
//!
//! The registry is advisory. Unknown endpoints (CRDs, newer kinds) are not
//! checked at all, and a server may accept more than is listed here.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::selector::Selector;

/// Global field selector registry instance
pub static FIELD_SELECTOR_REGISTRY: LazyLock<FieldSelectorRegistry> =
    LazyLock::new(FieldSelectorRegistry::new);

/// Map of endpoint (e.g. "pods") → supported field paths
pub struct FieldSelectorRegistry {
    registry: HashMap<&'static str, Vec<&'static str>>,
}

impl FieldSelectorRegistry {
    /// Supported field paths for an endpoint, `None` if the endpoint is unknown
    pub fn supported_fields(&self, endpoint: &str) -> Option<&[&'static str]> {
        self.registry.get(endpoint).map(|v| v.as_slice())
    }

    /// Fields of `selector` not known to be supported by `endpoint`
    ///
    /// Always empty for raw selectors and for endpoints outside the registry.
    pub fn unsupported_fields<'a>(&self, endpoint: &str, selector: &'a Selector) -> Vec<&'a str> {
        let Some(supported) = self.supported_fields(endpoint) else {
            return Vec::new();
        };
        selector
            .fields()
            .into_iter()
            .filter(|field| !supported.iter().any(|s| s == field))
            .collect()
    }

    fn new() -> Self {
        let mut registry = HashMap::new();

        // Every resource supports these two
        let universal = vec!["metadata.name", "metadata.namespace"];
        let with = |extra: &[&'static str]| {
            let mut fields = universal.clone();
            fields.extend_from_slice(extra);
            fields
        };

        registry.insert(
            "pods",
            with(&[
                "spec.nodeName",
                "spec.restartPolicy",
                "spec.schedulerName",
                "spec.serviceAccountName",
                "spec.hostNetwork",
                "status.phase",
                "status.podIP",
                "status.nominatedNodeName",
            ]),
        );
        registry.insert(
            "events",
            with(&[
                "involvedObject.kind",
                "involvedObject.namespace",
                "involvedObject.name",
                "involvedObject.uid",
                "involvedObject.apiVersion",
                "involvedObject.resourceVersion",
                "involvedObject.fieldPath",
                "reason",
                "reportingComponent",
                "source",
                "type",
            ]),
        );
        registry.insert("secrets", with(&["type"]));
        registry.insert("namespaces", with(&["status.phase"]));
        registry.insert("replicasets", with(&["status.replicas"]));
        registry.insert("replicationcontrollers", with(&["status.replicas"]));
        registry.insert("jobs", with(&["status.successful"]));
        registry.insert("nodes", with(&["spec.unschedulable"]));

        for endpoint in [
            "services",
            "configmaps",
            "serviceaccounts",
            "persistentvolumes",
            "persistentvolumeclaims",
            "deployments",
            "statefulsets",
            "daemonsets",
            "cronjobs",
            "ingresses",
            "endpoints",
            "resourcequotas",
            "limitranges",
            "horizontalpodautoscalers",
            "poddisruptionbudgets",
            "roles",
            "rolebindings",
            "clusterroles",
            "clusterrolebindings",
        ] {
            registry.insert(endpoint, universal.clone());
        }

        Self { registry }
    }
}

// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource kinds and typed object handles
//!
//! A [`ResourceKind`] is the static REST metadata of a kind (endpoint, API
//! group base, version, scope). Typed handles such as [`Pod`] wrap the raw JSON
//! returned by the API and carry their kind as an associated constant, so a
//! `Query<Pod>` knows where to send requests without any runtime lookup.
//! [`DynamicObject`] covers kinds only known at runtime (e.g. from the CLI).

use std::collections::BTreeMap;

use serde_json::Value;

/// Static REST metadata for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKind {
    /// Kind name as it appears in objects (e.g. "Deployment")
    pub kind: &'static str,
    /// Plural REST path segment (e.g. "deployments")
    pub endpoint: &'static str,
    /// API group base path; `None` means the core `/api`
    pub base: Option<&'static str>,
    /// API version; `None` means the transport default (`v1`)
    pub version: Option<&'static str>,
    /// Whether objects live inside a namespace
    pub namespaced: bool,
    /// Short names accepted by [`lookup`]
    pub aliases: &'static [&'static str],
}

impl ResourceKind {
    /// `apiVersion` string as written in objects ("v1", "apps/v1")
    pub fn api_version(&self) -> String {
        let version = self.version.unwrap_or("v1");
        match self.base.and_then(|b| b.strip_prefix("/apis/")) {
            Some(group) => format!("{}/{}", group, version),
            None => version.to_string(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.endpoint == name
            || self.kind.to_lowercase() == name
            || self.aliases.iter().any(|alias| *alias == name)
    }
}

/// A handle around the raw JSON of one API object
pub trait ApiObject: Sized + Send + Sync + 'static {
    fn wrap(raw: Value) -> Self;

    fn raw(&self) -> &Value;

    fn into_raw(self) -> Value;

    fn name(&self) -> Option<&str> {
        self.raw().pointer("/metadata/name").and_then(Value::as_str)
    }

    fn namespace(&self) -> Option<&str> {
        self.raw().pointer("/metadata/namespace").and_then(Value::as_str)
    }

    fn resource_version(&self) -> Option<&str> {
        self.raw()
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
    }

    fn creation_timestamp(&self) -> Option<&str> {
        self.raw()
            .pointer("/metadata/creationTimestamp")
            .and_then(Value::as_str)
    }

    fn labels(&self) -> BTreeMap<&str, &str> {
        self.raw()
            .pointer("/metadata/labels")
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An object whose kind is known at compile time
pub trait TypedObject: ApiObject {
    const KIND: ResourceKind;
}

/// Object of a kind resolved at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicObject {
    raw: Value,
}

impl ApiObject for DynamicObject {
    fn wrap(raw: Value) -> Self {
        Self { raw }
    }

    fn raw(&self) -> &Value {
        &self.raw
    }

    fn into_raw(self) -> Value {
        self.raw
    }
}

macro_rules! typed_objects {
    ($(
        $(#[$meta:meta])*
        $ty:ident {
            endpoint: $endpoint:literal,
            base: $base:expr,
            version: $version:expr,
            namespaced: $namespaced:literal,
            aliases: [$($alias:literal),*] $(,)?
        }
    ),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq)]
            pub struct $ty {
                raw: Value,
            }

            impl ApiObject for $ty {
                fn wrap(raw: Value) -> Self {
                    Self { raw }
                }

                fn raw(&self) -> &Value {
                    &self.raw
                }

                fn into_raw(self) -> Value {
                    self.raw
                }
            }

            impl TypedObject for $ty {
                const KIND: ResourceKind = ResourceKind {
                    kind: stringify!($ty),
                    endpoint: $endpoint,
                    base: $base,
                    version: $version,
                    namespaced: $namespaced,
                    aliases: &[$($alias),*],
                };
            }
        )*

        /// Every built-in kind, in display order
        pub const KINDS: &[ResourceKind] = &[$(<$ty as TypedObject>::KIND),*];
    };
}

typed_objects! {
    Pod { endpoint: "pods", base: None, version: None, namespaced: true, aliases: ["pod", "po"] },
    Service { endpoint: "services", base: None, version: None, namespaced: true, aliases: ["service", "svc"] },
    ConfigMap { endpoint: "configmaps", base: None, version: None, namespaced: true, aliases: ["configmap", "cm"] },
    Secret { endpoint: "secrets", base: None, version: None, namespaced: true, aliases: ["secret"] },
    ServiceAccount { endpoint: "serviceaccounts", base: None, version: None, namespaced: true, aliases: ["serviceaccount", "sa"] },
    Event { endpoint: "events", base: None, version: None, namespaced: true, aliases: ["event", "ev"] },
    PersistentVolumeClaim { endpoint: "persistentvolumeclaims", base: None, version: None, namespaced: true, aliases: ["pvc", "pvcs"] },
    PersistentVolume { endpoint: "persistentvolumes", base: None, version: None, namespaced: false, aliases: ["pv", "pvs"] },
    Node { endpoint: "nodes", base: None, version: None, namespaced: false, aliases: ["node", "no"] },
    Namespace { endpoint: "namespaces", base: None, version: None, namespaced: false, aliases: ["namespace", "ns"] },
    Deployment { endpoint: "deployments", base: Some("/apis/apps"), version: Some("v1"), namespaced: true, aliases: ["deployment", "deploy"] },
    ReplicaSet { endpoint: "replicasets", base: Some("/apis/apps"), version: Some("v1"), namespaced: true, aliases: ["replicaset", "rs"] },
    StatefulSet { endpoint: "statefulsets", base: Some("/apis/apps"), version: Some("v1"), namespaced: true, aliases: ["statefulset", "sts"] },
    DaemonSet { endpoint: "daemonsets", base: Some("/apis/apps"), version: Some("v1"), namespaced: true, aliases: ["daemonset", "ds"] },
    Job { endpoint: "jobs", base: Some("/apis/batch"), version: Some("v1"), namespaced: true, aliases: ["job"] },
    CronJob { endpoint: "cronjobs", base: Some("/apis/batch"), version: Some("v1"), namespaced: true, aliases: ["cronjob", "cj"] },
    Ingress { endpoint: "ingresses", base: Some("/apis/networking.k8s.io"), version: Some("v1"), namespaced: true, aliases: ["ingress", "ing"] },
    ReplicationController { endpoint: "replicationcontrollers", base: None, version: None, namespaced: true, aliases: ["rc"] },
    Endpoints { endpoint: "endpoints", base: None, version: None, namespaced: true, aliases: ["ep"] },
    ResourceQuota { endpoint: "resourcequotas", base: None, version: None, namespaced: true, aliases: ["quota"] },
    LimitRange { endpoint: "limitranges", base: None, version: None, namespaced: true, aliases: ["limits"] },
    HorizontalPodAutoscaler { endpoint: "horizontalpodautoscalers", base: Some("/apis/autoscaling"), version: Some("v2"), namespaced: true, aliases: ["hpa"] },
    PodDisruptionBudget { endpoint: "poddisruptionbudgets", base: Some("/apis/policy"), version: Some("v1"), namespaced: true, aliases: ["pdb"] },
    Role { endpoint: "roles", base: Some("/apis/rbac.authorization.k8s.io"), version: Some("v1"), namespaced: true, aliases: [] },
    RoleBinding { endpoint: "rolebindings", base: Some("/apis/rbac.authorization.k8s.io"), version: Some("v1"), namespaced: true, aliases: [] },
    ClusterRole { endpoint: "clusterroles", base: Some("/apis/rbac.authorization.k8s.io"), version: Some("v1"), namespaced: false, aliases: [] },
    ClusterRoleBinding { endpoint: "clusterrolebindings", base: Some("/apis/rbac.authorization.k8s.io"), version: Some("v1"), namespaced: false, aliases: [] },
}

/// Find a built-in kind by endpoint, kind name or alias (case-insensitive)
pub fn lookup(name: &str) -> Option<ResourceKind> {
    KINDS.iter().find(|k| k.matches(name)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_by_endpoint_kind_and_alias() {
        assert_eq!(lookup("pods"), Some(Pod::KIND));
        assert_eq!(lookup("Pod"), Some(Pod::KIND));
        assert_eq!(lookup("deploy"), Some(Deployment::KIND));
        assert_eq!(lookup("PVC"), Some(PersistentVolumeClaim::KIND));
        assert_eq!(lookup("widgets"), None);
    }

    #[test]
    fn test_lookup_extended_kinds() {
        assert_eq!(lookup("rc"), Some(ReplicationController::KIND));
        assert_eq!(lookup("ep"), Some(Endpoints::KIND));
        assert_eq!(lookup("hpa").map(|k| k.api_version()), Some("autoscaling/v2".to_string()));
        assert_eq!(lookup("pdb").map(|k| k.api_version()), Some("policy/v1".to_string()));
        assert_eq!(lookup("RoleBinding"), Some(RoleBinding::KIND));
        assert_eq!(
            ClusterRole::KIND.api_version(),
            "rbac.authorization.k8s.io/v1"
        );
        assert!(!ClusterRoleBinding::KIND.namespaced);
        assert!(Role::KIND.namespaced);
    }

    #[test]
    fn test_api_version() {
        assert_eq!(Pod::KIND.api_version(), "v1");
        assert_eq!(Deployment::KIND.api_version(), "apps/v1");
        assert_eq!(Ingress::KIND.api_version(), "networking.k8s.io/v1");
    }

    #[test]
    fn test_scope_flags() {
        assert!(Pod::KIND.namespaced);
        assert!(!Node::KIND.namespaced);
        assert!(!Namespace::KIND.namespaced);
        assert!(!PersistentVolume::KIND.namespaced);
    }

    #[test]
    fn test_kinds_are_unique() {
        let mut endpoints: Vec<_> = KINDS.iter().map(|k| k.endpoint).collect();
        endpoints.sort();
        endpoints.dedup();
        assert_eq!(endpoints.len(), KINDS.len());
    }

    #[test]
    fn test_metadata_accessors() {
        let pod = Pod::wrap(json!({
            "metadata": {
                "name": "web-0",
                "namespace": "prod",
                "resourceVersion": "42",
                "creationTimestamp": "2025-01-01T00:00:00Z",
                "labels": {"app": "web", "tier": "front"}
            }
        }));
        assert_eq!(pod.name(), Some("web-0"));
        assert_eq!(pod.namespace(), Some("prod"));
        assert_eq!(pod.resource_version(), Some("42"));
        assert_eq!(pod.creation_timestamp(), Some("2025-01-01T00:00:00Z"));
        assert_eq!(pod.labels().get("app"), Some(&"web"));
        assert_eq!(pod.labels().len(), 2);
    }

    #[test]
    fn test_missing_metadata() {
        let obj = DynamicObject::wrap(json!({"kind": "Status"}));
        assert_eq!(obj.name(), None);
        assert_eq!(obj.resource_version(), None);
        assert!(obj.labels().is_empty());
    }
}

//! Ingress listing.
//!
//! Lists `networking.k8s.io/v1` Ingresses and reduces each one to the few
//! facts the reconciler needs. Ingresses without any `pingdom-operator.io/`
//! annotation are dropped here and never reach the mapper.

use crate::error::ControllerError;
use crate::mapper::ANNOTATION_PREFIX;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// The parts of an Ingress relevant to check reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResource {
    pub name: String,
    pub namespace: String,
    pub annotations: BTreeMap<String, String>,
    /// Any TLS block is declared
    pub tls: bool,
    /// Rule hosts in declaration order, duplicates included
    pub hostnames: Vec<String>,
}

impl RawResource {
    pub fn from_ingress(ingress: &Ingress) -> Self {
        let spec = ingress.spec.as_ref();
        let tls = spec
            .and_then(|s| s.tls.as_ref())
            .is_some_and(|tls| !tls.is_empty());
        let hostnames = spec
            .and_then(|s| s.rules.as_ref())
            .map(|rules| rules.iter().filter_map(|rule| rule.host.clone()).collect())
            .unwrap_or_default();

        Self {
            name: ingress.metadata.name.clone().unwrap_or_default(),
            namespace: ingress.metadata.namespace.clone().unwrap_or_else(|| "default".to_string()),
            annotations: ingress.metadata.annotations.clone().unwrap_or_default(),
            tls,
            hostnames,
        }
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    pub fn has_operator_annotation(&self) -> bool {
        self.annotations.keys().any(|k| k.starts_with(ANNOTATION_PREFIX))
    }
}

/// Source of annotated resources for one pass
#[async_trait::async_trait]
pub trait ResourceLister: Send + Sync {
    /// Resources carrying at least one operator annotation
    async fn list(&self) -> Result<Vec<RawResource>, ControllerError>;
}

/// Lists Ingresses through the Kubernetes API
pub struct IngressLister {
    api: Api<Ingress>,
}

impl IngressLister {
    /// Lists in one namespace when given, otherwise across the cluster
    pub fn new(client: Client, namespace: Option<&str>) -> Self {
        let api = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };
        Self { api }
    }
}

#[async_trait::async_trait]
impl ResourceLister for IngressLister {
    async fn list(&self) -> Result<Vec<RawResource>, ControllerError> {
        let ingresses = self.api.list(&ListParams::default()).await?;
        let total = ingresses.items.len();

        let resources: Vec<RawResource> = ingresses
            .items
            .iter()
            .map(RawResource::from_ingress)
            .filter(RawResource::has_operator_annotation)
            .collect();

        debug!("Listed {} Ingresses, {} with {} annotations", total, resources.len(), ANNOTATION_PREFIX);
        Ok(resources)
    }
}

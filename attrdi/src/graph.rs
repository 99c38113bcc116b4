//! Introspection graph of registrations and decorations
//!
//! The graph mirrors what registration did, grouped by contract: one
//! [`ServiceNode`] per distinct (implementation, key, lifetime), with the
//! decorators applied to it and the features that activated it. It is
//! descriptive only; nothing reads it during resolution, and a failure while
//! updating it never fails registration.
//!
//! Decorators with no matching node yet are kept on a placeholder node
//! (no implementation, no lifetime). Every service registered later that the
//! placeholder selects receives its decorators; once it has selected one the
//! placeholder leaves the listed nodes but keeps applying to later services.

use std::panic::{self, AssertUnwindSafe};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::classifier::RegistrationEntry;
use crate::declarations::Lifetime;
use crate::features::Feature;
use crate::types::TypeRef;
use crate::wildcard::key_selects;

/// One registration as seen by the graph
#[derive(Debug, Clone, Serialize)]
pub struct ServiceNode {
    service_type: TypeRef,
    implementation_type: Option<TypeRef>,
    key: Option<String>,
    lifetime: Option<Lifetime>,
    decorators: Vec<TypeRef>,
    features: Vec<Feature>,
}

impl ServiceNode {
    pub fn service_type(&self) -> &TypeRef {
        &self.service_type
    }

    /// `None` for placeholder nodes
    pub fn implementation_type(&self) -> Option<&TypeRef> {
        self.implementation_type.as_ref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn lifetime(&self) -> Option<Lifetime> {
        self.lifetime
    }

    /// Decorators in application order
    pub fn decorators(&self) -> &[TypeRef] {
        &self.decorators
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn is_placeholder(&self) -> bool {
        self.implementation_type.is_none()
    }

    fn add_feature(&mut self, feature: Feature) {
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
    }

    fn add_decorator(&mut self, decorator: &TypeRef) {
        if !self.decorators.contains(decorator) {
            self.decorators.push(decorator.clone());
        }
    }
}

#[derive(Debug, Clone)]
struct ContractGroup {
    contract: TypeRef,
    nodes: Vec<ServiceNode>,
    // Placeholders that already selected a service
    settled: Vec<ServiceNode>,
}

impl ContractGroup {
    // Open generic groups hold wildcard placeholders for every instance
    fn covers(&self, service_type: &TypeRef) -> bool {
        self.contract == *service_type
            || (self.contract.is_open()
                && self
                    .contract
                    .definition()
                    .is_some_and(|definition| service_type.is_instance_of(&definition)))
    }
}

/// Registrations grouped by contract, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct ServiceGraph {
    groups: Vec<ContractGroup>,
}

impl ServiceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a registration, merging with an existing node for the same
    /// implementation, key and lifetime
    pub fn add_or_merge(&mut self, entry: &RegistrationEntry) {
        self.guarded("add_or_merge", |graph| graph.merge_entry(entry));
    }

    /// Record a decorator against every node it selects
    ///
    /// With `wildcard_generic`, nodes of every closed instance of the
    /// contract's generic definition are selected.
    pub fn add_decorator(
        &mut self,
        contract: &TypeRef,
        decorator: &TypeRef,
        key: Option<&str>,
        feature: Feature,
        wildcard_generic: bool,
    ) {
        self.guarded("add_decorator", |graph| {
            graph.attach_decorator(contract, decorator, key, feature, wildcard_generic)
        });
    }

    fn guarded(&mut self, operation: &str, update: impl FnOnce(&mut Self)) {
        if panic::catch_unwind(AssertUnwindSafe(|| update(self))).is_err() {
            tracing::warn!(operation, "Service graph update failed; registration continues");
        }
    }

    fn group_mut(&mut self, contract: &TypeRef) -> &mut ContractGroup {
        let position = match self.groups.iter().position(|group| group.contract == *contract) {
            Some(position) => position,
            None => {
                self.groups.push(ContractGroup {
                    contract: contract.clone(),
                    nodes: Vec::new(),
                    settled: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[position]
    }

    fn merge_entry(&mut self, entry: &RegistrationEntry) {
        let implementation = entry.implementation_type();
        let group = self.group_mut(&entry.service_type);
        if let Some(node) = group.nodes.iter_mut().find(|node| {
            node.implementation_type.as_ref() == Some(implementation)
                && node.key == entry.key
                && node.lifetime == Some(entry.lifetime)
        }) {
            node.add_feature(entry.feature);
            return;
        }

        let mut node = ServiceNode {
            service_type: entry.service_type.clone(),
            implementation_type: Some(implementation.clone()),
            key: entry.key.clone(),
            lifetime: Some(entry.lifetime),
            decorators: Vec::new(),
            features: vec![entry.feature],
        };
        self.reconcile_placeholders(&mut node);
        self.group_mut(&entry.service_type).nodes.push(node);
    }

    fn reconcile_placeholders(&mut self, node: &mut ServiceNode) {
        let service_type = node.service_type.clone();
        let node_key = node.key.clone();
        for group in self.groups.iter_mut().filter(|group| group.covers(&service_type)) {
            let (selecting, waiting): (Vec<_>, Vec<_>) = group
                .nodes
                .drain(..)
                .partition(|candidate| candidate.is_placeholder() && key_selects(candidate.key(), node.key()));
            group.nodes = waiting;
            group.settled.extend(selecting);

            for placeholder in group.settled.iter().filter(|candidate| key_selects(candidate.key(), node_key.as_deref())) {
                for decorator in &placeholder.decorators {
                    node.add_decorator(decorator);
                }
                for feature in &placeholder.features {
                    node.add_feature(*feature);
                }
            }
        }
    }

    fn attach_decorator(
        &mut self,
        contract: &TypeRef,
        decorator: &TypeRef,
        key: Option<&str>,
        feature: Feature,
        wildcard_generic: bool,
    ) {
        let definition = contract.definition().filter(|_| wildcard_generic);
        let mut matched = false;

        for group in &mut self.groups {
            let selected = match &definition {
                Some(definition) => group.contract.is_instance_of(definition) && !group.contract.is_open(),
                None => group.contract == *contract,
            };
            if !selected {
                continue;
            }
            for node in group.nodes.iter_mut().filter(|node| !node.is_placeholder()) {
                if key_selects(key, node.key()) {
                    node.add_decorator(decorator);
                    node.add_feature(feature);
                    matched = true;
                }
            }
        }

        if matched {
            return;
        }

        let group = self.group_mut(contract);
        match group
            .nodes
            .iter_mut()
            .find(|node| node.is_placeholder() && node.key() == key)
        {
            Some(placeholder) => {
                placeholder.add_decorator(decorator);
                placeholder.add_feature(feature);
            }
            None => group.nodes.push(ServiceNode {
                service_type: contract.clone(),
                implementation_type: None,
                key: key.map(str::to_string),
                lifetime: None,
                decorators: vec![decorator.clone()],
                features: vec![feature],
            }),
        }
    }

    /// Nodes registered under `contract`
    pub fn services_of(&self, contract: &TypeRef) -> &[ServiceNode] {
        self.groups
            .iter()
            .find(|group| group.contract == *contract)
            .map(|group| group.nodes.as_slice())
            .unwrap_or(&[])
    }

    pub fn contracts(&self) -> impl Iterator<Item = &TypeRef> {
        self.groups.iter().map(|group| &group.contract)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ServiceNode> {
        self.groups.iter().flat_map(|group| group.nodes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for ServiceGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.contract, &group.nodes)?;
        }
        map.end()
    }
}

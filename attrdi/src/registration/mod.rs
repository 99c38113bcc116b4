//! Attribute-driven registration
//!
//! [`ServiceCollection::add_attribute_based_di`] is the entry point: it reads
//! the active feature flags, takes the discovered declarations (or a supplied
//! [`Manifest`]) and, for each module filter in turn, registers every active
//! service and then applies every active decorator in ascending order. The
//! resolved [`FeatureSet`] is registered as a singleton, and every step is
//! mirrored into a [`ServiceGraph`].
//!
//! # Example
//!
//! ```rust,ignore
//! use attrdi::{Configuration, ServiceCollection};
//!
//! let configuration = Configuration::from_toml_str(SETTINGS)?;
//! let provider = ServiceCollection::new()
//!     .add_attribute_based_di(&configuration, |options| {
//!         options.features_from_config::<Features>();
//!     }, &["app::*"])?
//!     .build();
//!
//! let greeter = provider.get_required::<dyn Greeter>()?;
//! ```

pub mod decorators;
pub mod services;
pub mod settings;

pub use decorators::{decorate, DecorationOutcome, DecorationRequest};
pub use services::{bind_options, register_all};
pub use settings::{DiOptions, DEFAULT_FEATURES_PATH};

use std::sync::Arc;

use crate::classifier::{classify, resolve_decorator_contract, RegistrationEntry};
use crate::config::Configuration;
use crate::container::{ServiceCollection, ServiceProvider};
use crate::declarations::DecoratorDeclaration;
use crate::discovery::Manifest;
use crate::error::Result;
use crate::features::{FeatureCategory, FeatureSet};
use crate::graph::ServiceGraph;
use crate::types::TypeRef;

/// A collection being populated by registration passes, with its graph
#[derive(Debug, Default)]
pub struct RegistrationSummary {
    services: ServiceCollection,
    graph: ServiceGraph,
}

impl RegistrationSummary {
    pub fn new(services: ServiceCollection) -> Self {
        Self {
            services,
            graph: ServiceGraph::new(),
        }
    }

    /// Run one registration pass
    ///
    /// An empty `filters` slice means every module (`["*"]`). Later passes
    /// merge into the same graph and may decorate earlier registrations.
    pub fn scan(&mut self, configuration: &Configuration, options: &DiOptions, filters: &[&str]) -> Result<()> {
        let features = options.active_features(configuration)?;
        let manifest = match options.manifest() {
            Some(manifest) => manifest.clone(),
            None => Manifest::discover(),
        };
        let filters: &[&str] = if filters.is_empty() { &["*"] } else { filters };

        tracing::info!(?filters, features = ?features, "Registering attribute-based services");

        for filter in filters {
            let selected = manifest.select(filter);
            self.register_services(&selected, configuration, &features)?;
            self.apply_decorators(&selected, &features, options.is_strict())?;
        }

        self.services.remove_all(&TypeRef::of::<FeatureSet>(), None);
        self.services.add_instance(Arc::new(features));
        Ok(())
    }

    // Unflagged declarations first, then each active category in the order
    // it was activated.
    fn register_services(&mut self, manifest: &Manifest, configuration: &Configuration, features: &FeatureSet) -> Result<()> {
        for category in categories(features) {
            let entries: Vec<RegistrationEntry> = manifest
                .services()
                .iter()
                .filter(|declaration| declaration.feature.category().copied() == category)
                .filter(|declaration| features.is_active(&declaration.feature))
                .map(|declaration| {
                    if let Some(binding) = &declaration.options {
                        bind_options(&mut self.services, configuration, binding)?;
                    }
                    Ok(classify(declaration))
                })
                .collect::<Result<_>>()?;

            register_all(&mut self.services, &entries);
            for entry in &entries {
                self.graph.add_or_merge(entry);
            }
        }
        Ok(())
    }

    fn apply_decorators(&mut self, manifest: &Manifest, features: &FeatureSet, strict: bool) -> Result<()> {
        let mut active: Vec<&DecoratorDeclaration> = manifest
            .decorators()
            .iter()
            .filter(|declaration| features.is_active(&declaration.feature))
            .collect();
        active.sort_by_key(|declaration| declaration.effective_order());

        for declaration in active {
            let contract = resolve_decorator_contract(declaration)?;
            let request = DecorationRequest {
                contract: &contract,
                decorator: &declaration.decorator,
                key: declaration.key.as_deref(),
                open_generics_as_wildcard: declaration.open_generics_as_wildcard,
                strict,
            };

            let outcome = decorate(&mut self.services, manifest.generics(), &request)?;
            tracing::debug!(
                decorator = %declaration.decorator.type_ref(),
                contract = %contract,
                order = declaration.effective_order(),
                ?outcome,
                "Applied decorator"
            );

            if outcome != DecorationOutcome::Unsupported {
                self.graph.add_decorator(
                    &contract,
                    declaration.decorator.type_ref(),
                    declaration.key.as_deref(),
                    declaration.feature,
                    request.is_wildcard_generic(),
                );
            }
        }
        Ok(())
    }

    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    /// Direct access for manual registrations between passes
    pub fn services_mut(&mut self) -> &mut ServiceCollection {
        &mut self.services
    }

    pub fn graph(&self) -> &ServiceGraph {
        &self.graph
    }

    pub fn into_parts(self) -> (ServiceCollection, ServiceGraph) {
        (self.services, self.graph)
    }

    /// Freeze into a provider that exposes the graph
    pub fn build(self) -> ServiceProvider {
        let (services, graph) = self.into_parts();
        services.build_with_graph(graph)
    }
}

fn categories(features: &FeatureSet) -> Vec<Option<FeatureCategory>> {
    std::iter::once(None)
        .chain(features.categories().copied().map(Some))
        .collect()
}

impl ServiceCollection {
    /// Register discovered services and decorators into this collection
    ///
    /// `configure` adjusts [`DiOptions`]; `filters` selects modules
    /// (see [`module_matches`](crate::wildcard::module_matches)), defaulting
    /// to every module.
    pub fn add_attribute_based_di<F>(self, configuration: &Configuration, configure: F, filters: &[&str]) -> Result<RegistrationSummary>
    where
        F: FnOnce(&mut DiOptions),
    {
        let mut options = DiOptions::new();
        configure(&mut options);

        let mut summary = RegistrationSummary::new(self);
        summary.scan(configuration, &options, filters)?;
        Ok(summary)
    }

    pub(crate) fn build_with_graph(self, graph: ServiceGraph) -> ServiceProvider {
        ServiceProvider::new(self.into_descriptors(), Arc::new(graph))
    }
}

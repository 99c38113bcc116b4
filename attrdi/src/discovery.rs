//! Declaration discovery
//!
//! `#[service]`, `#[decorator]`, `#[derive(Component)]` and [`close_generic!`]
//! submit static entries through `inventory`; [`Manifest::discover`] collects
//! them into owned declarations. A [`Manifest`] can also be assembled by hand
//! or extended from a configuration section, and narrowed to a set of modules
//! with [`Manifest::select`].
//!
//! Discovered declarations are ordered by module path, then implementation
//! type name, so registration order does not depend on link order.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::component::{Component, ComponentDescriptor};
use crate::config::Configuration;
use crate::declarations::{
    normalize_key, DecoratorDeclaration, Lifetime, OptionsBinding, ServiceDeclaration,
};
use crate::error::{Error, Result};
use crate::features::Feature;
use crate::types::{GenericDef, TypeRef};
use crate::wildcard;

/// Static registration emitted by `#[service]`
pub struct ServiceEntry {
    pub module: &'static str,
    pub component: fn() -> ComponentDescriptor,
    pub contract: Option<fn() -> TypeRef>,
    pub lifetime: Lifetime,
    pub key: Option<&'static str>,
    pub feature: fn() -> Feature,
    pub options: Option<fn() -> OptionsBinding>,
}

/// Static registration emitted by `#[decorator]`
pub struct DecoratorEntry {
    pub module: &'static str,
    pub component: fn() -> ComponentDescriptor,
    pub contract: Option<fn() -> TypeRef>,
    pub order: u32,
    pub key: Option<&'static str>,
    pub feature: fn() -> Feature,
    pub open_generics_as_wildcard: bool,
}

/// Every non-generic `#[derive(Component)]` type, addressable by name
pub struct ComponentEntry {
    pub module: &'static str,
    pub component: fn() -> ComponentDescriptor,
}

/// A closed instance of a generic component, emitted by [`close_generic!`]
pub struct ClosedGenericEntry {
    pub component: fn() -> ComponentDescriptor,
}

inventory::collect!(ServiceEntry);
inventory::collect!(DecoratorEntry);
inventory::collect!(ComponentEntry);
inventory::collect!(ClosedGenericEntry);

/// Make closed instances of generic components available to open generic
/// decoration
///
/// Generic code is only instantiated for argument types named at compile
/// time, so each closed decorator an application needs is listed once.
///
/// # Example
/// ```rust,ignore
/// attrdi::close_generic!(AuditedRepository<Order>, AuditedRepository<Vec<User>>);
/// ```
#[macro_export]
macro_rules! close_generic {
    ($($component:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::discovery::ClosedGenericEntry {
                    component: <$component as $crate::Component>::component,
                }
            }
        )+
    };
}

/// Closed generic components, looked up by definition and arguments
#[derive(Clone, Default)]
pub struct GenericCatalog {
    closed: HashMap<(GenericDef, Vec<TypeRef>), Arc<ComponentDescriptor>>,
}

impl GenericCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a closed generic component; non-generic components are ignored
    pub fn insert(&mut self, component: ComponentDescriptor) {
        let type_ref = component.type_ref().clone();
        match type_ref.definition() {
            Some(definition) if !type_ref.is_open() => {
                self.closed
                    .insert((definition, type_ref.arguments().to_vec()), Arc::new(component));
            }
            _ => tracing::warn!(component = %type_ref, "Ignoring non-generic or open component in generic catalog"),
        }
    }

    pub fn register<C: Component>(&mut self) {
        self.insert(C::component());
    }

    /// The instance of `definition` closed over `arguments`, if known
    pub fn close(&self, definition: &GenericDef, arguments: &[TypeRef]) -> Option<Arc<ComponentDescriptor>> {
        self.closed.get(&(*definition, arguments.to_vec())).cloned()
    }

    pub fn len(&self) -> usize {
        self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty()
    }

    fn merge(&mut self, other: &GenericCatalog) {
        for (key, component) in &other.closed {
            self.closed.insert(key.clone(), Arc::clone(component));
        }
    }
}

impl fmt::Debug for GenericCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.closed.values().map(|component| component.type_ref()))
            .finish()
    }
}

#[derive(Clone)]
struct NamedComponent {
    module: String,
    component: Arc<ComponentDescriptor>,
}

/// The set of declarations a registration pass works from
#[derive(Clone, Default)]
pub struct Manifest {
    services: Vec<ServiceDeclaration>,
    decorators: Vec<DecoratorDeclaration>,
    generics: GenericCatalog,
    components: Vec<NamedComponent>,
}

static DISCOVERED: OnceLock<Manifest> = OnceLock::new();

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted by the attribute macros in the linked program
    pub fn discover() -> Self {
        DISCOVERED.get_or_init(Self::collect).clone()
    }

    fn collect() -> Self {
        let mut manifest = Self::new();

        for entry in inventory::iter::<ServiceEntry> {
            manifest.services.push(ServiceDeclaration {
                implementation: Arc::new((entry.component)()),
                contract: entry.contract.map(|contract| contract()),
                lifetime: entry.lifetime,
                key: normalize_key(entry.key.map(str::to_string)),
                feature: (entry.feature)(),
                options: entry.options.map(|options| options()),
                module: entry.module.to_string(),
            });
        }

        for entry in inventory::iter::<DecoratorEntry> {
            manifest.decorators.push(DecoratorDeclaration {
                decorator: Arc::new((entry.component)()),
                contract: entry.contract.map(|contract| contract()),
                order: entry.order.max(1),
                key: normalize_key(entry.key.map(str::to_string)),
                feature: (entry.feature)(),
                open_generics_as_wildcard: entry.open_generics_as_wildcard,
                module: entry.module.to_string(),
            });
        }

        for entry in inventory::iter::<ComponentEntry> {
            manifest.components.push(NamedComponent {
                module: entry.module.to_string(),
                component: Arc::new((entry.component)()),
            });
        }

        for entry in inventory::iter::<ClosedGenericEntry> {
            manifest.generics.insert((entry.component)());
        }

        manifest.services.sort_by(|a, b| {
            (a.module.as_str(), a.implementation.type_ref().name(), a.key.as_deref())
                .cmp(&(b.module.as_str(), b.implementation.type_ref().name(), b.key.as_deref()))
        });
        manifest.decorators.sort_by(|a, b| {
            (a.module.as_str(), a.decorator.type_ref().name(), a.key.as_deref())
                .cmp(&(b.module.as_str(), b.decorator.type_ref().name(), b.key.as_deref()))
        });

        tracing::debug!(
            services = manifest.services.len(),
            decorators = manifest.decorators.len(),
            generics = manifest.generics.len(),
            "Discovered declarations"
        );
        manifest
    }

    pub fn with_service(mut self, declaration: ServiceDeclaration) -> Self {
        self.services.push(declaration);
        self
    }

    pub fn with_decorator(mut self, declaration: DecoratorDeclaration) -> Self {
        self.decorators.push(declaration);
        self
    }

    /// Make a closed generic component available to open generic decoration
    pub fn with_closed_generic<C: Component>(mut self) -> Self {
        self.generics.register::<C>();
        self
    }

    /// Make a component addressable by name from configuration
    pub fn with_component<C: Component>(mut self, module: &str) -> Self {
        self.components.push(NamedComponent {
            module: module.to_string(),
            component: Arc::new(C::component()),
        });
        self
    }

    /// Append everything from `other`
    pub fn merge(&mut self, other: Manifest) {
        self.services.extend(other.services);
        self.decorators.extend(other.decorators);
        self.generics.merge(&other.generics);
        self.components.extend(other.components);
    }

    /// Declarations made in modules selected by `filter`
    ///
    /// The generic catalog and named components are kept whole.
    pub fn select(&self, filter: &str) -> Manifest {
        Manifest {
            services: self
                .services
                .iter()
                .filter(|declaration| wildcard::module_matches(&declaration.module, filter))
                .cloned()
                .collect(),
            decorators: self
                .decorators
                .iter()
                .filter(|declaration| wildcard::module_matches(&declaration.module, filter))
                .cloned()
                .collect(),
            generics: self.generics.clone(),
            components: self.components.clone(),
        }
    }

    pub fn services(&self) -> &[ServiceDeclaration] {
        &self.services
    }

    pub fn decorators(&self) -> &[DecoratorDeclaration] {
        &self.decorators
    }

    pub fn generics(&self) -> &GenericCatalog {
        &self.generics
    }

    /// Find a named component by full path, `module::Type`, or bare type name
    pub fn component_named(&self, name: &str) -> Option<Arc<ComponentDescriptor>> {
        self.named(name).map(|named| named.component)
    }

    fn named(&self, name: &str) -> Option<NamedComponent> {
        self.components
            .iter()
            .find(|named| {
                let type_ref = named.component.type_ref();
                type_ref.name() == name
                    || type_ref.short_name() == name
                    || format!("{}::{}", named.module, type_ref.short_name()) == name
            })
            .cloned()
    }

    /// Add declarations listed in a configuration section
    ///
    /// Components are looked up with [`component_named`](Self::component_named)
    /// and the declarations belong to the component's module. Unknown
    /// components are skipped with a warning; unknown lifetimes and unknown
    /// contracts are errors.
    ///
    /// ```toml
    /// [[attrdi.services]]
    /// implementation = "SmtpMailer"
    /// contract = "dyn Mailer"
    /// lifetime = "Singleton"
    ///
    /// [[attrdi.decorators]]
    /// implementation = "RetryingMailer"
    /// order = 2
    /// ```
    pub fn extend_from_configuration(&mut self, configuration: &Configuration, path: &str) -> Result<()> {
        let Some(file) = configuration.get::<ManifestSection>(path)? else {
            return Ok(());
        };
        for record in file.services {
            let Some(NamedComponent { module, component }) = self.named(&record.implementation) else {
                tracing::warn!(implementation = %record.implementation, "Unknown component in configured services; skipping");
                continue;
            };
            let lifetime = match record.lifetime.as_deref() {
                Some(name) => name.parse::<Lifetime>()?,
                None => Lifetime::default(),
            };
            let contract = record
                .contract
                .as_deref()
                .map(|name| contract_named(&component, name))
                .transpose()?;

            self.services.push(ServiceDeclaration {
                implementation: component,
                contract,
                lifetime,
                key: normalize_key(record.key),
                feature: Feature::none(),
                options: None,
                module,
            });
        }

        for record in file.decorators {
            let Some(NamedComponent { module, component }) = self.named(&record.implementation) else {
                tracing::warn!(implementation = %record.implementation, "Unknown component in configured decorators; skipping");
                continue;
            };
            let contract = record
                .contract
                .as_deref()
                .map(|name| contract_named(&component, name))
                .transpose()?;

            self.decorators.push(DecoratorDeclaration {
                decorator: component,
                contract,
                order: record.order.unwrap_or(1).max(1),
                key: normalize_key(record.key),
                feature: Feature::none(),
                open_generics_as_wildcard: false,
                module,
            });
        }

        Ok(())
    }
}

impl fmt::Debug for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manifest")
            .field("services", &self.services.len())
            .field("decorators", &self.decorators.len())
            .field("generics", &self.generics)
            .finish()
    }
}

fn contract_named(component: &ComponentDescriptor, name: &str) -> Result<TypeRef> {
    std::iter::once(component.type_ref())
        .chain(component.interfaces())
        .find(|type_ref| type_ref.name() == name || type_ref.short_name() == name)
        .cloned()
        .ok_or_else(|| {
            Error::configuration(format!(
                "'{}' does not implement a contract named '{}'",
                component.type_ref(),
                name
            ))
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestSection {
    services: Vec<ServiceRecord>,
    decorators: Vec<DecoratorRecord>,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    implementation: String,
    contract: Option<String>,
    lifetime: Option<String>,
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DecoratorRecord {
    implementation: String,
    contract: Option<String>,
    order: Option<u32>,
    key: Option<String>,
}

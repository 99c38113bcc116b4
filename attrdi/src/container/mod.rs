//! Service collection and provider
//!
//! The [`ServiceCollection`] is the mutable registration table: an ordered
//! list of [`ServiceDescriptor`]s, each binding a contract (optionally keyed)
//! to an instance, a factory or a component type with a [`Lifetime`].
//! Building it yields an immutable [`ServiceProvider`] that resolves
//! contracts.
//!
//! # Example
//!
//! ```rust,ignore
//! use attrdi::{Lifetime, ServiceCollection};
//!
//! let mut services = ServiceCollection::new();
//! services.add_instance::<dyn Clock>(Arc::new(SystemClock));
//! services.add_factory::<dyn Greeter, _>(Lifetime::Scoped, |provider| {
//!     Ok(Arc::new(ConsoleGreeter::new(provider.get_required::<dyn Clock>()?)))
//! });
//!
//! let provider = services.build();
//! let greeter = provider.get_required::<dyn Greeter>()?;
//! ```

pub mod provider;

pub use provider::ServiceProvider;

use std::fmt;
use std::sync::Arc;

use crate::component::{ComponentDescriptor, Instance};
use crate::declarations::{normalize_key, Lifetime};
use crate::error::Result;
use crate::types::TypeRef;

/// Factory closure producing an instance of the descriptor's contract
pub type Factory = Arc<dyn Fn(&ServiceProvider) -> Result<Instance> + Send + Sync>;

/// Where instances of a registration come from
#[derive(Clone)]
pub enum ImplementationSource {
    /// A prebuilt instance, shared by every resolution
    Instance(Instance),
    /// A closure invoked with the provider
    Factory(Factory),
    /// A component activated by resolving its dependencies
    Type(Arc<ComponentDescriptor>),
}

/// Identity of a descriptor within one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(u64);

/// One entry in the registration table
#[derive(Clone)]
pub struct ServiceDescriptor {
    id: DescriptorId,
    service_type: TypeRef,
    key: Option<String>,
    lifetime: Lifetime,
    implementation_type: Option<TypeRef>,
    source: ImplementationSource,
}

impl ServiceDescriptor {
    fn with_source(
        service_type: TypeRef,
        lifetime: Lifetime,
        implementation_type: Option<TypeRef>,
        source: ImplementationSource,
    ) -> Self {
        Self {
            id: DescriptorId(0),
            service_type,
            key: None,
            lifetime,
            implementation_type,
            source,
        }
    }

    /// Activate `component` whenever `service_type` is requested
    pub fn from_type(service_type: TypeRef, component: Arc<ComponentDescriptor>, lifetime: Lifetime) -> Self {
        let implementation_type = Some(component.type_ref().clone());
        Self::with_source(
            service_type,
            lifetime,
            implementation_type,
            ImplementationSource::Type(component),
        )
    }

    /// Always hand out `instance` (singleton by definition)
    pub fn from_instance(instance: Instance) -> Self {
        Self::with_source(
            instance.contract().clone(),
            Lifetime::Singleton,
            None,
            ImplementationSource::Instance(instance),
        )
    }

    pub fn from_factory(service_type: TypeRef, lifetime: Lifetime, factory: Factory) -> Self {
        Self::with_source(service_type, lifetime, None, ImplementationSource::Factory(factory))
    }

    pub fn with_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.key = normalize_key(key.map(Into::into));
        self
    }

    /// Record the type a factory ultimately produces, for introspection
    pub fn with_implementation_type(mut self, implementation_type: TypeRef) -> Self {
        self.implementation_type = Some(implementation_type);
        self
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    pub fn service_type(&self) -> &TypeRef {
        &self.service_type
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Concrete type behind the registration, when known
    pub fn implementation_type(&self) -> Option<&TypeRef> {
        self.implementation_type.as_ref()
    }

    pub fn source(&self) -> &ImplementationSource {
        &self.source
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            ImplementationSource::Instance(_) => "instance",
            ImplementationSource::Factory(_) => "factory",
            ImplementationSource::Type(_) => "type",
        };
        f.debug_struct("ServiceDescriptor")
            .field("service_type", &self.service_type)
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("implementation_type", &self.implementation_type)
            .field("source", &source)
            .finish()
    }
}

/// Ordered, mutable registration table
#[derive(Clone, Default, Debug)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
    next_id: u64,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor, assigning it a fresh id
    pub fn add(&mut self, mut descriptor: ServiceDescriptor) -> DescriptorId {
        descriptor.id = self.allocate_id();
        let id = descriptor.id;
        self.descriptors.push(descriptor);
        id
    }

    fn allocate_id(&mut self) -> DescriptorId {
        self.next_id += 1;
        DescriptorId(self.next_id)
    }

    pub fn add_type(&mut self, contract: TypeRef, component: Arc<ComponentDescriptor>, lifetime: Lifetime) -> DescriptorId {
        self.add(ServiceDescriptor::from_type(contract, component, lifetime))
    }

    pub fn add_keyed_type(
        &mut self,
        contract: TypeRef,
        key: impl Into<String>,
        component: Arc<ComponentDescriptor>,
        lifetime: Lifetime,
    ) -> DescriptorId {
        self.add(ServiceDescriptor::from_type(contract, component, lifetime).with_key(Some(key)))
    }

    /// Register a prebuilt value under the contract `T`
    pub fn add_instance<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> DescriptorId {
        self.add(ServiceDescriptor::from_instance(Instance::new(value)))
    }

    /// Register a closure producing `Arc<T>`
    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> DescriptorId
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceProvider) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        let erased: Factory = Arc::new(move |provider| factory(provider).map(Instance::new));
        self.add(ServiceDescriptor::from_factory(TypeRef::of::<T>(), lifetime, erased))
    }

    /// Swap the descriptor with `id` in place, keeping its position
    ///
    /// The replacement receives a fresh id. Returns `None` when `id` is not
    /// in the collection.
    pub fn replace(&mut self, id: DescriptorId, mut replacement: ServiceDescriptor) -> Option<DescriptorId> {
        let position = self.descriptors.iter().position(|d| d.id == id)?;
        replacement.id = self.allocate_id();
        let new_id = replacement.id;
        self.descriptors[position] = replacement;
        Some(new_id)
    }

    /// Remove every registration of `contract` with exactly `key`
    pub fn remove_all(&mut self, contract: &TypeRef, key: Option<&str>) -> usize {
        let before = self.descriptors.len();
        self.descriptors
            .retain(|d| !(d.service_type == *contract && d.key() == key));
        before - self.descriptors.len()
    }

    pub fn get(&self, id: DescriptorId) -> Option<&ServiceDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Registrations of `contract` with exactly `key`, in registration order
    pub fn find<'a>(&'a self, contract: &'a TypeRef, key: Option<&'a str>) -> impl Iterator<Item = &'a ServiceDescriptor> + 'a {
        self.descriptors
            .iter()
            .filter(move |d| d.service_type == *contract && d.key() == key)
    }

    /// Registrations satisfying `predicate`, in registration order
    pub fn matching<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a ServiceDescriptor> + 'a
    where
        P: Fn(&ServiceDescriptor) -> bool + 'a,
    {
        self.descriptors.iter().filter(move |d| predicate(d))
    }

    pub fn contains(&self, contract: &TypeRef, key: Option<&str>) -> bool {
        self.find(contract, key).next().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub(crate) fn into_descriptors(self) -> Vec<ServiceDescriptor> {
        self.descriptors
    }

    /// Freeze the table into a provider
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::new(self.descriptors, Default::default())
    }
}

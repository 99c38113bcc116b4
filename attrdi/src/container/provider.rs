//! Resolution of registered services
//!
//! Single resolution returns the last registration for a contract and key;
//! [`ServiceProvider::get_all`] returns every registration in order.
//! Singletons are cached per provider, scoped instances per scope created
//! with [`ServiceProvider::create_scope`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DescriptorId, ImplementationSource, ServiceDescriptor};
use crate::component::{Arguments, ComponentDescriptor, Instance};
use crate::declarations::Lifetime;
use crate::error::{Error, Result};
use crate::graph::ServiceGraph;
use crate::types::TypeRef;

type Cache = Mutex<HashMap<DescriptorId, Instance>>;

struct Registry {
    descriptors: Vec<ServiceDescriptor>,
    index: HashMap<(TypeId, Option<String>), Vec<usize>>,
    singletons: Cache,
    graph: Arc<ServiceGraph>,
}

/// Immutable resolver built from a [`ServiceCollection`](super::ServiceCollection)
///
/// Cloning is cheap and shares caches; [`create_scope`](Self::create_scope)
/// shares singletons but starts an empty scoped cache.
#[derive(Clone)]
pub struct ServiceProvider {
    registry: Arc<Registry>,
    scope: Arc<Cache>,
}

impl ServiceProvider {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>, graph: Arc<ServiceGraph>) -> Self {
        let mut index: HashMap<(TypeId, Option<String>), Vec<usize>> = HashMap::new();
        for (position, descriptor) in descriptors.iter().enumerate() {
            index
                .entry((descriptor.service_type().id(), descriptor.key.clone()))
                .or_default()
                .push(position);
        }

        Self {
            registry: Arc::new(Registry {
                descriptors,
                index,
                singletons: Mutex::new(HashMap::new()),
                graph,
            }),
            scope: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A child provider with its own scoped instances
    pub fn create_scope(&self) -> ServiceProvider {
        Self {
            registry: Arc::clone(&self.registry),
            scope: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Introspection graph recorded during registration
    pub fn graph(&self) -> &ServiceGraph {
        &self.registry.graph
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.registry.descriptors
    }

    fn positions(&self, contract: &TypeRef, key: Option<&str>) -> &[usize] {
        self.registry
            .index
            .get(&(contract.id(), key.map(str::to_string)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_registered(&self, contract: &TypeRef, key: Option<&str>) -> bool {
        !self.positions(contract, key).is_empty()
    }

    /// Resolve the last registration of `contract` with exactly `key`
    pub fn resolve(&self, contract: &TypeRef, key: Option<&str>) -> Result<Option<Instance>> {
        match self.positions(contract, key).last() {
            Some(&position) => self.resolve_descriptor(&self.registry.descriptors[position]).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve every registration of `contract` with exactly `key`, in order
    pub fn resolve_all(&self, contract: &TypeRef, key: Option<&str>) -> Result<Vec<Instance>> {
        self.positions(contract, key)
            .iter()
            .map(|&position| self.resolve_descriptor(&self.registry.descriptors[position]))
            .collect()
    }

    fn resolve_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<Instance> {
        match descriptor.lifetime() {
            Lifetime::Transient => self.create_instance(descriptor),
            Lifetime::Singleton => self.cached(&self.registry.singletons, descriptor),
            Lifetime::Scoped => self.cached(&self.scope, descriptor),
        }
    }

    // The lock is released while constructing so factories may resolve other
    // services; a racing construction keeps the first stored instance.
    fn cached(&self, cache: &Cache, descriptor: &ServiceDescriptor) -> Result<Instance> {
        if let Some(instance) = cache.lock().get(&descriptor.id()) {
            return Ok(instance.clone());
        }
        let created = self.create_instance(descriptor)?;
        Ok(cache
            .lock()
            .entry(descriptor.id())
            .or_insert(created)
            .clone())
    }

    /// Build a fresh instance of a descriptor, bypassing lifetime caches
    ///
    /// Decorators use this to obtain the registration they wrap.
    pub fn create_instance(&self, descriptor: &ServiceDescriptor) -> Result<Instance> {
        match descriptor.source() {
            ImplementationSource::Instance(instance) => Ok(instance.clone()),
            ImplementationSource::Factory(factory) => factory(self),
            ImplementationSource::Type(component) => self.activate(component, descriptor.service_type()),
        }
    }

    /// Construct `component`, resolving every dependency, and view it as `contract`
    pub fn activate(&self, component: &ComponentDescriptor, contract: &TypeRef) -> Result<Instance> {
        self.activate_with(component, contract, None)
    }

    /// Like [`activate`](Self::activate), but the parameter at `supplied.0`
    /// receives `supplied.1` instead of being resolved
    pub fn activate_with(
        &self,
        component: &ComponentDescriptor,
        contract: &TypeRef,
        supplied: Option<(usize, Option<Instance>)>,
    ) -> Result<Instance> {
        let mut supplied = supplied;
        let mut values = Vec::with_capacity(component.dependencies().len());

        for (index, dependency) in component.dependencies().iter().enumerate() {
            if matches!(supplied, Some((slot, _)) if slot == index) {
                values.push(supplied.take().and_then(|(_, value)| value));
                continue;
            }

            let resolved = self.resolve(dependency.type_ref(), dependency.key())?;
            if resolved.is_none() && !dependency.is_optional() {
                return Err(Error::activation(
                    component.type_ref(),
                    format!(
                        "no registration for dependency '{}'{}",
                        dependency.type_ref(),
                        dependency
                            .key()
                            .map(|key| format!(" with key '{}'", key))
                            .unwrap_or_default()
                    ),
                ));
            }
            values.push(resolved);
        }

        let mut arguments = Arguments::new(component.type_ref().clone(), values);
        let value = component.construct(&mut arguments)?;
        component.cast_to(value, contract)
    }

    pub fn get<T: ?Sized + 'static>(&self) -> Result<Option<Arc<T>>> {
        self.typed(self.resolve(&TypeRef::of::<T>(), None)?)
    }

    pub fn get_keyed<T: ?Sized + 'static>(&self, key: &str) -> Result<Option<Arc<T>>> {
        self.typed(self.resolve(&TypeRef::of::<T>(), Some(key))?)
    }

    /// Resolve `T`, failing with [`Error::ServiceNotFound`] when unregistered
    pub fn get_required<T: ?Sized + 'static>(&self) -> Result<Arc<T>> {
        self.get::<T>()?
            .ok_or_else(|| Error::service_not_found(&TypeRef::of::<T>(), None))
    }

    pub fn get_required_keyed<T: ?Sized + 'static>(&self, key: &str) -> Result<Arc<T>> {
        self.get_keyed::<T>(key)?
            .ok_or_else(|| Error::service_not_found(&TypeRef::of::<T>(), Some(key)))
    }

    /// Every unkeyed registration of `T`, in registration order
    pub fn get_all<T: ?Sized + 'static>(&self) -> Result<Vec<Arc<T>>> {
        self.resolve_all(&TypeRef::of::<T>(), None)?
            .into_iter()
            .map(|instance| expect_type::<T>(instance))
            .collect()
    }

    fn typed<T: ?Sized + 'static>(&self, instance: Option<Instance>) -> Result<Option<Arc<T>>> {
        instance.map(expect_type::<T>).transpose()
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("descriptors", &self.registry.descriptors.len())
            .field("singletons", &self.registry.singletons.lock().len())
            .field("scoped", &self.scope.lock().len())
            .finish()
    }
}

fn expect_type<T: ?Sized + 'static>(instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().ok_or_else(|| {
        Error::activation(
            &TypeRef::of::<T>(),
            format!("resolved instance is a {}", instance.contract()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Dependency, Erased};
    use crate::container::ServiceCollection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Counter: Send + Sync {
        fn id(&self) -> usize;
    }

    struct Numbered(usize);

    impl Counter for Numbered {
        fn id(&self) -> usize {
            self.0
        }
    }

    fn counting(lifetime: Lifetime) -> ServiceProvider {
        let next = Arc::new(AtomicUsize::new(0));
        let mut services = ServiceCollection::new();
        services.add_factory::<dyn Counter, _>(lifetime, move |_| {
            Ok(Arc::new(Numbered(next.fetch_add(1, Ordering::SeqCst))))
        });
        services.build()
    }

    fn id_of(provider: &ServiceProvider) -> usize {
        provider.get_required::<dyn Counter>().unwrap().id()
    }

    #[test]
    fn transient_builds_every_time() {
        let provider = counting(Lifetime::Transient);
        assert_ne!(id_of(&provider), id_of(&provider));
    }

    #[test]
    fn singleton_is_shared_across_scopes() {
        let provider = counting(Lifetime::Singleton);
        let scope = provider.create_scope();
        assert_eq!(id_of(&provider), id_of(&scope));
    }

    #[test]
    fn scoped_is_shared_within_a_scope_only() {
        let provider = counting(Lifetime::Scoped);
        let first = provider.create_scope();
        let second = provider.create_scope();

        assert_eq!(id_of(&first), id_of(&first));
        assert_ne!(id_of(&first), id_of(&second));
    }

    #[test]
    fn last_registration_wins_and_all_are_enumerable() {
        let mut services = ServiceCollection::new();
        services.add_instance::<dyn Counter>(Arc::new(Numbered(1)));
        services.add_instance::<dyn Counter>(Arc::new(Numbered(2)));
        let provider = services.build();

        assert_eq!(id_of(&provider), 2);
        let all: Vec<usize> = provider.get_all::<dyn Counter>().unwrap().iter().map(|c| c.id()).collect();
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn missing_services_report_not_found() {
        let provider = ServiceCollection::new().build();
        assert!(provider.get::<dyn Counter>().unwrap().is_none());
        assert!(matches!(
            provider.get_required_keyed::<dyn Counter>("blue"),
            Err(Error::ServiceNotFound { key: Some(ref key), .. }) if key == "blue"
        ));
    }

    struct Holder {
        counter: Option<Arc<dyn Counter>>,
    }

    fn holder(optional: bool) -> ComponentDescriptor {
        ComponentDescriptor::new::<Holder>(TypeRef::of::<Holder>(), |arguments| {
            let counter = arguments.optional::<dyn Counter>(0)?;
            Ok(Arc::new(Holder { counter }) as Erased)
        })
        .depends_on(Dependency::new(TypeRef::of::<dyn Counter>(), optional, None))
    }

    #[test]
    fn activation_resolves_dependencies() {
        let mut services = ServiceCollection::new();
        services.add_instance::<dyn Counter>(Arc::new(Numbered(9)));
        let provider = services.build();

        let instance = provider.activate(&holder(false), &TypeRef::of::<Holder>()).unwrap();
        let holder = instance.downcast::<Holder>().unwrap();
        assert_eq!(holder.counter.as_ref().map(|c| c.id()), Some(9));
    }

    #[test]
    fn optional_dependencies_may_be_missing() {
        let provider = ServiceCollection::new().build();

        let instance = provider.activate(&holder(true), &TypeRef::of::<Holder>()).unwrap();
        assert!(instance.downcast::<Holder>().unwrap().counter.is_none());
        assert!(matches!(
            provider.activate(&holder(false), &TypeRef::of::<Holder>()),
            Err(Error::Activation { .. })
        ));
    }

    #[test]
    fn supplied_arguments_bypass_resolution() {
        let provider = ServiceCollection::new().build();
        let supplied = Instance::new::<dyn Counter>(Arc::new(Numbered(4)));

        let instance = provider
            .activate_with(&holder(false), &TypeRef::of::<Holder>(), Some((0, Some(supplied))))
            .unwrap();
        assert_eq!(instance.downcast::<Holder>().unwrap().counter.as_ref().map(|c| c.id()), Some(4));
    }
}

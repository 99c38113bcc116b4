//! Component descriptors
//!
//! A [`ComponentDescriptor`] is everything the container needs to know about
//! an implementation type: its identity, the contracts it can be viewed as,
//! its constructor dependencies and a constructor. `#[derive(Component)]`
//! generates one; it can also be written by hand.
//!
//! ```rust,ignore
//! impl Component for ConsoleGreeter {
//!     fn component() -> ComponentDescriptor {
//!         ComponentDescriptor::new::<Self>(TypeRef::of::<Self>(), |args| {
//!             Ok(Arc::new(ConsoleGreeter { clock: args.required::<dyn Clock>(0)? }) as Erased)
//!         })
//!         .implements(TypeRef::of::<dyn Greeter>(), |value| {
//!             let concrete = value.downcast::<ConsoleGreeter>().ok()?;
//!             let contract: Arc<dyn Greeter> = concrete;
//!             Some(Instance::new(contract))
//!         })
//!         .depends_on(Dependency::required(TypeRef::of::<dyn Clock>()))
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::TypeRef;

/// Type-erased implementation value, always an `Arc` of the concrete type
pub type Erased = Arc<dyn Any + Send + Sync>;

/// Converts a concrete value into an [`Instance`] of one contract
pub type Caster = fn(Erased) -> Option<Instance>;

/// Builds a concrete value from resolved dependencies
pub type Constructor = fn(&mut Arguments) -> Result<Erased>;

/// A resolved service viewed through one contract
///
/// Internally holds an `Arc<T>` for the contract `T`, which may be a trait
/// object.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    contract: TypeRef,
}

impl Instance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            contract: TypeRef::of::<T>(),
        }
    }

    /// Recover the `Arc<T>` this instance was created from
    pub fn downcast<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn contract(&self) -> &TypeRef {
        &self.contract
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance<{}>", self.contract)
    }
}

/// Implemented by every type the container can construct
pub trait Component: Send + Sync + 'static {
    fn component() -> ComponentDescriptor;
}

/// One constructor parameter
#[derive(Clone, Debug)]
pub struct Dependency {
    type_ref: TypeRef,
    key: Option<String>,
    optional: bool,
}

impl Dependency {
    pub fn required(type_ref: TypeRef) -> Self {
        Self::new(type_ref, false, None)
    }

    pub fn optional(type_ref: TypeRef) -> Self {
        Self::new(type_ref, true, None)
    }

    pub fn new(type_ref: TypeRef, optional: bool, key: Option<&str>) -> Self {
        Self {
            type_ref,
            key: key.filter(|key| !key.is_empty()).map(str::to_string),
            optional,
        }
    }

    /// Resolve this parameter from a keyed registration instead
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into()).filter(|key| !key.is_empty());
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

#[derive(Clone)]
struct Interface {
    type_ref: TypeRef,
    cast: Caster,
}

/// Describes how to build an implementation type and view it as its contracts
#[derive(Clone)]
pub struct ComponentDescriptor {
    type_ref: TypeRef,
    self_cast: Caster,
    construct: Constructor,
    interfaces: Vec<Interface>,
    dependencies: Vec<Dependency>,
}

impl ComponentDescriptor {
    /// Start a descriptor for the concrete type `C`
    pub fn new<C: Send + Sync + 'static>(type_ref: TypeRef, construct: Constructor) -> Self {
        Self {
            type_ref,
            self_cast: |value| value.downcast::<C>().ok().map(Instance::new::<C>),
            construct,
            interfaces: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Declare a contract this type implements, in declaration order
    pub fn implements(mut self, type_ref: TypeRef, cast: Caster) -> Self {
        self.interfaces.push(Interface { type_ref, cast });
        self
    }

    /// Append a constructor parameter
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &TypeRef> {
        self.interfaces.iter().map(|interface| &interface.type_ref)
    }

    /// First declared contract, used when a declaration names none
    pub fn first_interface(&self) -> Option<&TypeRef> {
        self.interfaces.first().map(|interface| &interface.type_ref)
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Index of the first parameter whose type is exactly `contract`
    pub fn parameter_of(&self, contract: &TypeRef) -> Option<usize> {
        self.dependencies
            .iter()
            .position(|dependency| dependency.type_ref == *contract)
    }

    /// Whether values of this type can be viewed as `contract`
    pub fn can_cast_to(&self, contract: &TypeRef) -> bool {
        self.type_ref == *contract || self.interfaces().any(|interface| interface == contract)
    }

    pub fn construct(&self, arguments: &mut Arguments) -> Result<Erased> {
        (self.construct)(arguments)
    }

    /// View a constructed value as `contract`
    pub fn cast_to(&self, value: Erased, contract: &TypeRef) -> Result<Instance> {
        let cast = if self.type_ref == *contract {
            Some(self.self_cast)
        } else {
            self.interfaces
                .iter()
                .find(|interface| interface.type_ref == *contract)
                .map(|interface| interface.cast)
        };

        cast.and_then(|cast| cast(value)).ok_or_else(|| {
            Error::activation(&self.type_ref, format!("cannot be used as '{}'", contract))
        })
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type", &self.type_ref)
            .field("interfaces", &self.interfaces().collect::<Vec<_>>())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Resolved constructor arguments, consumed by index
pub struct Arguments {
    owner: TypeRef,
    values: Vec<Option<Instance>>,
}

impl Arguments {
    pub fn new(owner: TypeRef, values: Vec<Option<Instance>>) -> Self {
        Self { owner, values }
    }

    /// Take a parameter that must be present
    pub fn required<T: ?Sized + 'static>(&mut self, index: usize) -> Result<Arc<T>> {
        self.optional::<T>(index)?.ok_or_else(|| {
            Error::activation(
                &self.owner,
                format!("parameter #{} ({}) was not supplied", index, TypeRef::of::<T>()),
            )
        })
    }

    /// Take a parameter that may be absent
    pub fn optional<T: ?Sized + 'static>(&mut self, index: usize) -> Result<Option<Arc<T>>> {
        match self.values.get_mut(index).and_then(Option::take) {
            None => Ok(None),
            Some(instance) => instance.downcast::<T>().map(Some).ok_or_else(|| {
                Error::activation(
                    &self.owner,
                    format!(
                        "parameter #{} expected {} but received {}",
                        index,
                        TypeRef::of::<T>(),
                        instance.contract()
                    ),
                )
            }),
        }
    }
}

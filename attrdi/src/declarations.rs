//! Registration declarations
//!
//! A [`ServiceDeclaration`] says "register this implementation"; a
//! [`DecoratorDeclaration`] says "wrap existing registrations of this
//! contract". Both are produced by `#[service]` / `#[decorator]` and collected
//! by discovery, or built by hand for a [`Manifest`](crate::discovery::Manifest).

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentDescriptor, Instance};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::features::{Feature, FeatureFlags};
use crate::types::TypeRef;

/// How instances of a registration are shared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    /// A new instance on every resolution
    #[default]
    Transient,
    /// One instance per scope
    Scoped,
    /// One instance per provider
    Singleton,
}

impl FromStr for Lifetime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transient" => Ok(Self::Transient),
            "scoped" => Ok(Self::Scoped),
            "singleton" => Ok(Self::Singleton),
            _ => Err(Error::UnknownLifetime(s.to_string())),
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "Transient"),
            Self::Scoped => write!(f, "Scoped"),
            Self::Singleton => write!(f, "Singleton"),
        }
    }
}

/// An options type bound from a configuration section
///
/// `CONFIGURATION_PATH` uses `:` or `.` as separator. When it is `None`, empty,
/// or names a missing section the options keep their `Default` values.
///
/// # Example
/// ```rust,ignore
/// #[derive(Default, Deserialize)]
/// #[serde(default)]
/// struct MailerOptions {
///     sender: String,
/// }
///
/// impl ServiceConfiguration for MailerOptions {
///     const CONFIGURATION_PATH: Option<&'static str> = Some("Mailer:Smtp");
/// }
/// ```
pub trait ServiceConfiguration: DeserializeOwned + Default + Send + Sync + 'static {
    const CONFIGURATION_PATH: Option<&'static str>;
}

/// Bound options as seen by consumers (`Arc<Options<T>>`)
#[derive(Debug, Clone, Default)]
pub struct Options<T> {
    value: T,
}

impl<T> Options<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Deref for Options<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Erased handle to an options type and its binder
#[derive(Clone, Copy)]
pub struct OptionsBinding {
    options_type: fn() -> TypeRef,
    path: Option<&'static str>,
    bind: fn(&Configuration) -> Result<Instance>,
}

impl OptionsBinding {
    pub fn of<T: ServiceConfiguration>() -> Self {
        Self {
            options_type: TypeRef::of::<Options<T>>,
            path: T::CONFIGURATION_PATH,
            bind: |configuration| {
                let value = match T::CONFIGURATION_PATH.filter(|path| !path.is_empty()) {
                    Some(path) => configuration.section::<T>(path)?,
                    None => T::default(),
                };
                Ok(Instance::new(Arc::new(Options::new(value))))
            },
        }
    }

    /// The `Options<T>` type consumers resolve
    pub fn options_type(&self) -> TypeRef {
        (self.options_type)()
    }

    pub fn path(&self) -> Option<&'static str> {
        self.path
    }

    pub fn bind(&self, configuration: &Configuration) -> Result<Instance> {
        (self.bind)(configuration)
    }
}

impl fmt::Debug for OptionsBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsBinding")
            .field("type", &self.options_type())
            .field("path", &self.path)
            .finish()
    }
}

pub(crate) fn normalize_key(key: Option<String>) -> Option<String> {
    key.filter(|key| !key.is_empty())
}

/// Request to register an implementation
#[derive(Clone, Debug)]
pub struct ServiceDeclaration {
    pub implementation: Arc<ComponentDescriptor>,
    /// Explicit contract; `None` means "first declared interface, else self"
    pub contract: Option<TypeRef>,
    pub lifetime: Lifetime,
    pub key: Option<String>,
    pub feature: Feature,
    pub options: Option<OptionsBinding>,
    /// Module path the declaration was made in
    pub module: String,
}

impl ServiceDeclaration {
    /// Transient, unkeyed, ungated registration of `C`
    pub fn of<C: Component>() -> Self {
        Self::from_descriptor(C::component())
    }

    pub fn from_descriptor(implementation: ComponentDescriptor) -> Self {
        Self {
            implementation: Arc::new(implementation),
            contract: None,
            lifetime: Lifetime::default(),
            key: None,
            feature: Feature::none(),
            options: None,
            module: String::new(),
        }
    }

    pub fn contract<T: ?Sized + 'static>(self) -> Self {
        self.contract_ref(TypeRef::of::<T>())
    }

    pub fn contract_ref(mut self, contract: TypeRef) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = normalize_key(Some(key.into()));
        self
    }

    pub fn feature<F: FeatureFlags>(mut self, flags: F) -> Self {
        self.feature = Feature::of(flags);
        self
    }

    pub fn options<T: ServiceConfiguration>(mut self) -> Self {
        self.options = Some(OptionsBinding::of::<T>());
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }
}

/// Request to wrap existing registrations of a contract
#[derive(Clone, Debug)]
pub struct DecoratorDeclaration {
    pub decorator: Arc<ComponentDescriptor>,
    /// Explicit contract; `None` means "first declared interface"
    pub contract: Option<TypeRef>,
    /// Application order, ascending; values below 1 count as 1
    pub order: u32,
    /// Literal key or wildcard pattern; `None` targets unkeyed registrations
    pub key: Option<String>,
    pub feature: Feature,
    /// Treat an open generic decorator as applying to every closed instance
    pub open_generics_as_wildcard: bool,
    pub module: String,
}

impl DecoratorDeclaration {
    pub fn of<C: Component>() -> Self {
        Self::from_descriptor(C::component())
    }

    pub fn from_descriptor(decorator: ComponentDescriptor) -> Self {
        Self {
            decorator: Arc::new(decorator),
            contract: None,
            order: 1,
            key: None,
            feature: Feature::none(),
            open_generics_as_wildcard: false,
            module: String::new(),
        }
    }

    pub fn contract<T: ?Sized + 'static>(self) -> Self {
        self.contract_ref(TypeRef::of::<T>())
    }

    pub fn contract_ref(mut self, contract: TypeRef) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn order(mut self, order: u32) -> Self {
        self.order = order.max(1);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = normalize_key(Some(key.into()));
        self
    }

    pub fn feature<F: FeatureFlags>(mut self, flags: F) -> Self {
        self.feature = Feature::of(flags);
        self
    }

    pub fn open_generics_as_wildcard(mut self) -> Self {
        self.open_generics_as_wildcard = true;
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Effective order (never below 1)
    pub fn effective_order(&self) -> u32 {
        self.order.max(1)
    }
}

//! Attribute-driven service registration and decoration
//!
//! Annotate implementation types and let a registration pass populate a
//! [`ServiceCollection`]:
//!
//! - `#[derive(Component)]` describes how to build a type (its `#[inject]`
//!   fields) and which contracts it implements;
//! - `#[service(...)]` registers it under a contract, key, lifetime and
//!   feature flag, optionally binding an options type from configuration;
//! - `#[decorator(...)]` wraps existing registrations of a contract, selected
//!   by key or key pattern, in ascending order, including every closed
//!   instance of an open generic contract.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attrdi::{decorator, service, Component, Configuration, ServiceCollection};
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[service(lifetime = Singleton)]
//! #[derive(Component)]
//! #[component(implements(dyn Greeter))]
//! pub struct PlainGreeter;
//!
//! #[decorator(order = 1)]
//! #[derive(Component)]
//! #[component(implements(dyn Greeter))]
//! pub struct ExcitedGreeter {
//!     #[inject]
//!     inner: Arc<dyn Greeter>,
//! }
//!
//! let provider = ServiceCollection::new()
//!     .add_attribute_based_di(&Configuration::empty(), |_| {}, &[])?
//!     .build();
//! let greeter = provider.get_required::<dyn Greeter>()?;
//! ```

extern crate self as attrdi;

pub mod classifier;
pub mod component;
pub mod config;
pub mod container;
pub mod declarations;
pub mod discovery;
pub mod error;
pub mod features;
pub mod graph;
pub mod registration;
pub mod types;
pub mod wildcard;

pub use attrdi_macros::{decorator, service, Component};

pub use component::{Arguments, Component, ComponentDescriptor, Dependency, Erased, Instance};
pub use config::{Configuration, Environment};
pub use container::{ImplementationSource, ServiceCollection, ServiceDescriptor, ServiceProvider};
pub use declarations::{
    DecoratorDeclaration, Lifetime, Options, OptionsBinding, ServiceConfiguration, ServiceDeclaration,
};
pub use discovery::{GenericCatalog, Manifest};
pub use error::{Error, Result};
pub use features::{Feature, FeatureFlags, FeatureSet};
pub use graph::{ServiceGraph, ServiceNode};
pub use registration::{DiOptions, RegistrationSummary};
pub use types::{GenericDef, Open, TypeRef};

// Re-exported for macro expansion and flag declarations
#[doc(hidden)]
pub use inventory;

pub use bitflags;

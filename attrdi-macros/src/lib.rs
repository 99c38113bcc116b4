//! Procedural macros for attrdi
//!
//! This crate provides:
//! - `#[derive(Component)]` describing how the container builds a type
//! - `#[service]` registering a component under a contract
//! - `#[decorator]` wrapping registrations of a contract

use proc_macro::TokenStream;

mod args;
mod component;
mod decorator;
mod service;
mod type_ref;

/// Derive `attrdi::Component` for a struct
///
/// Fields marked `#[inject]` must be `Arc<T>` (required) or `Option<Arc<T>>`
/// (optional) and are resolved from the container in declaration order;
/// `#[inject(key = "name")]` resolves a keyed registration. Every other
/// field is filled with `Default::default()`.
///
/// `#[component(implements(...))]` lists the contracts the type can be
/// resolved as. The first one is the default contract for `#[service]` and
/// `#[decorator]`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Component)]
/// #[component(implements(dyn Greeter))]
/// pub struct PoliteGreeter {
///     #[inject]
///     clock: Arc<dyn Clock>,
///     #[inject(key = "formal")]
///     fallback: Option<Arc<dyn Greeter>>,
///     greetings: AtomicUsize,
/// }
/// ```
#[proc_macro_derive(Component, attributes(component, inject))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component::component_impl(input)
}

/// Register a component with the container
///
/// Place it above `#[derive(Component)]`.
///
/// Parameters, all optional:
/// - `contract = Type` (defaults to the first implemented contract, then the type itself)
/// - `lifetime = Transient | Scoped | Singleton` (default `Transient`)
/// - `key = "name"` for a keyed registration
/// - `feature = Flags::A` to register only when that flag is active
/// - `options = Type` to bind a `ServiceConfiguration` from configuration
///
/// # Example
///
/// ```rust,ignore
/// #[service(contract = dyn Greeter, lifetime = Singleton, key = "formal")]
/// #[derive(Component)]
/// #[component(implements(dyn Greeter))]
/// pub struct FormalGreeter;
/// ```
#[proc_macro_attribute]
pub fn service(attr: TokenStream, input: TokenStream) -> TokenStream {
    service::service_impl(attr, input)
}

/// Register a component as a decorator
///
/// Parameters, all optional:
/// - `contract = Type`; type parameters of the decorator written as direct
///   arguments (or `_`) leave the contract open
/// - `order = N`, applied in ascending order (default and minimum 1)
/// - `key = "pattern"` selecting keyed registrations (`*` and `?` allowed)
/// - `feature = Flags::A`
/// - `open_generics_as_wildcard` to decorate every closed instance of an
///   open generic contract
///
/// # Example
///
/// ```rust,ignore
/// #[decorator(contract = dyn Repository<T>, open_generics_as_wildcard)]
/// #[derive(Component)]
/// #[component(implements(dyn Repository<T>))]
/// pub struct AuditedRepository<T> {
///     #[inject]
///     inner: Arc<dyn Repository<T>>,
/// }
///
/// attrdi::close_generic!(AuditedRepository<Order>);
/// ```
#[proc_macro_attribute]
pub fn decorator(attr: TokenStream, input: TokenStream) -> TokenStream {
    decorator::decorator_impl(attr, input)
}

//! Decoration engine
//!
//! Decorating replaces each selected registration in place with a factory
//! registration of the same contract, key and lifetime. The factory builds
//! the replaced registration exactly as it would have been built on its own
//! and hands it to the decorator's constructor parameter whose type is the
//! contract. Decorators applied later wrap earlier ones.
//!
//! Two paths exist:
//! - exact: registrations of the contract, selected by key;
//! - open generic wildcard: unkeyed registrations of every closed instance of
//!   the contract's generic definition, each wrapped by the matching closed
//!   decorator from the [`GenericCatalog`].

use std::sync::Arc;

use crate::component::ComponentDescriptor;
use crate::container::{DescriptorId, Factory, ServiceCollection, ServiceDescriptor, ServiceProvider};
use crate::discovery::GenericCatalog;
use crate::error::{Error, Result};
use crate::types::TypeRef;
use crate::wildcard::key_selects;

/// Result of one decoration request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationOutcome {
    /// This many registrations were wrapped
    Applied(usize),
    /// Nothing matched and strict mode is off
    Skipped,
    /// An open generic decorator without the wildcard flag
    Unsupported,
}

/// A decorator ready to apply to a settled contract
#[derive(Debug, Clone)]
pub struct DecorationRequest<'a> {
    pub contract: &'a TypeRef,
    pub decorator: &'a Arc<ComponentDescriptor>,
    pub key: Option<&'a str>,
    pub open_generics_as_wildcard: bool,
    /// Fail when nothing matches instead of skipping
    pub strict: bool,
}

impl DecorationRequest<'_> {
    /// Whether this request takes the open generic wildcard path
    pub fn is_wildcard_generic(&self) -> bool {
        self.open_generics_as_wildcard
            && self.contract.is_generic()
            && self.contract.is_open()
            && self.decorator.type_ref().is_open()
    }
}

/// Apply one decorator to the matching registrations
pub fn decorate(
    services: &mut ServiceCollection,
    catalog: &GenericCatalog,
    request: &DecorationRequest<'_>,
) -> Result<DecorationOutcome> {
    if request.is_wildcard_generic() {
        return decorate_open_generic(services, catalog, request);
    }

    if request.decorator.type_ref().is_open() {
        tracing::warn!(
            decorator = %request.decorator.type_ref(),
            "Open generic decorator without open_generics_as_wildcard is not supported; skipping"
        );
        return Ok(DecorationOutcome::Unsupported);
    }

    let targets: Vec<DescriptorId> = services
        .iter()
        .filter(|descriptor| {
            descriptor.service_type() == request.contract && key_selects(request.key, descriptor.key())
        })
        .map(ServiceDescriptor::id)
        .collect();

    if targets.is_empty() {
        return nothing_matched(request);
    }

    for id in &targets {
        wrap_in_place(services, *id, request.contract, request.decorator);
    }
    Ok(DecorationOutcome::Applied(targets.len()))
}

fn decorate_open_generic(
    services: &mut ServiceCollection,
    catalog: &GenericCatalog,
    request: &DecorationRequest<'_>,
) -> Result<DecorationOutcome> {
    if let Some(key) = request.key {
        return Err(Error::configuration(format!(
            "open generic decorator '{}' cannot target keyed registrations (key '{}')",
            request.decorator.type_ref(),
            key
        )));
    }

    let (Some(contract_definition), Some(decorator_definition)) =
        (request.contract.definition(), request.decorator.type_ref().definition())
    else {
        return nothing_matched(request);
    };

    let targets: Vec<(DescriptorId, TypeRef)> = services
        .iter()
        .filter(|descriptor| {
            !descriptor.is_keyed() && descriptor.service_type().is_instance_of(&contract_definition)
        })
        .map(|descriptor| (descriptor.id(), descriptor.service_type().clone()))
        .collect();

    if targets.is_empty() {
        return nothing_matched(request);
    }

    let mut applied = 0;
    for (id, service_type) in targets {
        if service_type.is_open() {
            tracing::trace!(contract = %service_type, "Skipping registration with open generic arguments");
            continue;
        }

        let closed = catalog
            .close(&decorator_definition, service_type.arguments())
            .ok_or_else(|| {
                Error::decoration(format!(
                    "no closed instance of '{}' for '{}'; list it with close_generic!",
                    decorator_definition.name(),
                    service_type
                ))
            })?;

        wrap_in_place(services, id, &service_type, &closed);
        applied += 1;
    }
    Ok(DecorationOutcome::Applied(applied))
}

fn nothing_matched(request: &DecorationRequest<'_>) -> Result<DecorationOutcome> {
    if request.strict {
        return Err(Error::decoration(format!(
            "no registration of '{}'{} to decorate with '{}'",
            request.contract,
            request
                .key
                .map(|key| format!(" with key '{}'", key))
                .unwrap_or_default(),
            request.decorator.type_ref()
        )));
    }
    tracing::debug!(
        contract = %request.contract,
        decorator = %request.decorator.type_ref(),
        "No registrations to decorate"
    );
    Ok(DecorationOutcome::Skipped)
}

fn wrap_in_place(
    services: &mut ServiceCollection,
    id: DescriptorId,
    contract: &TypeRef,
    decorator: &Arc<ComponentDescriptor>,
) {
    let Some(original) = services.get(id).cloned() else {
        return;
    };
    let replacement = wrap(original, contract, decorator);
    services.replace(id, replacement);
}

/// Build the replacement descriptor for `original`
pub fn wrap(original: ServiceDescriptor, contract: &TypeRef, decorator: &Arc<ComponentDescriptor>) -> ServiceDescriptor {
    let slot = decorator.parameter_of(contract);
    let self_referential = is_self_referential(contract, decorator, &original);
    if slot.is_none() {
        tracing::debug!(decorator = %decorator.type_ref(), "Decorator takes no parameter of the contract; original is not built");
    }

    let lifetime = original.lifetime();
    let key = original.key().map(str::to_string);
    let decorator = Arc::clone(decorator);
    let implementation_type = decorator.type_ref().clone();
    let factory_contract = contract.clone();

    let factory: Factory = Arc::new(move |provider: &ServiceProvider| {
        let supplied = match slot {
            Some(index) if self_referential => Some((index, None)),
            Some(index) => Some((index, Some(provider.create_instance(&original)?))),
            None => None,
        };
        provider.activate_with(&decorator, &factory_contract, supplied)
    });

    ServiceDescriptor::from_factory(contract.clone(), lifetime, factory)
        .with_key(key)
        .with_implementation_type(implementation_type)
}

/// A concrete type registered as itself and decorated by itself
///
/// Building the original would resolve the contract again and recurse, so the
/// decorator receives no original instead.
fn is_self_referential(contract: &TypeRef, decorator: &ComponentDescriptor, original: &ServiceDescriptor) -> bool {
    !contract.is_trait_object()
        && decorator.type_ref() == contract
        && original.service_type() == contract
        && original.implementation_type() == Some(contract)
}

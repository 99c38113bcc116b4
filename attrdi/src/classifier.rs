//! Turning declarations into concrete registration entries

use std::sync::Arc;

use crate::component::ComponentDescriptor;
use crate::declarations::{DecoratorDeclaration, Lifetime, ServiceDeclaration};
use crate::error::{Error, Result};
use crate::features::Feature;
use crate::types::TypeRef;

/// A service declaration with its contract settled
#[derive(Clone, Debug)]
pub struct RegistrationEntry {
    pub service_type: TypeRef,
    pub implementation: Arc<ComponentDescriptor>,
    pub lifetime: Lifetime,
    pub key: Option<String>,
    pub feature: Feature,
}

impl RegistrationEntry {
    pub fn implementation_type(&self) -> &TypeRef {
        self.implementation.type_ref()
    }
}

/// Contract a service registers under
///
/// The explicit contract if given, otherwise the implementation's first
/// declared interface, otherwise the implementation type itself.
pub fn resolve_service_type(explicit: Option<&TypeRef>, implementation: &ComponentDescriptor) -> TypeRef {
    explicit
        .or_else(|| implementation.first_interface())
        .unwrap_or_else(|| implementation.type_ref())
        .clone()
}

pub fn classify(declaration: &ServiceDeclaration) -> RegistrationEntry {
    RegistrationEntry {
        service_type: resolve_service_type(declaration.contract.as_ref(), &declaration.implementation),
        implementation: Arc::clone(&declaration.implementation),
        lifetime: declaration.lifetime,
        key: declaration.key.clone(),
        feature: declaration.feature,
    }
}

/// Contract a decorator wraps: explicit, else its first declared interface
pub fn resolve_decorator_contract(declaration: &DecoratorDeclaration) -> Result<TypeRef> {
    declaration
        .contract
        .as_ref()
        .or_else(|| declaration.decorator.first_interface())
        .cloned()
        .ok_or_else(|| {
            Error::configuration(format!(
                "decorator '{}' declares no contract and implements no interface",
                declaration.decorator.type_ref()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Erased, Instance};

    trait Store: Send + Sync {}
    trait Audit: Send + Sync {}
    struct Disk;
    impl Store for Disk {}
    impl Audit for Disk {}

    fn plain() -> ComponentDescriptor {
        ComponentDescriptor::new::<Disk>(TypeRef::of::<Disk>(), |_| Ok(Arc::new(Disk) as Erased))
    }

    fn with_interfaces() -> ComponentDescriptor {
        plain()
            .implements(TypeRef::of::<dyn Store>(), |value| {
                let contract: Arc<dyn Store> = value.downcast::<Disk>().ok()?;
                Some(Instance::new(contract))
            })
            .implements(TypeRef::of::<dyn Audit>(), |value| {
                let contract: Arc<dyn Audit> = value.downcast::<Disk>().ok()?;
                Some(Instance::new(contract))
            })
    }

    #[test]
    fn explicit_contract_wins() {
        let explicit = TypeRef::of::<dyn Audit>();
        assert_eq!(resolve_service_type(Some(&explicit), &with_interfaces()), explicit);
    }

    #[test]
    fn first_interface_is_the_default() {
        assert_eq!(resolve_service_type(None, &with_interfaces()), TypeRef::of::<dyn Store>());
    }

    #[test]
    fn falls_back_to_the_implementation() {
        assert_eq!(resolve_service_type(None, &plain()), TypeRef::of::<Disk>());
    }

    #[test]
    fn classify_carries_declaration_fields() {
        let declaration = ServiceDeclaration::from_descriptor(with_interfaces())
            .lifetime(Lifetime::Scoped)
            .key("disk");
        let entry = classify(&declaration);

        assert_eq!(entry.service_type, TypeRef::of::<dyn Store>());
        assert_eq!(entry.implementation_type(), &TypeRef::of::<Disk>());
        assert_eq!(entry.lifetime, Lifetime::Scoped);
        assert_eq!(entry.key.as_deref(), Some("disk"));
        assert!(entry.feature.is_none());
    }

    #[test]
    fn decorators_need_a_contract() {
        let declaration = DecoratorDeclaration::from_descriptor(plain());
        assert!(matches!(
            resolve_decorator_contract(&declaration),
            Err(Error::Configuration { .. })
        ));

        let declaration = DecoratorDeclaration::from_descriptor(with_interfaces());
        assert_eq!(resolve_decorator_contract(&declaration).unwrap(), TypeRef::of::<dyn Store>());
    }
}

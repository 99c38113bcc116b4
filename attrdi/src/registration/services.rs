//! Service registration engine

use crate::classifier::RegistrationEntry;
use crate::config::Configuration;
use crate::container::{ServiceCollection, ServiceDescriptor};
use crate::declarations::OptionsBinding;
use crate::error::Result;

/// Append one descriptor per entry, in order
///
/// Keyed entries become keyed registrations; identical entries produce
/// duplicate registrations.
pub fn register_all<'a>(services: &mut ServiceCollection, entries: impl IntoIterator<Item = &'a RegistrationEntry>) {
    for entry in entries {
        if !entry.implementation.can_cast_to(&entry.service_type) {
            tracing::warn!(
                implementation = %entry.implementation_type(),
                contract = %entry.service_type,
                "Implementation does not declare the contract it is registered under; resolution will fail"
            );
        }

        let descriptor = ServiceDescriptor::from_type(
            entry.service_type.clone(),
            entry.implementation.clone(),
            entry.lifetime,
        )
        .with_key(entry.key.as_deref());
        services.add(descriptor);

        tracing::debug!(
            contract = %entry.service_type,
            implementation = %entry.implementation_type(),
            key = entry.key.as_deref().unwrap_or(""),
            lifetime = %entry.lifetime,
            "Registered service"
        );
    }
}

/// Register `Options<T>` for an options type, at most once per collection
///
/// Returns whether a registration was added.
pub fn bind_options(services: &mut ServiceCollection, configuration: &Configuration, binding: &OptionsBinding) -> Result<bool> {
    let options_type = binding.options_type();
    if services.contains(&options_type, None) {
        return Ok(false);
    }

    let instance = binding.bind(configuration)?;
    services.add(ServiceDescriptor::from_instance(instance));
    tracing::debug!(options = %options_type, path = binding.path().unwrap_or(""), "Bound options");
    Ok(true)
}

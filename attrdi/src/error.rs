//! Crate-wide error type
//!
//! Every fallible operation in registration, decoration, options binding and
//! resolution reports through [`Error`]. Variants carry named fields so that
//! callers can match on them without parsing messages.

use thiserror::Error;

use crate::types::TypeRef;

/// Convenience alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while registering, decorating or resolving services
#[derive(Debug, Error)]
pub enum Error {
    /// A declaration cannot be registered as written
    ///
    /// Raised when a decorator has no resolvable contract, or when a wildcard
    /// open-generic decorator also carries a key.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A lifetime name that is not `Transient`, `Scoped` or `Singleton`
    #[error("Unknown service lifetime '{0}' (expected Transient, Scoped or Singleton)")]
    UnknownLifetime(String),

    /// Decoration could not be applied
    #[error("Decoration failed: {message}")]
    Decoration { message: String },

    /// No registration exists for the requested contract
    #[error("Service '{type_name}'{} not registered in container", key_suffix(.key))]
    ServiceNotFound {
        type_name: String,
        key: Option<String>,
    },

    /// Constructing an implementation failed
    #[error("Failed to activate '{type_name}': {message}")]
    Activation { type_name: String, message: String },

    /// An options section exists but could not be bound
    #[error("Failed to bind options at '{path}': {source}")]
    Options {
        path: String,
        #[source]
        source: config::ConfigError,
    },

    /// The configuration sources could not be loaded
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" with key '{}'", key),
        None => String::new(),
    }
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a decoration error
    pub fn decoration(message: impl Into<String>) -> Self {
        Self::Decoration {
            message: message.into(),
        }
    }

    /// Create an activation error for the given implementation type
    pub fn activation(type_ref: &TypeRef, message: impl Into<String>) -> Self {
        Self::Activation {
            type_name: type_ref.name().to_string(),
            message: message.into(),
        }
    }

    /// Create a not-found error for a contract and optional key
    pub fn service_not_found(contract: &TypeRef, key: Option<&str>) -> Self {
        Self::ServiceNotFound {
            type_name: contract.name().to_string(),
            key: key.map(str::to_string),
        }
    }
}

//! Error types for service registration and resolution

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while registering or resolving services
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// A registration did not describe a usable creation strategy
    #[error("Invalid registration for {contract}: {reason}")]
    Configuration {
        contract: &'static str,
        reason: &'static str,
    },

    /// No descriptor was registered for the contract
    #[error("Service not registered: {type_name}")]
    Unregistered { type_name: &'static str },

    /// A scoped contract was resolved outside of any open scope
    #[error("No active scope while resolving scoped service: {type_name}")]
    NoActiveScope { type_name: &'static str },

    /// A constructor parameter carries no contract type
    #[error("Cannot resolve parameter `{parameter}` of {service}: no contract type declared")]
    UnresolvableParameter {
        service: &'static str,
        parameter: &'static str,
    },

    /// Resolution went through a scope that was already disposed
    #[error("Scope {scope} has been disposed")]
    ScopeDisposed { scope: crate::Scope },

    /// The contract is already being constructed further up the resolution path
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// Container is locked and cannot be modified
    #[error("Container is locked - cannot register new services")]
    Locked,

    /// Error returned by a factory or constructor, passed through untouched
    #[error(transparent)]
    Construction(Arc<dyn StdError + Send + Sync>),

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create an Unregistered error for a contract
    #[inline]
    pub fn unregistered<C: ?Sized + 'static>() -> Self {
        Self::Unregistered {
            type_name: std::any::type_name::<C>(),
        }
    }

    /// Create a NoActiveScope error for a contract
    #[inline]
    pub fn no_active_scope<C: ?Sized + 'static>() -> Self {
        Self::NoActiveScope {
            type_name: std::any::type_name::<C>(),
        }
    }

    /// Create a Configuration error for a contract
    #[inline]
    pub fn configuration<C: ?Sized + 'static>(reason: &'static str) -> Self {
        Self::Configuration {
            contract: std::any::type_name::<C>(),
            reason,
        }
    }

    /// Wrap an error raised inside a factory or constructor.
    ///
    /// Display and `source()` are forwarded to the original error, and the
    /// original can be recovered with [`DiError::construction_error`].
    pub fn construction<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Construction(Arc::from(error.into()))
    }

    /// The original factory/constructor error, if this is one.
    pub fn construction_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Construction(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// Returns true if this is an [`DiError::Unregistered`] error.
    #[inline]
    pub fn is_unregistered(&self) -> bool {
        matches!(self, Self::Unregistered { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

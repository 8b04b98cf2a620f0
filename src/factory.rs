//! Creation strategies for service instances
//!
//! A registration is built by one of three strategies: a pre-built instance,
//! a zero-argument factory, or a [`Constructor`] whose parameters are
//! resolved from the container before it runs. All of them produce a
//! type-erased [`AnyArc`] so the storage can stay non-generic.

use crate::provider::{ContractKey, Injectable};
use crate::{DiError, Result};
use std::any::Any;
use std::sync::Arc;

/// Type-erased service instance.
///
/// The payload is always an `Arc<C>` for the registered contract `C`, which
/// keeps unsized contracts (`dyn Trait`) representable and preserves pointer
/// identity across resolutions.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased zero-argument factory
pub(crate) type FactoryFn = Arc<dyn Fn() -> Result<AnyArc> + Send + Sync>;

/// Type-erased constructor body, fed with already-resolved arguments
pub(crate) type BuildFn = Arc<dyn Fn(&mut Arguments) -> Result<AnyArc> + Send + Sync>;

/// Type-erased disposal hook
pub(crate) type DisposeHook = Arc<dyn Fn(&AnyArc) + Send + Sync>;

/// Erase an `Arc<C>` for storage
#[inline]
pub(crate) fn erase<C: ?Sized + Injectable>(instance: Arc<C>) -> AnyArc {
    Arc::new(instance)
}

/// Recover the `Arc<C>` stored by [`erase`]
#[inline]
pub(crate) fn downcast<C: ?Sized + Injectable>(any: &AnyArc) -> Result<Arc<C>> {
    any.downcast_ref::<Arc<C>>().cloned().ok_or_else(|| {
        DiError::Internal(format!(
            "stored instance is not a {}",
            std::any::type_name::<C>()
        ))
    })
}

/// One declared constructor parameter.
#[derive(Debug, Clone, Copy)]
pub struct Parameter {
    name: &'static str,
    contract: Option<ContractKey>,
    optional: bool,
}

impl Parameter {
    /// A parameter that must be satisfied by contract `C`
    #[inline]
    pub fn required<C: ?Sized + Injectable>(name: &'static str) -> Self {
        Self {
            name,
            contract: Some(ContractKey::of::<C>()),
            optional: false,
        }
    }

    /// A parameter that receives `None` when `C` is not registered
    #[inline]
    pub fn optional<C: ?Sized + Injectable>(name: &'static str) -> Self {
        Self {
            name,
            contract: Some(ContractKey::of::<C>()),
            optional: true,
        }
    }

    /// A parameter without a contract type. Resolving a constructor that
    /// declares one fails with [`DiError::UnresolvableParameter`].
    #[inline]
    pub fn untyped(name: &'static str) -> Self {
        Self {
            name,
            contract: None,
            optional: false,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn contract(&self) -> Option<ContractKey> {
        self.contract
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    service: &'static str,
    values: std::vec::IntoIter<(Parameter, Option<AnyArc>)>,
}

impl Arguments {
    pub(crate) fn new(service: &'static str, values: Vec<(Parameter, Option<AnyArc>)>) -> Self {
        Self {
            service,
            values: values.into_iter(),
        }
    }

    fn next_value(&mut self) -> Result<(Parameter, Option<AnyArc>)> {
        self.values.next().ok_or_else(|| {
            DiError::Internal(format!(
                "constructor of {} consumed more arguments than it declared",
                self.service
            ))
        })
    }

    /// Take the next argument as a required `Arc<C>`.
    pub fn take<C: ?Sized + Injectable>(&mut self) -> Result<Arc<C>> {
        match self.next_value()? {
            (_, Some(value)) => downcast::<C>(&value),
            (parameter, None) => Err(DiError::Internal(format!(
                "parameter `{}` of {} was declared optional but taken as required",
                parameter.name, self.service
            ))),
        }
    }

    /// Take the next argument as an optional `Arc<C>`.
    pub fn take_optional<C: ?Sized + Injectable>(&mut self) -> Result<Option<Arc<C>>> {
        match self.next_value()? {
            (_, Some(value)) => downcast::<C>(&value).map(Some),
            (_, None) => Ok(None),
        }
    }

    /// Number of arguments not consumed yet
    #[inline]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// A constructor: an ordered parameter list plus the body that instantiates
/// the implementation once every parameter is resolved.
#[derive(Clone)]
pub struct Constructor {
    type_name: &'static str,
    parameters: Arc<[Parameter]>,
    pub(crate) build: BuildFn,
}

impl Constructor {
    pub(crate) fn new(type_name: &'static str, parameters: Vec<Parameter>, build: BuildFn) -> Self {
        Self {
            type_name,
            parameters: parameters.into(),
            build,
        }
    }

    /// Name of the implementation type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declared parameters, in declaration order
    #[inline]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("type_name", &self.type_name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// The creation strategy chosen for a descriptor
#[derive(Clone)]
pub(crate) enum CreationStrategy {
    /// Pre-built instance, returned as-is
    Instance(AnyArc),
    /// Instances are built on demand
    Build(Recipe),
}

/// How a non-instance registration builds its instances
#[derive(Clone)]
pub(crate) enum Recipe {
    /// Zero-argument factory
    Factory(FactoryFn),
    /// Constructor with declared parameters
    Implementation(Constructor),
}

impl CreationStrategy {
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            CreationStrategy::Instance(_) => "instance",
            CreationStrategy::Build(Recipe::Factory(_)) => "factory",
            CreationStrategy::Build(Recipe::Implementation(_)) => "implementation",
        }
    }
}

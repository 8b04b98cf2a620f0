//! Registration records
//!
//! A [`ServiceDescriptor`] binds one contract to one creation strategy and a
//! lifetime. Descriptors are only produced by [`DescriptorBuilder::build`],
//! which rejects registrations that name no strategy or an ambiguous one.

use crate::factory::{
    downcast, erase, AnyArc, Arguments, BuildFn, Constructor, CreationStrategy, DisposeHook,
    FactoryFn, Parameter, Recipe,
};
use crate::provider::{ContractKey, Dispose, Injectable, Lifetime, Provides};
use crate::service::{Dependencies, Service};
use crate::{DiError, Result};
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Immutable registration record for a contract.
#[derive(Clone)]
pub struct ServiceDescriptor {
    contract: ContractKey,
    lifetime: Lifetime,
    pub(crate) strategy: CreationStrategy,
    pub(crate) on_dispose: Option<DisposeHook>,
}

impl ServiceDescriptor {
    /// Start describing contract `C` with the given lifetime.
    #[inline]
    pub fn builder<C: ?Sized + Injectable>(lifetime: Lifetime) -> DescriptorBuilder<C> {
        DescriptorBuilder::new(lifetime)
    }

    /// Shorthand for a descriptor that returns a pre-built instance.
    pub fn instance<C: ?Sized + Injectable>(instance: Arc<C>) -> Self {
        Self {
            contract: ContractKey::of::<C>(),
            lifetime: Lifetime::Singleton,
            strategy: CreationStrategy::Instance(erase(instance)),
            on_dispose: None,
        }
    }

    #[inline]
    pub fn contract(&self) -> ContractKey {
        self.contract
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// `"instance"`, `"factory"` or `"implementation"`
    #[inline]
    pub fn strategy(&self) -> &'static str {
        self.strategy.kind()
    }

    /// The constructor, when the strategy is an implementation.
    pub fn constructor(&self) -> Option<&Constructor> {
        match &self.strategy {
            CreationStrategy::Build(Recipe::Implementation(ctor)) => Some(ctor),
            _ => None,
        }
    }

    #[inline]
    pub fn is_disposable(&self) -> bool {
        self.on_dispose.is_some()
    }
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("contract", &self.contract)
            .field("lifetime", &self.lifetime)
            .field("strategy", &self.strategy.kind())
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

/// Builder for a [`ServiceDescriptor`] of contract `C`.
///
/// # Examples
///
/// ```rust
/// use service_container::{Lifetime, ServiceDescriptor};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// let descriptor = ServiceDescriptor::builder::<Clock>(Lifetime::Transient)
///     .factory(|| Ok(Arc::new(Clock)))
///     .build()
///     .unwrap();
/// assert_eq!(descriptor.strategy(), "factory");
///
/// // No creation strategy at all is rejected immediately
/// assert!(ServiceDescriptor::builder::<Clock>(Lifetime::Singleton).build().is_err());
/// ```
pub struct DescriptorBuilder<C: ?Sized> {
    lifetime: Lifetime,
    implementation: Option<Constructor>,
    factory: Option<FactoryFn>,
    instance: Option<AnyArc>,
    on_dispose: Option<DisposeHook>,
    _contract: PhantomData<fn() -> Arc<C>>,
}

impl<C: ?Sized + Injectable> DescriptorBuilder<C> {
    #[inline]
    pub fn new(lifetime: Lifetime) -> Self {
        Self {
            lifetime,
            implementation: None,
            factory: None,
            instance: None,
            on_dispose: None,
            _contract: PhantomData,
        }
    }

    /// Build instances of `I` through its [`Service`] constructor.
    pub fn implementation<I>(mut self) -> Self
    where
        I: Service + Provides<C>,
    {
        let build: BuildFn = Arc::new(|args: &mut Arguments| {
            let deps = I::Dependencies::from_arguments(args)?;
            let instance = Arc::new(I::create(deps)?);
            Ok(erase::<C>(<I as Provides<C>>::provide(instance)))
        });
        self.implementation = Some(Constructor::new(
            std::any::type_name::<I>(),
            I::Dependencies::parameters(),
            build,
        ));
        self
    }

    /// Build instances from a parameter list described at runtime.
    ///
    /// `build` receives the resolved arguments in the order of `parameters`.
    pub fn constructor<F>(
        mut self,
        type_name: &'static str,
        parameters: Vec<Parameter>,
        build: F,
    ) -> Self
    where
        F: Fn(&mut Arguments) -> Result<Arc<C>> + Send + Sync + 'static,
    {
        let build: BuildFn = Arc::new(move |args: &mut Arguments| build(args).map(erase::<C>));
        self.implementation = Some(Constructor::new(type_name, parameters, build));
        self
    }

    /// Build instances with a zero-argument factory.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<C>> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move || factory().map(erase::<C>)));
        self
    }

    /// Return this instance as-is. Forces the lifetime to singleton.
    pub fn instance(mut self, instance: Arc<C>) -> Self {
        self.instance = Some(erase(instance));
        self
    }

    /// Run [`Dispose::dispose`] when the owning scope or container is disposed.
    pub fn disposable(self) -> Self
    where
        C: Dispose,
    {
        self.on_dispose(|instance: &C| instance.dispose())
    }

    /// Run `hook` when the owning scope or container is disposed.
    pub fn on_dispose<F>(mut self, hook: F) -> Self
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.on_dispose = Some(Arc::new(move |any: &AnyArc| {
            if let Ok(instance) = downcast::<C>(any) {
                hook(&*instance);
            }
        }));
        self
    }

    /// Validate and produce the descriptor.
    pub fn build(self) -> Result<ServiceDescriptor> {
        let contract = ContractKey::of::<C>();

        if let Some(instance) = self.instance {
            #[cfg(feature = "logging")]
            if self.lifetime != Lifetime::Singleton
                || self.factory.is_some()
                || self.implementation.is_some()
            {
                trace!(
                    target: "service_container",
                    service = contract.type_name(),
                    requested_lifetime = self.lifetime.as_str(),
                    "Instance supplied; ignoring other strategies and using singleton lifetime"
                );
            }

            // Registered instances are owned by the caller and never disposed
            #[cfg(feature = "logging")]
            if self.on_dispose.is_some() {
                trace!(
                    target: "service_container",
                    service = contract.type_name(),
                    "Instance supplied; ignoring dispose hook"
                );
            }

            return Ok(ServiceDescriptor {
                contract,
                lifetime: Lifetime::Singleton,
                strategy: CreationStrategy::Instance(instance),
                on_dispose: None,
            });
        }

        let strategy = match (self.factory, self.implementation) {
            (Some(_), Some(_)) => {
                return Err(DiError::configuration::<C>(
                    "both a factory and an implementation were supplied",
                ));
            }
            (Some(factory), None) => CreationStrategy::Build(Recipe::Factory(factory)),
            (None, Some(ctor)) => CreationStrategy::Build(Recipe::Implementation(ctor)),
            (None, None) => {
                return Err(DiError::configuration::<C>(
                    "no implementation, factory or instance was supplied",
                ));
            }
        };

        Ok(ServiceDescriptor {
            contract,
            lifetime: self.lifetime,
            strategy,
            on_dispose: self.on_dispose,
        })
    }
}

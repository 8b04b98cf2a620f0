//! Service container
//!
//! The `Container` owns the descriptor table and the singleton caches. It is
//! cheap to clone: clones share the same registrations, so a container can be
//! captured by factories or handed to worker threads.

use crate::descriptor::{DescriptorBuilder, ServiceDescriptor};
use crate::provider::{ContractKey, Injectable, Lifetime};
use crate::resolver::{GraphWalk, Resolver};
use crate::scope::ServiceScope;
use crate::storage::ServiceStorage;
use crate::{DiError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Runtime options for a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Expected number of registrations, used to size the descriptor table.
    pub capacity: usize,
    /// Resolve the dependencies of singletons without the active scope.
    ///
    /// With this on, a singleton that depends on a scoped contract fails with
    /// [`DiError::NoActiveScope`] instead of holding one scope's instance for
    /// the life of the container.
    pub validate_scopes: bool,
}

impl ContainerOptions {
    #[inline]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[inline]
    pub fn validate_scopes(mut self, enabled: bool) -> Self {
        self.validate_scopes = enabled;
        self
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            capacity: 0,
            validate_scopes: true,
        }
    }
}

/// Dependency resolution container.
///
/// Holds one descriptor per contract (the last registration wins) and builds
/// services on demand according to their [`Lifetime`].
///
/// # Examples
///
/// ```rust
/// use service_container::{provides, Container, Result, Service};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// impl Service for English {
///     type Dependencies = ();
///
///     fn create(_: ()) -> Result<Self> {
///         Ok(English)
///     }
/// }
///
/// provides!(English: dyn Greeter);
///
/// let container = Container::new();
/// container
///     .register_singleton::<dyn Greeter>(|b| b.implementation::<English>())
///     .unwrap();
///
/// let greeter = container.resolve::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
#[derive(Clone)]
pub struct Container {
    /// Descriptor table and singleton cells
    storage: Arc<ServiceStorage>,
    /// Lock state - uses AtomicBool for fast lock checking (no contention)
    locked: Arc<AtomicBool>,
    options: ContainerOptions,
}

impl Container {
    /// Create a new container with default options.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    /// let container = Container::new();
    /// assert!(container.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many services will be registered.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_options(ContainerOptions::default().with_capacity(capacity))
    }

    pub fn with_options(options: ContainerOptions) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            capacity = options.capacity,
            validate_scopes = options.validate_scopes,
            "Creating new service container"
        );

        Self {
            storage: Arc::new(ServiceStorage::with_capacity(options.capacity)),
            locked: Arc::new(AtomicBool::new(false)),
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    #[inline]
    pub(crate) fn storage(&self) -> &ServiceStorage {
        &self.storage
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a finished descriptor, replacing any previous one for the
    /// same contract.
    pub fn register(&self, descriptor: ServiceDescriptor) -> Result<()> {
        self.check_not_locked()?;

        #[cfg(feature = "logging")]
        let (service, lifetime, strategy) = (
            descriptor.contract().type_name(),
            descriptor.lifetime().as_str(),
            descriptor.strategy(),
        );

        let replaced = self.storage.insert(descriptor);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = service,
            lifetime = lifetime,
            strategy = strategy,
            replaced = replaced,
            service_count = self.storage.len(),
            "Registering service"
        );

        #[cfg(not(feature = "logging"))]
        let _ = replaced;

        Ok(())
    }

    /// Register contract `C` as a singleton.
    ///
    /// `configure` picks the creation strategy. The descriptor is validated
    /// here, but nothing is constructed until the first resolve.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    /// use std::sync::Arc;
    ///
    /// struct Database { url: String }
    ///
    /// let container = Container::new();
    /// container
    ///     .register_singleton::<Database>(|b| {
    ///         b.factory(|| Ok(Arc::new(Database { url: "postgres://localhost".into() })))
    ///     })
    ///     .unwrap();
    ///
    /// let a = container.resolve::<Database>().unwrap();
    /// let b = container.resolve::<Database>().unwrap();
    /// assert!(Arc::ptr_eq(&a, &b));
    /// ```
    #[inline]
    pub fn register_singleton<C: ?Sized + Injectable>(
        &self,
        configure: impl FnOnce(DescriptorBuilder<C>) -> DescriptorBuilder<C>,
    ) -> Result<()> {
        self.register_with(Lifetime::Singleton, configure)
    }

    /// Register contract `C` as transient: a new instance on every resolve.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// static COUNTER: AtomicU64 = AtomicU64::new(0);
    ///
    /// struct RequestId(u64);
    ///
    /// let container = Container::new();
    /// container
    ///     .register_transient::<RequestId>(|b| {
    ///         b.factory(|| Ok(Arc::new(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)))))
    ///     })
    ///     .unwrap();
    ///
    /// let id1 = container.resolve::<RequestId>().unwrap();
    /// let id2 = container.resolve::<RequestId>().unwrap();
    /// assert_ne!(id1.0, id2.0);
    /// ```
    #[inline]
    pub fn register_transient<C: ?Sized + Injectable>(
        &self,
        configure: impl FnOnce(DescriptorBuilder<C>) -> DescriptorBuilder<C>,
    ) -> Result<()> {
        self.register_with(Lifetime::Transient, configure)
    }

    /// Register contract `C` as scoped: one instance per [`ServiceScope`].
    #[inline]
    pub fn register_scoped<C: ?Sized + Injectable>(
        &self,
        configure: impl FnOnce(DescriptorBuilder<C>) -> DescriptorBuilder<C>,
    ) -> Result<()> {
        self.register_with(Lifetime::Scoped, configure)
    }

    /// Register a pre-built instance. It is returned as-is on every resolve
    /// and is never disposed by the container.
    #[inline]
    pub fn register_instance<C: ?Sized + Injectable>(&self, instance: Arc<C>) -> Result<()> {
        self.register(ServiceDescriptor::instance(instance))
    }

    fn register_with<C: ?Sized + Injectable>(
        &self,
        lifetime: Lifetime,
        configure: impl FnOnce(DescriptorBuilder<C>) -> DescriptorBuilder<C>,
    ) -> Result<()> {
        self.check_not_locked()?;
        let descriptor = configure(ServiceDescriptor::builder::<C>(lifetime)).build()?;
        self.register(descriptor)
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve contract `C` with no active scope.
    ///
    /// Scoped contracts (directly or through a dependency) fail with
    /// [`DiError::NoActiveScope`]; use [`Container::create_scope`] for those.
    #[inline]
    pub fn resolve<C: ?Sized + Injectable>(&self) -> Result<Arc<C>> {
        Resolver::new(&self.storage, None, self.options.validate_scopes).resolve::<C>()
    }

    /// Try to resolve, returning None on any failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    ///
    /// struct OptionalService;
    ///
    /// let container = Container::new();
    /// assert!(container.try_resolve::<OptionalService>().is_none());
    /// ```
    #[inline]
    pub fn try_resolve<C: ?Sized + Injectable>(&self) -> Option<Arc<C>> {
        self.resolve::<C>().ok()
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    /// Open a new scope over this container.
    #[inline]
    pub fn create_scope(&self) -> ServiceScope {
        ServiceScope::new(self.clone())
    }

    /// Run `f` inside a fresh scope and dispose the scope afterwards.
    ///
    /// The scope is disposed on every exit path, including unwinding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use service_container::Container;
    /// use std::sync::Arc;
    ///
    /// struct UnitOfWork;
    ///
    /// let container = Container::new();
    /// container
    ///     .register_scoped::<UnitOfWork>(|b| b.factory(|| Ok(Arc::new(UnitOfWork))))
    ///     .unwrap();
    ///
    /// let same = container.scoped(|scope| {
    ///     let a = scope.resolve::<UnitOfWork>().unwrap();
    ///     let b = scope.resolve::<UnitOfWork>().unwrap();
    ///     Arc::ptr_eq(&a, &b)
    /// });
    /// assert!(same);
    /// ```
    pub fn scoped<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&ServiceScope) -> R,
    {
        let scope = self.create_scope();
        let result = f(&scope);
        scope.dispose();
        result
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if a contract is registered.
    #[inline]
    pub fn contains<C: ?Sized + Injectable>(&self) -> bool {
        self.storage.contains(&ContractKey::of::<C>())
    }

    /// Get the number of registered contracts.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The lifetime `C` is registered with, if any.
    pub fn lifetime_of<C: ?Sized + Injectable>(&self) -> Option<Lifetime> {
        self.storage
            .get(&ContractKey::of::<C>())
            .map(|r| r.descriptor.lifetime())
    }

    /// Get all registered contracts.
    pub fn registered_contracts(&self) -> Vec<ContractKey> {
        self.storage.keys()
    }

    /// Number of singletons that have been constructed so far
    #[inline]
    pub fn cached_singletons(&self) -> usize {
        self.storage.cached_singletons()
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Lock the container to prevent further registrations.
    ///
    /// Useful for ensuring no services are registered after app initialization.
    #[inline]
    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service_count = self.storage.len(),
            "Container locked - no further registrations allowed"
        );
    }

    /// Check if the container is locked.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Check the declared dependency graph without constructing anything.
    ///
    /// Reports the first missing contract, parameter without a contract type,
    /// cycle, or (with `validate_scopes`) singleton that depends on a scoped
    /// contract. Factories are opaque and are not followed.
    pub fn validate(&self) -> Result<()> {
        let mut walk = GraphWalk::validation(&self.storage, self.options.validate_scopes);
        for key in self.storage.keys() {
            walk.visit(key)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service_count = self.storage.len(),
            "Container dependency graph validated"
        );

        Ok(())
    }

    /// Dispose every constructed singleton and clear the singleton cache.
    ///
    /// Each dispose hook runs once per constructed instance. Registrations are
    /// kept, so later resolves build fresh instances. Returns the number of
    /// hooks run.
    pub fn dispose(&self) -> usize {
        let drained = self.storage.drain_singletons();
        let cleared = drained.len();

        let mut disposed = 0;
        for (registration, instance) in drained {
            if let Some(hook) = registration.descriptor.on_dispose.as_ref() {
                #[cfg(feature = "logging")]
                trace!(
                    target: "service_container",
                    service = registration.descriptor.contract().type_name(),
                    "Disposing singleton"
                );
                hook(&instance);
                disposed += 1;
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            cleared = cleared,
            disposed = disposed,
            "Container singletons disposed"
        );

        #[cfg(not(feature = "logging"))]
        let _ = cleared;

        disposed
    }

    /// Internal helper: refuse registration once locked.
    #[inline]
    fn check_not_locked(&self) -> Result<()> {
        if self.locked.load(Ordering::Relaxed) {
            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                "Registration rejected - container is locked"
            );
            return Err(DiError::Locked);
        }
        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .field("cached_singletons", &self.cached_singletons())
            .field("locked", &self.is_locked())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Parameter;
    use crate::provider::Dispose;
    use crate::service::Service;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    struct TestService {
        value: String,
    }

    struct Counter {
        id: u32,
    }

    #[test]
    fn test_singleton() {
        let container = Container::new();
        container
            .register_singleton::<TestService>(|b| {
                b.factory(|| {
                    Ok(Arc::new(TestService {
                        value: "test".into(),
                    }))
                })
            })
            .unwrap();

        let s1 = container.resolve::<TestService>().unwrap();
        let s2 = container.resolve::<TestService>().unwrap();

        assert_eq!(s1.value, "test");
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(container.cached_singletons(), 1);
    }

    #[test]
    fn test_registration_is_lazy() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container
            .register_singleton::<Counter>(|b| {
                b.factory(|| {
                    Ok(Arc::new(Counter {
                        id: CREATED.fetch_add(1, Ordering::SeqCst),
                    }))
                })
            })
            .unwrap();

        assert_eq!(CREATED.load(Ordering::SeqCst), 0);
        container.resolve::<Counter>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient() {
        static NEXT: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container
            .register_transient::<Counter>(|b| {
                b.factory(|| {
                    Ok(Arc::new(Counter {
                        id: NEXT.fetch_add(1, Ordering::SeqCst),
                    }))
                })
            })
            .unwrap();

        let c1 = container.resolve::<Counter>().unwrap();
        let c2 = container.resolve::<Counter>().unwrap();

        assert!(!Arc::ptr_eq(&c1, &c2));
        assert_ne!(c1.id, c2.id);
        assert_eq!(container.cached_singletons(), 0);
    }

    #[test]
    fn test_register_instance() {
        let container = Container::new();
        let instance = Arc::new(TestService {
            value: "given".into(),
        });
        container.register_instance(Arc::clone(&instance)).unwrap();

        let resolved = container.resolve::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&resolved, &instance));
        assert_eq!(container.lifetime_of::<TestService>(), Some(Lifetime::Singleton));
    }

    #[test]
    fn test_last_registration_wins() {
        let container = Container::new();
        container
            .register_singleton::<TestService>(|b| {
                b.factory(|| Ok(Arc::new(TestService { value: "a".into() })))
            })
            .unwrap();
        container
            .register_transient::<TestService>(|b| {
                b.factory(|| Ok(Arc::new(TestService { value: "b".into() })))
            })
            .unwrap();

        assert_eq!(container.len(), 1);
        assert_eq!(container.lifetime_of::<TestService>(), Some(Lifetime::Transient));
        assert_eq!(container.resolve::<TestService>().unwrap().value, "b");
    }

    #[test]
    fn test_not_found() {
        let container = Container::new();
        let err = container.resolve::<TestService>().err().unwrap();
        assert!(err.is_unregistered());
        assert!(container.try_resolve::<TestService>().is_none());
        assert!(container.is_empty());
    }

    #[test]
    fn test_invalid_registration_is_rejected() {
        let container = Container::new();
        let err = container.register_singleton::<TestService>(|b| b).err().unwrap();

        assert!(matches!(err, DiError::Configuration { .. }));
        assert!(!container.contains::<TestService>());
    }

    #[test]
    fn test_lock() {
        let container = Container::new();
        assert!(!container.is_locked());

        container.lock();
        assert!(container.is_locked());

        let err = container
            .register_transient::<Counter>(|b| b.factory(|| Ok(Arc::new(Counter { id: 0 }))))
            .err().unwrap();
        assert!(matches!(err, DiError::Locked));
        assert!(container.is_empty());
    }

    #[test]
    fn test_clones_share_registrations() {
        let container = Container::new();
        let clone = container.clone();

        clone
            .register_singleton::<Counter>(|b| b.factory(|| Ok(Arc::new(Counter { id: 7 }))))
            .unwrap();

        assert!(container.contains::<Counter>());
        let a = container.resolve::<Counter>().unwrap();
        let b = clone.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(container.registered_contracts(), vec![ContractKey::of::<Counter>()]);
    }

    #[test]
    fn test_singleton_race_constructs_once() {
        const THREADS: usize = 16;
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container
            .register_singleton::<Counter>(|b| {
                b.factory(|| {
                    let id = BUILT.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(std::time::Duration::from_millis(5));
                    Ok(Arc::new(Counter { id }))
                })
            })
            .unwrap();

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let container = container.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.resolve::<Counter>().unwrap()
                })
            })
            .collect();

        let instances: Vec<Arc<Counter>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(BUILT.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_failed_singleton_is_not_cached() {
        static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container
            .register_singleton::<Counter>(|b| {
                b.factory(|| {
                    let attempt = ATTEMPTS.fetch_add(1, Ordering::SeqCst);
                    if attempt == 0 {
                        Err(DiError::construction("database unavailable"))
                    } else {
                        Ok(Arc::new(Counter { id: attempt }))
                    }
                })
            })
            .unwrap();

        let err = container.resolve::<Counter>().err().unwrap();
        assert_eq!(err.to_string(), "database unavailable");
        assert_eq!(container.cached_singletons(), 0);

        assert_eq!(container.resolve::<Counter>().unwrap().id, 1);
        assert_eq!(container.cached_singletons(), 1);
    }

    #[test]
    fn test_scoped_without_scope_fails() {
        let container = Container::new();
        container
            .register_scoped::<Counter>(|b| b.factory(|| Ok(Arc::new(Counter { id: 0 }))))
            .unwrap();

        let err = container.resolve::<Counter>().err().unwrap();
        assert!(matches!(err, DiError::NoActiveScope { .. }));
    }

    #[test]
    fn test_scoped_helper_disposes_on_exit() {
        struct Session {
            log: Arc<Mutex<Vec<&'static str>>>,
        }

        impl Dispose for Session {
            fn dispose(&self) {
                self.log.lock().unwrap().push("closed");
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let container = Container::new();
        let shared = Arc::clone(&log);
        container
            .register_scoped::<Session>(move |b| {
                b.factory(move || {
                    Ok(Arc::new(Session {
                        log: Arc::clone(&shared),
                    }))
                })
                .disposable()
            })
            .unwrap();

        container.scoped(|scope| {
            scope.resolve::<Session>().unwrap();
            scope.resolve::<Session>().unwrap();
        });

        assert_eq!(*log.lock().unwrap(), vec!["closed"]);
    }

    #[test]
    fn test_captive_dependency_rejected() {
        struct RequestContext;
        struct Cache {
            _ctx: Arc<RequestContext>,
        }

        impl Service for Cache {
            type Dependencies = Arc<RequestContext>;

            fn create(ctx: Arc<RequestContext>) -> Result<Self> {
                Ok(Cache { _ctx: ctx })
            }
        }

        let container = Container::new();
        container
            .register_scoped::<RequestContext>(|b| b.factory(|| Ok(Arc::new(RequestContext))))
            .unwrap();
        container
            .register_singleton::<Cache>(|b| b.implementation::<Cache>())
            .unwrap();

        let scope = container.create_scope();
        let err = scope.resolve::<Cache>().err().unwrap();
        assert!(matches!(err, DiError::NoActiveScope { .. }));
        assert!(matches!(
            container.validate().err().unwrap(),
            DiError::NoActiveScope { .. }
        ));

        let relaxed =
            Container::with_options(ContainerOptions::default().validate_scopes(false));
        relaxed
            .register_scoped::<RequestContext>(|b| b.factory(|| Ok(Arc::new(RequestContext))))
            .unwrap();
        relaxed
            .register_singleton::<Cache>(|b| b.implementation::<Cache>())
            .unwrap();
        assert!(relaxed.create_scope().resolve::<Cache>().is_ok());
        assert!(relaxed.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_and_cycles() {
        struct A;
        struct B;

        let container = Container::new();
        container
            .register_transient::<A>(|b| {
                b.constructor("A", vec![Parameter::required::<B>("b")], |args| {
                    let _b: Arc<B> = args.take()?;
                    Ok(Arc::new(A))
                })
            })
            .unwrap();

        assert!(container.validate().err().unwrap().is_unregistered());

        container
            .register_transient::<B>(|b| {
                b.constructor("B", vec![Parameter::required::<A>("a")], |args| {
                    let _a: Arc<A> = args.take()?;
                    Ok(Arc::new(B))
                })
            })
            .unwrap();

        match container.validate().err().unwrap() {
            DiError::CircularDependency { path } => {
                assert_eq!(path.matches(" -> ").count(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            container.resolve::<A>().err().unwrap(),
            DiError::CircularDependency { .. }
        ));
    }

    #[test]
    fn test_dispose_runs_singleton_hooks_once() {
        static DISPOSED: AtomicU32 = AtomicU32::new(0);
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container
            .register_singleton::<Counter>(|b| {
                b.factory(|| {
                    Ok(Arc::new(Counter {
                        id: BUILT.fetch_add(1, Ordering::SeqCst),
                    }))
                })
                .on_dispose(|_| {
                    DISPOSED.fetch_add(1, Ordering::SeqCst);
                })
            })
            .unwrap();

        // Nothing constructed yet, nothing to dispose
        assert_eq!(container.dispose(), 0);

        let first = container.resolve::<Counter>().unwrap();
        assert_eq!(container.dispose(), 1);
        assert_eq!(container.dispose(), 0);
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);

        let second = container.resolve::<Counter>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_container_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Container>();
        assert_send_sync::<ServiceScope>();
    }
}

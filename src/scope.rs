//! Scoped service lifetimes
//!
//! A [`ServiceScope`] is a bounded unit of work (typically one request).
//! Services registered with [`Lifetime::Scoped`](crate::Lifetime::Scoped)
//! resolve to one shared instance per scope, and those instances are
//! disposed together when the scope ends.

use crate::factory::{AnyArc, DisposeHook};
use crate::provider::{ContractKey, Injectable};
use crate::resolver::Resolver;
use crate::{Container, DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Unique scope identifier.
///
/// Each scope gets a unique ID for tracking and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope(u64);

impl Scope {
    /// Generate a new unique scope ID.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// A cached scoped instance and the hook that releases it
struct ScopedSlot {
    cell: OnceCell<(AnyArc, Option<DisposeHook>)>,
    released: AtomicBool,
}

impl ScopedSlot {
    fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            released: AtomicBool::new(false),
        }
    }

    /// Run the dispose hook of the cached instance, at most once.
    ///
    /// Returns false when nothing is cached yet, there is no hook, or the
    /// hook has already run.
    fn release(&self) -> bool {
        let Some((instance, Some(hook))) = self.cell.get() else {
            return false;
        };
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        hook(instance);
        true
    }
}

/// Instance cache owned by one scope.
pub(crate) struct ScopeState {
    id: Scope,
    instances: DashMap<ContractKey, Arc<ScopedSlot>, RandomState>,
    disposed: AtomicBool,
}

impl ScopeState {
    fn new() -> Self {
        Self {
            id: Scope::new(),
            instances: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                4,
            ),
            disposed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn ensure_open(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(DiError::ScopeDisposed { scope: self.id });
        }
        Ok(())
    }

    /// Return the instance cached for `contract`, creating it with `init` if absent.
    ///
    /// A failed `init` leaves nothing cached. `on_dispose` is stored with the
    /// instance `init` returns. An instance that completes after the scope
    /// was disposed is released here and not returned.
    pub fn get_or_create<F>(
        &self,
        contract: ContractKey,
        on_dispose: Option<DisposeHook>,
        init: F,
    ) -> Result<AnyArc>
    where
        F: FnOnce() -> Result<AnyArc>,
    {
        self.ensure_open()?;

        // Clone the slot out so the map shard is not locked during `init`,
        // which may resolve further scoped services.
        let slot = Arc::clone(
            self.instances
                .entry(contract)
                .or_insert_with(|| Arc::new(ScopedSlot::new()))
                .value(),
        );

        let instance = if let Some((instance, _)) = slot.cell.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = contract.type_name(),
                scope = %self.id,
                "Scoped service resolved from scope cache"
            );
            Arc::clone(instance)
        } else {
            let (instance, _) = slot.cell.get_or_try_init(|| {
                #[cfg(feature = "logging")]
                debug!(
                    target: "service_container",
                    service = contract.type_name(),
                    scope = %self.id,
                    "Creating scoped instance"
                );
                init().map(|instance| (instance, on_dispose))
            })?;
            Arc::clone(instance)
        };

        // Pairs with the fence in `dispose`: either it sees this slot filled,
        // or this load sees the flag.
        fence(Ordering::SeqCst);
        if self.disposed.load(Ordering::SeqCst) {
            self.instances.remove(&contract);
            slot.release();

            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = contract.type_name(),
                scope = %self.id,
                "Scope disposed during resolution; instance released"
            );
            return Err(DiError::ScopeDisposed { scope: self.id });
        }

        Ok(instance)
    }

    /// Dispose every cached instance once. Returns the number of hooks run.
    pub fn dispose(&self) -> usize {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return 0;
        }
        fence(Ordering::SeqCst);

        let slots: Vec<Arc<ScopedSlot>> = self
            .instances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.instances.clear();

        // Disposal order across instances is unspecified
        let disposed = slots.iter().filter(|slot| slot.release()).count();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            scope = %self.id,
            disposed = disposed,
            "Scope disposed"
        );

        disposed
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of instances constructed in this scope
    pub fn len(&self) -> usize {
        self.instances
            .iter()
            .filter(|entry| entry.value().cell.get().is_some())
            .count()
    }
}

/// A scope created by [`Container::create_scope`].
///
/// Resolutions made through the scope see it as the active scope: scoped
/// services are cached here, singletons in the container, transients nowhere.
/// The scope is disposed by [`ServiceScope::dispose`] or when dropped,
/// whichever comes first.
///
/// # Examples
///
/// ```rust
/// use service_container::Container;
/// use std::sync::Arc;
///
/// struct RequestContext;
///
/// let container = Container::new();
/// container
///     .register_scoped::<RequestContext>(|b| b.factory(|| Ok(Arc::new(RequestContext))))
///     .unwrap();
///
/// let scope = container.create_scope();
/// let a = scope.resolve::<RequestContext>().unwrap();
/// let b = scope.resolve::<RequestContext>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// // Outside any scope the contract cannot be resolved
/// assert!(container.resolve::<RequestContext>().is_err());
/// ```
pub struct ServiceScope {
    container: Container,
    state: ScopeState,
}

impl ServiceScope {
    pub(crate) fn new(container: Container) -> Self {
        let state = ScopeState::new();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            scope = %state.id,
            "Creating service scope"
        );

        Self { container, state }
    }

    /// Get the scope identifier.
    #[inline]
    pub fn id(&self) -> Scope {
        self.state.id
    }

    /// Resolve a service with this scope active.
    pub fn resolve<C: ?Sized + Injectable>(&self) -> Result<Arc<C>> {
        self.state.ensure_open()?;
        Resolver::new(
            self.container.storage(),
            Some(&self.state),
            self.container.options().validate_scopes,
        )
        .resolve::<C>()
    }

    /// Try to resolve a service, returning None on any failure.
    #[inline]
    pub fn try_resolve<C: ?Sized + Injectable>(&self) -> Option<Arc<C>> {
        self.resolve::<C>().ok()
    }

    /// Dispose the scope: run every cached instance's disposal hook once,
    /// clear the cache and reject further resolutions.
    ///
    /// Calling this more than once is a no-op.
    #[inline]
    pub fn dispose(&self) {
        self.state.dispose();
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }

    /// Number of scoped instances cached in this scope
    #[inline]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The container this scope resolves from.
    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        self.state.dispose();
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope")
            .field("scope", &self.state.id)
            .field("cached", &self.state.len())
            .field("disposed", &self.state.is_disposed())
            .finish()
    }
}

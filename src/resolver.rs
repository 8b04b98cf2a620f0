//! Recursive resolution
//!
//! A [`Resolver`] lives for exactly one top-level `resolve` call. It carries
//! the scope that is active for the call and the path of contracts currently
//! under construction, which is how cycles are caught before they recurse.
//!
//! [`GraphWalk`] follows the same declared parameters without constructing
//! anything. `Container::validate` runs it over the whole table, and the
//! resolver runs it before entering a singleton's cell.

use crate::factory::{downcast, AnyArc, Arguments, Constructor, CreationStrategy, Recipe};
use crate::provider::{ContractKey, Injectable, Lifetime};
use crate::scope::ScopeState;
use crate::storage::{Registration, ServiceStorage};
use crate::{DiError, Result};
use ahash::RandomState;
use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

pub(crate) struct Resolver<'a> {
    storage: &'a ServiceStorage,
    scope: Option<&'a ScopeState>,
    validate_scopes: bool,
    path: Vec<ContractKey>,
}

impl<'a> Resolver<'a> {
    #[inline]
    pub fn new(
        storage: &'a ServiceStorage,
        scope: Option<&'a ScopeState>,
        validate_scopes: bool,
    ) -> Self {
        Self {
            storage,
            scope,
            validate_scopes,
            path: Vec::new(),
        }
    }

    /// Resolve contract `C`.
    pub fn resolve<C: ?Sized + Injectable>(mut self) -> Result<Arc<C>> {
        let any = self.resolve_any(ContractKey::of::<C>())?;
        downcast::<C>(&any)
    }

    fn resolve_any(&mut self, key: ContractKey) -> Result<AnyArc> {
        let Some(registration) = self.storage.get(&key) else {
            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = key.type_name(),
                depth = self.path.len(),
                "Service not registered"
            );
            return Err(DiError::Unregistered {
                type_name: key.type_name(),
            });
        };

        let recipe = match &registration.descriptor.strategy {
            CreationStrategy::Instance(instance) => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "service_container",
                    service = key.type_name(),
                    "Returning registered instance"
                );
                return Ok(Arc::clone(instance));
            }
            CreationStrategy::Build(recipe) => recipe,
        };

        if self.path.contains(&key) {
            return Err(circular_error(&self.path, key));
        }

        match registration.descriptor.lifetime() {
            Lifetime::Singleton => self.resolve_singleton(&registration, recipe),
            Lifetime::Scoped => self.resolve_scoped(&registration, recipe),
            Lifetime::Transient => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "service_container",
                    service = key.type_name(),
                    "Creating new transient instance"
                );
                self.construct(key, recipe)
            }
        }
    }

    fn resolve_singleton(
        &mut self,
        registration: &Registration,
        recipe: &Recipe,
    ) -> Result<AnyArc> {
        let contract = registration.descriptor.contract();
        if let Some(instance) = registration.singleton.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = contract.type_name(),
                "Singleton already initialized, returning cached instance"
            );
            return Ok(Arc::clone(instance));
        }

        // Threads holding different cells of one cycle would wait on each
        // other forever, so a cycle must fail before any cell is entered.
        GraphWalk::cycles(self.storage).visit(contract)?;

        // Check, construct and populate happen inside the cell's critical
        // section; racing callers block here and receive the winner's value.
        registration
            .singleton
            .get_or_try_init(|| {
                #[cfg(feature = "logging")]
                debug!(
                    target: "service_container",
                    service = contract.type_name(),
                    "Singleton initializing on first access"
                );

                // A singleton outlives every scope, so its dependencies must not
                // be taken from the one that happens to be active.
                let scope = if self.validate_scopes {
                    self.scope.take()
                } else {
                    self.scope
                };
                let result = self.construct(contract, recipe);
                self.scope = scope;
                result
            })
            .map(Arc::clone)
    }

    fn resolve_scoped(
        &mut self,
        registration: &Registration,
        recipe: &Recipe,
    ) -> Result<AnyArc> {
        let contract = registration.descriptor.contract();
        let Some(scope) = self.scope else {
            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                service = contract.type_name(),
                "Scoped service resolved without an active scope"
            );
            return Err(DiError::NoActiveScope {
                type_name: contract.type_name(),
            });
        };

        scope.get_or_create(contract, registration.descriptor.on_dispose.clone(), || {
            self.construct(contract, recipe)
        })
    }

    /// Run `recipe` with `contract` on the path.
    fn construct(&mut self, contract: ContractKey, recipe: &Recipe) -> Result<AnyArc> {
        self.path.push(contract);
        let result = match recipe {
            Recipe::Factory(factory) => factory(),
            Recipe::Implementation(ctor) => self.invoke(ctor),
        };
        self.path.pop();
        result
    }

    /// Resolve every declared parameter left-to-right, then run the constructor.
    fn invoke(&mut self, ctor: &Constructor) -> Result<AnyArc> {
        let mut values = Vec::with_capacity(ctor.parameters().len());

        for parameter in ctor.parameters() {
            let Some(contract) = parameter.contract() else {
                return Err(DiError::UnresolvableParameter {
                    service: ctor.type_name(),
                    parameter: parameter.name(),
                });
            };

            let value = if parameter.is_optional() && !self.storage.contains(&contract) {
                None
            } else {
                Some(self.resolve_any(contract)?)
            };
            values.push((*parameter, value));
        }

        let mut args = Arguments::new(ctor.type_name(), values);
        (ctor.build)(&mut args)
    }
}

/// What a [`GraphWalk`] reports.
#[derive(Debug, Clone, Copy)]
enum Checks {
    /// Everything resolution would reject, including captive scoped
    /// dependencies when `validate_scopes` is on.
    All { validate_scopes: bool },
    /// Cycles only. Singletons that are already built are not entered.
    Cycles,
}

/// Depth-first walk over declared constructor parameters.
///
/// Instances and factories have no declared parameters and end the walk.
pub(crate) struct GraphWalk<'a> {
    storage: &'a ServiceStorage,
    checks: Checks,
    path: Vec<ContractKey>,
    visited: HashSet<(ContractKey, bool), RandomState>,
}

impl<'a> GraphWalk<'a> {
    /// Walk reporting missing contracts, untyped parameters, cycles and
    /// (with `validate_scopes`) singletons that depend on scoped contracts.
    pub fn validation(storage: &'a ServiceStorage, validate_scopes: bool) -> Self {
        Self::new(storage, Checks::All { validate_scopes })
    }

    /// Walk reporting cycles only.
    pub fn cycles(storage: &'a ServiceStorage) -> Self {
        Self::new(storage, Checks::Cycles)
    }

    fn new(storage: &'a ServiceStorage, checks: Checks) -> Self {
        Self {
            storage,
            checks,
            path: Vec::new(),
            visited: HashSet::with_hasher(RandomState::new()),
        }
    }

    /// Walk the graph reachable from `key`.
    pub fn visit(&mut self, key: ContractKey) -> Result<()> {
        self.visit_under(key, false)
    }

    fn visit_under(&mut self, key: ContractKey, under_singleton: bool) -> Result<()> {
        if self.visited.contains(&(key, under_singleton)) {
            return Ok(());
        }
        let Some(registration) = self.storage.get(&key) else {
            return match self.checks {
                Checks::All { .. } => Err(DiError::Unregistered {
                    type_name: key.type_name(),
                }),
                Checks::Cycles => Ok(()),
            };
        };
        let descriptor = &registration.descriptor;
        let lifetime = descriptor.lifetime();

        let settled = match &descriptor.strategy {
            CreationStrategy::Instance(_) => true,
            CreationStrategy::Build(_) => {
                matches!(self.checks, Checks::Cycles)
                    && lifetime == Lifetime::Singleton
                    && registration.singleton.get().is_some()
            }
        };
        if settled {
            self.visited.insert((key, under_singleton));
            return Ok(());
        }

        if self.path.contains(&key) {
            return Err(circular_error(&self.path, key));
        }

        let mut dependencies_under_singleton = under_singleton;
        if let Checks::All { validate_scopes } = self.checks {
            if under_singleton && lifetime == Lifetime::Scoped {
                return Err(DiError::NoActiveScope {
                    type_name: key.type_name(),
                });
            }
            dependencies_under_singleton |= validate_scopes && lifetime == Lifetime::Singleton;
        }

        if let Some(ctor) = descriptor.constructor() {
            self.path.push(key);
            for parameter in ctor.parameters() {
                let Some(contract) = parameter.contract() else {
                    if let Checks::All { .. } = self.checks {
                        return Err(DiError::UnresolvableParameter {
                            service: ctor.type_name(),
                            parameter: parameter.name(),
                        });
                    }
                    continue;
                };
                if parameter.is_optional() && !self.storage.contains(&contract) {
                    continue;
                }
                self.visit_under(contract, dependencies_under_singleton)?;
            }
            self.path.pop();
        }

        self.visited.insert((key, under_singleton));
        Ok(())
    }
}

/// Build the error for `key` re-entering `path`, rendered as `A -> B -> A`.
pub(crate) fn circular_error(path: &[ContractKey], key: ContractKey) -> DiError {
    let start = path.iter().position(|k| *k == key).unwrap_or(0);
    let path = path[start..]
        .iter()
        .chain(std::iter::once(&key))
        .map(|k| k.type_name())
        .collect::<Vec<_>>()
        .join(" -> ");

    #[cfg(feature = "logging")]
    debug!(
        target: "service_container",
        service = key.type_name(),
        path = %path,
        "Circular dependency detected"
    );

    DiError::CircularDependency { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ServiceDescriptor;
    use crate::factory::Parameter;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    struct Leaf;
    struct Branch {
        leaf: Arc<Leaf>,
    }

    fn storage_with(descriptors: Vec<ServiceDescriptor>) -> ServiceStorage {
        let storage = ServiceStorage::new();
        for d in descriptors {
            storage.insert(d);
        }
        storage
    }

    #[test]
    fn test_unregistered_leaves_no_cache() {
        let storage = storage_with(vec![]);
        let err = Resolver::new(&storage, None, true).resolve::<Leaf>().err().unwrap();
        assert!(err.is_unregistered());
        assert_eq!(storage.cached_singletons(), 0);
    }

    #[test]
    fn test_constructor_arguments_are_resolved() {
        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Leaf>(Lifetime::Singleton)
                .factory(|| Ok(Arc::new(Leaf)))
                .build()
                .unwrap(),
            ServiceDescriptor::builder::<Branch>(Lifetime::Transient)
                .constructor("Branch", vec![Parameter::required::<Leaf>("leaf")], |args| {
                    Ok(Arc::new(Branch { leaf: args.take()? }))
                })
                .build()
                .unwrap(),
        ]);

        let a = Resolver::new(&storage, None, true).resolve::<Branch>().unwrap();
        let b = Resolver::new(&storage, None, true).resolve::<Branch>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.leaf, &b.leaf));
    }

    #[test]
    fn test_untyped_parameter_fails_before_construction() {
        static BUILT: AtomicU32 = AtomicU32::new(0);

        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Branch>(Lifetime::Transient)
                .constructor("Branch", vec![Parameter::untyped("leaf")], |args| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(Branch { leaf: args.take()? }))
                })
                .build()
                .unwrap(),
        ]);

        let err = Resolver::new(&storage, None, true).resolve::<Branch>().err().unwrap();
        assert!(matches!(
            err,
            DiError::UnresolvableParameter { service: "Branch", parameter: "leaf" }
        ));
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_optional_parameter_missing_is_none() {
        struct Reporter {
            leaf: Option<Arc<Leaf>>,
        }

        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Reporter>(Lifetime::Transient)
                .constructor("Reporter", vec![Parameter::optional::<Leaf>("leaf")], |args| {
                    Ok(Arc::new(Reporter { leaf: args.take_optional()? }))
                })
                .build()
                .unwrap(),
        ]);

        let reporter = Resolver::new(&storage, None, true).resolve::<Reporter>().unwrap();
        assert!(reporter.leaf.is_none());
    }

    #[test]
    fn test_self_dependency_is_circular() {
        struct Node;

        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Node>(Lifetime::Singleton)
                .constructor("Node", vec![Parameter::required::<Node>("next")], |args| {
                    let _next: Arc<Node> = args.take()?;
                    Ok(Arc::new(Node))
                })
                .build()
                .unwrap(),
        ]);

        let err = Resolver::new(&storage, None, true).resolve::<Node>().err().unwrap();
        match err {
            DiError::CircularDependency { path } => assert!(path.contains(" -> ")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(storage.cached_singletons(), 0);
    }

    #[test]
    fn test_optional_parameter_present_is_some() {
        struct Reporter {
            leaf: Option<Arc<Leaf>>,
        }

        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Leaf>(Lifetime::Singleton)
                .factory(|| Ok(Arc::new(Leaf)))
                .build()
                .unwrap(),
            ServiceDescriptor::builder::<Reporter>(Lifetime::Transient)
                .constructor("Reporter", vec![Parameter::optional::<Leaf>("leaf")], |args| {
                    Ok(Arc::new(Reporter { leaf: args.take_optional()? }))
                })
                .build()
                .unwrap(),
        ]);

        let reporter = Resolver::new(&storage, None, true).resolve::<Reporter>().unwrap();
        assert!(reporter.leaf.is_some());
    }

    #[test]
    fn test_optional_parameter_propagates_missing_transitive() {
        struct Reporter {
            branch: Option<Arc<Branch>>,
        }

        // Branch is registered but its Leaf is not
        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Branch>(Lifetime::Transient)
                .constructor("Branch", vec![Parameter::required::<Leaf>("leaf")], |args| {
                    Ok(Arc::new(Branch { leaf: args.take()? }))
                })
                .build()
                .unwrap(),
            ServiceDescriptor::builder::<Reporter>(Lifetime::Transient)
                .constructor("Reporter", vec![Parameter::optional::<Branch>("branch")], |args| {
                    Ok(Arc::new(Reporter { branch: args.take_optional()? }))
                })
                .build()
                .unwrap(),
        ]);

        let err = Resolver::new(&storage, None, true).resolve::<Reporter>().err().unwrap();
        match err {
            DiError::Unregistered { type_name } => assert!(type_name.ends_with("Leaf")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_concurrent_singleton_cycle_fails_on_both_threads() {
        static DELAYS: AtomicU32 = AtomicU32::new(0);

        struct Delay;
        struct Left;
        struct Right;

        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Delay>(Lifetime::Transient)
                .factory(|| {
                    DELAYS.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Ok(Arc::new(Delay))
                })
                .build()
                .unwrap(),
            ServiceDescriptor::builder::<Left>(Lifetime::Singleton)
                .constructor(
                    "Left",
                    vec![
                        Parameter::required::<Delay>("delay"),
                        Parameter::required::<Right>("right"),
                    ],
                    |args| {
                        let _delay: Arc<Delay> = args.take()?;
                        let _right: Arc<Right> = args.take()?;
                        Ok(Arc::new(Left))
                    },
                )
                .build()
                .unwrap(),
            ServiceDescriptor::builder::<Right>(Lifetime::Singleton)
                .constructor(
                    "Right",
                    vec![
                        Parameter::required::<Delay>("delay"),
                        Parameter::required::<Left>("left"),
                    ],
                    |args| {
                        let _delay: Arc<Delay> = args.take()?;
                        let _left: Arc<Left> = args.take()?;
                        Ok(Arc::new(Right))
                    },
                )
                .build()
                .unwrap(),
        ]);

        let barrier = Barrier::new(2);
        let (left, right) = thread::scope(|s| {
            let left = s.spawn(|| {
                barrier.wait();
                Resolver::new(&storage, None, true).resolve::<Left>().err()
            });
            let right = s.spawn(|| {
                barrier.wait();
                Resolver::new(&storage, None, true).resolve::<Right>().err()
            });
            (left.join().unwrap(), right.join().unwrap())
        });

        assert!(matches!(left, Some(DiError::CircularDependency { .. })));
        assert!(matches!(right, Some(DiError::CircularDependency { .. })));
        // The cycle is rejected before anything on it is constructed
        assert_eq!(DELAYS.load(Ordering::SeqCst), 0);
        assert_eq!(storage.cached_singletons(), 0);
    }

    #[test]
    fn test_cycle_walk_ignores_missing_contracts() {
        struct Root;

        let storage = storage_with(vec![
            ServiceDescriptor::builder::<Leaf>(Lifetime::Singleton)
                .factory(|| Ok(Arc::new(Leaf)))
                .build()
                .unwrap(),
            ServiceDescriptor::builder::<Root>(Lifetime::Singleton)
                .constructor(
                    "Root",
                    vec![
                        Parameter::required::<Leaf>("leaf"),
                        Parameter::required::<Branch>("branch"),
                    ],
                    |_| Ok(Arc::new(Root)),
                )
                .build()
                .unwrap(),
        ]);

        let key = ContractKey::of::<Root>();
        assert!(GraphWalk::cycles(&storage).visit(key).is_ok());
        assert!(GraphWalk::validation(&storage, true).visit(key).err().unwrap().is_unregistered());
    }
}

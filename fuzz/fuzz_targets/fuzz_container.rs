#![no_main]

//! Fuzz target for registration and recursive resolution
//!
//! Builds random dependency graphs over three contracts (including cycles
//! and scoped dependencies) and checks that resolution never panics and
//! keeps its lifetime guarantees.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_container::{Container, DiError, Lifetime, Parameter};
use std::sync::Arc;

struct A(u32);
struct B(u32);
struct C(u32);

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Slot {
    A,
    B,
    C,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzLifetime {
    Singleton,
    Transient,
    Scoped,
}

impl From<FuzzLifetime> for Lifetime {
    fn from(value: FuzzLifetime) -> Self {
        match value {
            FuzzLifetime::Singleton => Lifetime::Singleton,
            FuzzLifetime::Transient => Lifetime::Transient,
            FuzzLifetime::Scoped => Lifetime::Scoped,
        }
    }
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Strategy {
    Instance(u32),
    Factory(u32),
    FailingFactory,
    DependsOn(Slot),
    OptionallyDependsOn(Slot),
    Empty,
}

#[derive(Debug, Arbitrary)]
enum ContainerOp {
    Register(Slot, FuzzLifetime, Strategy),
    Resolve(Slot),
    ResolveInScope(Slot),
    Validate,
    Dispose,
    Lock,
}

fn parameter(slot: Slot, optional: bool) -> Parameter {
    match (slot, optional) {
        (Slot::A, false) => Parameter::required::<A>("a"),
        (Slot::B, false) => Parameter::required::<B>("b"),
        (Slot::C, false) => Parameter::required::<C>("c"),
        (Slot::A, true) => Parameter::optional::<A>("a"),
        (Slot::B, true) => Parameter::optional::<B>("b"),
        (Slot::C, true) => Parameter::optional::<C>("c"),
    }
}

macro_rules! register {
    ($container:expr, $ty:ident, $lifetime:expr, $strategy:expr) => {{
        let lifetime: Lifetime = $lifetime.into();
        let builder = service_container::ServiceDescriptor::builder::<$ty>(lifetime);
        let builder = match $strategy {
            Strategy::Instance(v) => builder.instance(Arc::new($ty(v))),
            Strategy::Factory(v) => builder.factory(move || Ok(Arc::new($ty(v)))),
            Strategy::FailingFactory => {
                builder.factory(|| Err(DiError::construction("fuzz failure")))
            }
            Strategy::DependsOn(dep) | Strategy::OptionallyDependsOn(dep) => {
                let optional = matches!($strategy, Strategy::OptionallyDependsOn(_));
                builder.constructor(stringify!($ty), vec![parameter(dep, optional)], move |args| {
                    // The argument type is only needed for the downcast
                    match (dep, optional) {
                        (Slot::A, false) => args.take::<A>().map(|_| ())?,
                        (Slot::B, false) => args.take::<B>().map(|_| ())?,
                        (Slot::C, false) => args.take::<C>().map(|_| ())?,
                        (Slot::A, true) => args.take_optional::<A>().map(|_| ())?,
                        (Slot::B, true) => args.take_optional::<B>().map(|_| ())?,
                        (Slot::C, true) => args.take_optional::<C>().map(|_| ())?,
                    }
                    Ok(Arc::new($ty(0)))
                })
            }
            Strategy::Empty => builder,
        };
        match builder.build() {
            Ok(descriptor) => $container.register(descriptor).map(|_| true),
            Err(DiError::Configuration { .. }) => Ok(false),
            Err(other) => panic!("unexpected build error: {other}"),
        }
    }};
}

macro_rules! resolve_twice {
    ($resolver:expr, $ty:ident, $lifetime:expr) => {{
        let first = $resolver.resolve::<$ty>();
        let second = $resolver.resolve::<$ty>();
        if let (Ok(a), Ok(b)) = (&first, &second) {
            match $lifetime {
                Some(Lifetime::Singleton) | Some(Lifetime::Scoped) => assert!(Arc::ptr_eq(a, b)),
                _ => {}
            }
        }
        first.map(|_| ())
    }};
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();
    let mut locked = false;

    for op in ops.into_iter().take(64) {
        match op {
            ContainerOp::Register(slot, lifetime, strategy) => {
                let result = match slot {
                    Slot::A => register!(container, A, lifetime, strategy),
                    Slot::B => register!(container, B, lifetime, strategy),
                    Slot::C => register!(container, C, lifetime, strategy),
                };
                if locked {
                    assert!(matches!(result, Err(DiError::Locked) | Ok(false)));
                }
            }
            ContainerOp::Resolve(slot) => {
                let (registered, lifetime) = match slot {
                    Slot::A => (container.contains::<A>(), container.lifetime_of::<A>()),
                    Slot::B => (container.contains::<B>(), container.lifetime_of::<B>()),
                    Slot::C => (container.contains::<C>(), container.lifetime_of::<C>()),
                };
                let result = match slot {
                    Slot::A => resolve_twice!(container, A, lifetime),
                    Slot::B => resolve_twice!(container, B, lifetime),
                    Slot::C => resolve_twice!(container, C, lifetime),
                };
                if !registered {
                    assert!(matches!(result, Err(DiError::Unregistered { .. })));
                }
                if lifetime == Some(Lifetime::Scoped) {
                    assert!(result.is_err());
                }
            }
            ContainerOp::ResolveInScope(slot) => {
                container.scoped(|scope| {
                    let _ = match slot {
                        Slot::A => resolve_twice!(scope, A, container.lifetime_of::<A>()),
                        Slot::B => resolve_twice!(scope, B, container.lifetime_of::<B>()),
                        Slot::C => resolve_twice!(scope, C, container.lifetime_of::<C>()),
                    };
                });
            }
            ContainerOp::Validate => {
                let _ = container.validate();
            }
            ContainerOp::Dispose => {
                container.dispose();
                assert_eq!(container.cached_singletons(), 0);
            }
            ContainerOp::Lock => {
                container.lock();
                locked = true;
            }
        }
    }
});

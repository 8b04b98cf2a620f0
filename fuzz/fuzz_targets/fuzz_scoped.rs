#![no_main]

//! Fuzz target for scope lifecycles
//!
//! Opens, uses, disposes and drops scopes in random order and checks that
//! every scoped instance is disposed exactly once.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_container::{Container, DiError, Dispose, ServiceScope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    disposed: AtomicUsize,
}

struct Session {
    counters: Arc<Counters>,
}

impl Dispose for Session {
    fn dispose(&self) {
        self.counters.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Arbitrary)]
enum ScopedOp {
    CreateScope,
    Resolve(u8),
    Dispose(u8),
    Drop(u8),
    ResolveFromRoot,
}

fuzz_target!(|ops: Vec<ScopedOp>| {
    let counters = Arc::new(Counters::default());
    let container = Container::new();
    let shared = Arc::clone(&counters);
    container
        .register_scoped::<Session>(move |b| {
            b.factory(move || {
                shared.created.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Session {
                    counters: Arc::clone(&shared),
                }))
            })
            .disposable()
        })
        .unwrap();

    let mut scopes: Vec<ServiceScope> = Vec::new();

    for op in ops.into_iter().take(100) { // Limit operations to prevent OOM
        match op {
            ScopedOp::CreateScope => scopes.push(container.create_scope()),
            ScopedOp::Resolve(i) if !scopes.is_empty() => {
                let scope = &scopes[i as usize % scopes.len()];
                match scope.resolve::<Session>() {
                    Ok(a) => {
                        let b = scope.resolve::<Session>().unwrap();
                        assert!(Arc::ptr_eq(&a, &b));
                    }
                    Err(err) => {
                        assert!(scope.is_disposed());
                        assert!(matches!(err, DiError::ScopeDisposed { .. }));
                    }
                }
            }
            ScopedOp::Dispose(i) if !scopes.is_empty() => {
                let scope = &scopes[i as usize % scopes.len()];
                scope.dispose();
                assert!(scope.is_empty());
            }
            ScopedOp::Drop(i) if !scopes.is_empty() => {
                let idx = i as usize % scopes.len();
                drop(scopes.swap_remove(idx));
            }
            ScopedOp::ResolveFromRoot => {
                assert!(matches!(
                    container.resolve::<Session>(),
                    Err(DiError::NoActiveScope { .. })
                ));
            }
            _ => {}
        }
    }

    drop(scopes);
    assert_eq!(
        counters.created.load(Ordering::SeqCst),
        counters.disposed.load(Ordering::SeqCst)
    );
});

//! Descriptor table for the container
//!
//! Uses DashMap for lock-free concurrent access. Each entry pairs a
//! descriptor with the cell that caches its singleton instance, so a
//! re-registration drops the old cache together with the old descriptor.

use crate::descriptor::ServiceDescriptor;
use crate::factory::AnyArc;
use crate::provider::ContractKey;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// A descriptor plus its lazily initialised singleton
pub(crate) struct Registration {
    pub descriptor: ServiceDescriptor,
    pub singleton: OnceCell<AnyArc>,
}

impl Registration {
    #[inline]
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            singleton: OnceCell::new(),
        }
    }
}

/// Thread-safe storage for registrations
///
/// Uses `DashMap` with `ahash` for maximum concurrent performance.
/// Lookups hand out `Arc<Registration>` clones so no shard guard is held
/// while a service is being constructed.
pub(crate) struct ServiceStorage {
    registrations: DashMap<ContractKey, Arc<Registration>, RandomState>,
}

impl ServiceStorage {
    /// Create new empty storage with optimized shard count.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical DI containers with <50 services.
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with pre-allocated capacity and optimized shards.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        // Scale shards based on expected capacity and concurrency needs
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            registrations: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Insert a descriptor, replacing any previous registration for the contract.
    ///
    /// Returns true if a previous registration was replaced.
    #[inline]
    pub fn insert(&self, descriptor: ServiceDescriptor) -> bool {
        let key = descriptor.contract();
        self.registrations
            .insert(key, Arc::new(Registration::new(descriptor)))
            .is_some()
    }

    #[inline]
    pub fn get(&self, key: &ContractKey) -> Option<Arc<Registration>> {
        self.registrations.get(key).map(|r| Arc::clone(r.value()))
    }

    #[inline]
    pub fn contains(&self, key: &ContractKey) -> bool {
        self.registrations.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn keys(&self) -> Vec<ContractKey> {
        self.registrations.iter().map(|r| *r.key()).collect()
    }

    /// Snapshot of all registrations
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        self.registrations
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    /// Number of singletons that have been constructed
    pub fn cached_singletons(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.value().singleton.get().is_some())
            .count()
    }

    /// Take every constructed singleton out of its cell.
    ///
    /// Each cell is replaced by a fresh registration so the next resolve
    /// builds a new instance.
    pub fn drain_singletons(&self) -> Vec<(Arc<Registration>, AnyArc)> {
        let mut drained = Vec::new();
        for mut entry in self.registrations.iter_mut() {
            if let Some(instance) = entry.value().singleton.get().cloned() {
                let fresh = Arc::new(Registration::new(entry.value().descriptor.clone()));
                let old = std::mem::replace(entry.value_mut(), fresh);
                drained.push((old, instance));
            }
        }
        drained
    }
}

impl Default for ServiceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStorage")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lifetime;

    struct TestService {
        value: i32,
    }

    fn factory_descriptor(value: i32) -> ServiceDescriptor {
        ServiceDescriptor::builder::<TestService>(Lifetime::Singleton)
            .factory(move || Ok(Arc::new(TestService { value })))
            .build()
            .unwrap()
    }

    #[test]
    fn test_storage_insert_and_get() {
        let storage = ServiceStorage::new();
        let key = ContractKey::of::<TestService>();

        assert!(!storage.contains(&key));
        assert!(!storage.insert(factory_descriptor(1)));
        assert!(storage.contains(&key));

        let registration = storage.get(&key).unwrap();
        assert_eq!(registration.descriptor.strategy(), "factory");
        assert!(registration.singleton.get().is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let storage = ServiceStorage::new();
        storage.insert(factory_descriptor(1));
        assert!(storage.insert(factory_descriptor(2)));
        assert_eq!(storage.len(), 1);

        let registration = storage.get(&ContractKey::of::<TestService>()).unwrap();
        let CreationCheck(value) = build(&registration);
        assert_eq!(value, 2);
    }

    #[test]
    fn test_drain_singletons_resets_cells() {
        let storage = ServiceStorage::new();
        storage.insert(factory_descriptor(5));
        let key = ContractKey::of::<TestService>();

        let registration = storage.get(&key).unwrap();
        registration
            .singleton
            .set(crate::factory::erase(Arc::new(TestService { value: 5 })))
            .ok();
        assert_eq!(storage.cached_singletons(), 1);

        let drained = storage.drain_singletons();
        assert_eq!(drained.len(), 1);
        assert_eq!(storage.cached_singletons(), 0);
        assert!(storage.get(&key).unwrap().singleton.get().is_none());
    }

    struct CreationCheck(i32);

    fn build(registration: &Registration) -> CreationCheck {
        match &registration.descriptor.strategy {
            crate::factory::CreationStrategy::Build(crate::factory::Recipe::Factory(f)) => {
                let any = f().unwrap();
                let svc = crate::factory::downcast::<TestService>(&any).unwrap();
                CreationCheck(svc.value)
            }
            _ => panic!("expected factory strategy"),
        }
    }
}

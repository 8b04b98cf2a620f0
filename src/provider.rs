//! Contract-side traits and keys
//!
//! These types describe *what* can be registered: the contract key, its
//! lifetime policy, and how an implementation is viewed as a contract.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Marker trait for types that can be used as contracts or implementations.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`,
/// including unsized trait objects such as `dyn Logger`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Identifier of a registered contract.
///
/// Equality and hashing only consider the `TypeId`; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct ContractKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ContractKey {
    /// Key for contract `C`
    #[inline]
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ContractKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractKey {}

impl Hash for ContractKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Service lifetime specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance per container, created lazily on first resolve
    #[default]
    Singleton,

    /// New instance created on every resolve
    Transient,

    /// One instance per scope
    Scoped,
}

impl Lifetime {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
        }
    }

    /// Returns `true` if resolved instances are cached somewhere.
    #[inline]
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Views an implementation as contract `C`.
///
/// Every type provides itself. Binding a concrete type to a trait-object
/// contract needs one impl per contract, usually written with the
/// [`provides!`](crate::provides) macro or `#[derive(Service)]` with
/// `#[provides(...)]`.
///
/// ```rust
/// use service_container::{provides, Provides};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) {
///         println!("{msg}");
///     }
/// }
///
/// provides!(ConsoleLogger: dyn Logger);
///
/// let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger).provide();
/// logger.log("hello");
/// ```
pub trait Provides<C: ?Sized> {
    fn provide(self: Arc<Self>) -> Arc<C>;
}

impl<T: Injectable> Provides<T> for T {
    #[inline]
    fn provide(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Implement [`Provides`] for one or more trait-object contracts.
#[macro_export]
macro_rules! provides {
    ($impl:ty: $($contract:ty),+ $(,)?) => {
        $(
            impl $crate::Provides<$contract> for $impl {
                #[inline]
                fn provide(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$contract> {
                    self
                }
            }
        )+
    };
}

/// Resource cleanup run when the owner of a cached instance is disposed.
///
/// Attach it to a registration with
/// [`DescriptorBuilder::disposable`](crate::DescriptorBuilder::disposable).
/// Trait-object contracts can pick it up as a supertrait
/// (`trait Repository: Dispose`).
pub trait Dispose: Send + Sync {
    fn dispose(&self);
}

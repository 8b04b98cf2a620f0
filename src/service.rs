//! Services with declared constructor parameters
//!
//! A [`Service`] names its constructor parameters through the
//! `Dependencies` associated type. The container reads the parameter list,
//! resolves every entry left-to-right, and hands the finished tuple to
//! [`Service::create`]. No runtime reflection is involved.
//!
//! # Example
//!
//! ```rust
//! use service_container::{Container, Service, Result};
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! impl Service for Config {
//!     type Dependencies = ();
//!
//!     fn create(_: ()) -> Result<Self> {
//!         Ok(Config { url: "postgres://localhost".into() })
//!     }
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! impl Service for Database {
//!     type Dependencies = Arc<Config>;
//!
//!     fn create(config: Arc<Config>) -> Result<Self> {
//!         Ok(Database { config })
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_singleton::<Config>(|b| b.implementation::<Config>()).unwrap();
//! container.register_transient::<Database>(|b| b.implementation::<Database>()).unwrap();
//!
//! let db = container.resolve::<Database>().unwrap();
//! assert_eq!(db.config.url, "postgres://localhost");
//! ```

use crate::factory::{Arguments, Parameter};
use crate::{Injectable, Result};
use std::sync::Arc;

// =============================================================================
// Service Trait
// =============================================================================

/// A concrete implementation whose constructor parameters are declared at
/// compile time.
///
/// # Supported Dependency Types
///
/// - `()` - No dependencies
/// - `Arc<C>` - Single required contract (`C` may be `dyn Trait`)
/// - `Option<Arc<C>>` - Optional contract, `None` when unregistered
/// - Tuples of the two above, up to 8 elements
pub trait Service: Injectable + Sized {
    /// The constructor parameters, in declaration order.
    type Dependencies: Dependencies;

    /// Create a new instance given the resolved dependencies.
    ///
    /// Errors are returned unchanged to the caller of `resolve`.
    fn create(deps: Self::Dependencies) -> Result<Self>;
}

// =============================================================================
// Dependency lists
// =============================================================================

/// A single constructor parameter.
pub trait Dependency: Sized {
    /// Describe the parameter at position `index`.
    fn parameter(index: usize) -> Parameter;

    /// Take the resolved value for this parameter.
    fn take(args: &mut Arguments) -> Result<Self>;
}

impl<C: ?Sized + Injectable> Dependency for Arc<C> {
    #[inline]
    fn parameter(index: usize) -> Parameter {
        Parameter::required::<C>(PARAMETER_NAMES[index])
    }

    #[inline]
    fn take(args: &mut Arguments) -> Result<Self> {
        args.take::<C>()
    }
}

impl<C: ?Sized + Injectable> Dependency for Option<Arc<C>> {
    #[inline]
    fn parameter(index: usize) -> Parameter {
        Parameter::optional::<C>(PARAMETER_NAMES[index])
    }

    #[inline]
    fn take(args: &mut Arguments) -> Result<Self> {
        args.take_optional::<C>()
    }
}

// Positional names used in diagnostics
const PARAMETER_NAMES: [&str; 8] = ["arg0", "arg1", "arg2", "arg3", "arg4", "arg5", "arg6", "arg7"];

/// An ordered list of constructor parameters.
pub trait Dependencies: Sized {
    /// The declared parameters, left-to-right.
    fn parameters() -> Vec<Parameter>;

    /// Build the value from arguments resolved for [`Dependencies::parameters`].
    fn from_arguments(args: &mut Arguments) -> Result<Self>;
}

// No dependencies
impl Dependencies for () {
    #[inline]
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    #[inline]
    fn from_arguments(_args: &mut Arguments) -> Result<Self> {
        Ok(())
    }
}

// Single dependency
impl<C: ?Sized + Injectable> Dependencies for Arc<C> {
    #[inline]
    fn parameters() -> Vec<Parameter> {
        vec![<Self as Dependency>::parameter(0)]
    }

    #[inline]
    fn from_arguments(args: &mut Arguments) -> Result<Self> {
        <Self as Dependency>::take(args)
    }
}

// Optional dependency
impl<C: ?Sized + Injectable> Dependencies for Option<Arc<C>> {
    #[inline]
    fn parameters() -> Vec<Parameter> {
        vec![<Self as Dependency>::parameter(0)]
    }

    #[inline]
    fn from_arguments(args: &mut Arguments) -> Result<Self> {
        <Self as Dependency>::take(args)
    }
}

// Tuple implementations (1-8 elements)
macro_rules! impl_dependencies_tuple {
    ($($T:ident => $idx:tt),+) => {
        impl<$($T: Dependency),+> Dependencies for ($($T,)+) {
            #[inline]
            fn parameters() -> Vec<Parameter> {
                vec![$($T::parameter($idx)),+]
            }

            #[inline]
            fn from_arguments(args: &mut Arguments) -> Result<Self> {
                // Tuple expressions evaluate left-to-right
                Ok(($($T::take(args)?,)+))
            }
        }
    };
}

impl_dependencies_tuple!(A => 0);
impl_dependencies_tuple!(A => 0, B => 1);
impl_dependencies_tuple!(A => 0, B => 1, C => 2);
impl_dependencies_tuple!(A => 0, B => 1, C => 2, D => 3);
impl_dependencies_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_dependencies_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);
impl_dependencies_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6);
impl_dependencies_tuple!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5, G => 6, H => 7);

// =============================================================================
// Dependency Graph Helpers
// =============================================================================

/// Type names of the contracts a service depends on.
///
/// Mainly useful for debugging and visualization.
pub fn dependency_names<S: Service>() -> Vec<&'static str> {
    S::Dependencies::parameters()
        .iter()
        .filter_map(|p| p.contract().map(|c| c.type_name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::erase;

    struct Config;

    struct Cache;

    trait Metrics: Send + Sync {}

    #[test]
    fn test_unit_has_no_parameters() {
        assert!(<() as Dependencies>::parameters().is_empty());
    }

    #[test]
    fn test_tuple_parameters_keep_declaration_order() {
        type Deps = (Arc<Config>, Option<Arc<dyn Metrics>>, Arc<Cache>);
        let params = <Deps as Dependencies>::parameters();

        assert_eq!(params.len(), 3);
        assert!(params[0].contract().unwrap().type_name().ends_with("Config"));
        assert!(params[1].is_optional());
        assert!(params[1].contract().unwrap().type_name().contains("Metrics"));
        assert!(params[2].contract().unwrap().type_name().ends_with("Cache"));
        assert_eq!(params[2].name(), "arg2");
    }

    #[test]
    fn test_from_arguments_tuple() {
        type Deps = (Arc<Config>, Option<Arc<Cache>>);
        let params = <Deps as Dependencies>::parameters();
        let config = Arc::new(Config);

        let mut args = Arguments::new(
            "Demo",
            vec![(params[0], Some(erase(Arc::clone(&config)))), (params[1], None)],
        );

        let (got, cache) = <Deps as Dependencies>::from_arguments(&mut args).unwrap();
        assert!(Arc::ptr_eq(&got, &config));
        assert!(cache.is_none());
    }

    #[test]
    fn test_dependency_names() {
        struct Repo;

        impl Service for Repo {
            type Dependencies = (Arc<Config>, Arc<Cache>);

            fn create(_: Self::Dependencies) -> Result<Self> {
                Ok(Repo)
            }
        }

        let names = dependency_names::<Repo>();
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("Config"));
    }
}

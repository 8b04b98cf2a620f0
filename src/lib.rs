//! # service-container - Runtime Dependency Resolution for Rust
//!
//! A thread-safe container that maps *contracts* (concrete types or
//! `dyn Trait` objects) to registrations and builds the object graph on
//! demand, honoring one of three lifetimes per registration.
//!
//! ## Features
//!
//! - **Three lifetimes** - singleton, transient and per-scope instances
//! - **Trait-object contracts** - register `dyn Trait` and resolve `Arc<dyn Trait>`
//! - **Declared constructors** - the [`Service`] trait lists constructor
//!   parameters as typed values; `#[derive(Service)]` writes it for you
//! - **Fail fast** - invalid registrations are rejected when they are made
//! - **Cycle detection** - circular graphs fail with the offending path
//! - **Lock-free lookups** - `DashMap` + `ahash` for the descriptor table
//! - **Observable** - optional `tracing` integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use service_container::{provides, Container, Result, Service};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) {
//!         println!("{msg}");
//!     }
//! }
//!
//! impl Service for ConsoleLogger {
//!     type Dependencies = ();
//!
//!     fn create(_: ()) -> Result<Self> {
//!         Ok(ConsoleLogger)
//!     }
//! }
//!
//! provides!(ConsoleLogger: dyn Logger);
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Service for UserService {
//!     type Dependencies = Arc<dyn Logger>;
//!
//!     fn create(logger: Arc<dyn Logger>) -> Result<Self> {
//!         Ok(UserService { logger })
//!     }
//! }
//!
//! let container = Container::new();
//! container
//!     .register_singleton::<dyn Logger>(|b| b.implementation::<ConsoleLogger>())
//!     .unwrap();
//! container
//!     .register_transient::<UserService>(|b| b.implementation::<UserService>())
//!     .unwrap();
//!
//! let users = container.resolve::<UserService>().unwrap();
//! users.logger.log("resolved");
//! ```
//!
//! ## Service Lifetimes
//!
//! | Lifetime | Instances | Cached in |
//! |----------|-----------|-----------|
//! | [`Lifetime::Singleton`] | one per container | the container |
//! | [`Lifetime::Transient`] | one per resolve | nowhere |
//! | [`Lifetime::Scoped`] | one per scope | the [`ServiceScope`] |
//!
//! Scoped contracts can only be resolved through a scope:
//!
//! ```rust
//! use service_container::{Container, DiError};
//! use std::sync::Arc;
//!
//! struct RequestContext;
//!
//! let container = Container::new();
//! container
//!     .register_scoped::<RequestContext>(|b| b.factory(|| Ok(Arc::new(RequestContext))))
//!     .unwrap();
//!
//! assert!(matches!(
//!     container.resolve::<RequestContext>(),
//!     Err(DiError::NoActiveScope { .. })
//! ));
//!
//! container.scoped(|scope| {
//!     let ctx = scope.resolve::<RequestContext>().unwrap();
//!     assert!(Arc::ptr_eq(&ctx, &scope.resolve::<RequestContext>().unwrap()));
//! });
//! ```

// Lets `#[derive(Service)]` output resolve inside this crate's own tests
#[cfg(all(test, feature = "derive"))]
extern crate self as service_container;

mod container;
mod descriptor;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod resolver;
mod scope;
mod service;
mod storage;

pub use container::{Container, ContainerOptions};
pub use descriptor::{DescriptorBuilder, ServiceDescriptor};
pub use error::{DiError, Result};
pub use factory::{AnyArc, Arguments, Constructor, Parameter};
pub use provider::{ContractKey, Dispose, Injectable, Lifetime, Provides};
pub use scope::{Scope, ServiceScope};
pub use service::{dependency_names, Dependencies, Dependency, Service};

#[cfg(feature = "derive")]
pub use service_container_derive::Service;

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        provides, Container, ContainerOptions, DiError, Dispose, Injectable, Lifetime, Provides,
        Result, Service, ServiceDescriptor, ServiceScope,
    };
    pub use std::sync::Arc;
}

//! # Bindery
//!
//! A dependency injection container core for Rust, built around *binding
//! normalization*: user-declared bindings and lazily-installed sub-components
//! are validated, deduplicated and compressed into an immutable table that an
//! [`Injector`] consumes to construct objects on demand, at most once per
//! type.
//!
//! ## Features
//!
//! - **Deferred components**: sub-components are factory functions, expanded
//!   on demand and deduplicated by identity, so a component installed from
//!   many places runs exactly once
//! - **Component replacement**: swap any installed sub-component for a
//!   substitute (e.g. a fake for tests) without touching the installers
//! - **Binding compression**: `interface -> impl -> constructor` chains fuse
//!   into a single binding, with undo records for overlay components that
//!   need the intermediate type back
//! - **Multibindings**: accumulate an ordered list of contributions per type
//!   across the whole component tree
//! - **Structured errors**: conflicts, installation cycles and dependency
//!   loops are reported as typed values carrying the offending identities
//!
//! ## Quick Start
//!
//! ```rust
//! use bindery::{Component, Inject, Injector, Result};
//! use std::sync::Arc;
//!
//! // 1. Define your services
//! struct Database;
//!
//! impl Inject for Database {
//!     fn inject(_injector: &mut Injector) -> Result<Self> {
//!         Ok(Database)
//!     }
//! }
//!
//! struct UserService {
//!     database: Arc<Database>,
//! }
//!
//! impl Inject for UserService {
//!     fn inject(injector: &mut Injector) -> Result<Self> {
//!         Ok(Self {
//!             database: injector.get::<Database>()?,
//!         })
//!     }
//! }
//!
//! // 2. Declare a component
//! fn database_component() -> Component {
//!     Component::new().register_provider::<Database>()
//! }
//!
//! let component = Component::new()
//!     .install(database_component)
//!     .register_provider::<UserService>();
//!
//! // 3. Build the injector and resolve
//! let mut injector = Injector::new(component, &[]).unwrap();
//! let service = injector.get::<UserService>().unwrap();
//! let _ = &service.database;
//! ```

pub mod component;
pub mod error;
pub mod injector;
mod normalize;
pub mod registry;
pub mod storage;

// Re-export core types
pub use component::{
    AllocRequirement, AnyArc, Component, ComponentRef, ConstructBinding, CreateFn, Inject,
    Instance, LazyComponent, MultibindingData, StorageEntry, Upcast, VectorCreateFn,
};
pub use error::{BinderyError, Result};
pub use injector::Injector;
pub use registry::{Annotated, TypeId};
pub use storage::{
    AllocatorSizing, CompressionMode, NormalizedBinding, NormalizedComponentStorage,
    NormalizedMultibindingSet,
};

/// Prelude module for convenient imports
///
/// ```
/// use bindery::prelude::*;
/// ```
pub mod prelude {
    pub use crate::component::{Component, ComponentRef, Inject, LazyComponent, Upcast};
    pub use crate::error::{BinderyError, Result};
    pub use crate::injector::Injector;
    pub use crate::registry::{Annotated, TypeId};
    pub use crate::storage::{CompressionMode, NormalizedComponentStorage};
    pub use std::sync::Arc;
}

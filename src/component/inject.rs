use crate::error::Result;
use crate::injector::Injector;
use crate::registry::TypeId;
use std::sync::Arc;

/// Trait for types the injector can construct from their dependencies.
///
/// This is the hand-written form of what a metaprogramming layer would derive
/// from a constructor signature: how to build the value, and which types it
/// needs first.
///
/// # Example
/// ```
/// use bindery::{Inject, Injector, Result, TypeId};
/// use std::sync::Arc;
///
/// struct Database;
///
/// impl Inject for Database {
///     fn inject(_injector: &mut Injector) -> Result<Self> {
///         Ok(Database)
///     }
/// }
///
/// struct UserService {
///     database: Arc<Database>,
/// }
///
/// impl Inject for UserService {
///     fn inject(injector: &mut Injector) -> Result<Self> {
///         Ok(Self {
///             database: injector.get::<Database>()?,
///         })
///     }
///
///     fn dependencies() -> Vec<TypeId> {
///         vec![TypeId::of::<Database>()]
///     }
/// }
/// ```
pub trait Inject: Sized + Send + Sync + 'static {
    /// Create an instance by resolving dependencies from the injector
    fn inject(injector: &mut Injector) -> Result<Self>;

    /// The types this constructor resolves, in no particular order
    fn dependencies() -> Vec<TypeId> {
        Vec::new()
    }
}

/// Conversion from a concrete implementation to the interface it is bound to.
///
/// Used by [`Component::bind`](crate::Component::bind) to coerce
/// `Arc<Impl> -> Arc<dyn Trait>`; the usual implementation is just `self`.
pub trait Upcast<I: ?Sized + Send + Sync + 'static>: Send + Sync + Sized + 'static {
    fn upcast(self: Arc<Self>) -> Arc<I>;
}

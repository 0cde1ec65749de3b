//! User-facing component model: the entry stream and its builder.

mod entry;
mod inject;
mod lazy_component;

pub use entry::{
    AllocRequirement, AnyArc, ConstructBinding, CreateFn, Instance, MultibindingData,
    StorageEntry, VectorCreateFn,
};
pub use inject::{Inject, Upcast};
pub use lazy_component::{ComponentRef, LazyComponent};

use crate::error::Result;
use crate::injector::Injector;
use crate::registry::TypeId;
use std::hash::Hash;
use std::sync::Arc;

/// Builder for a component: a collection of bindings plus sub-component
/// installations, compiled down to a linear stream of [`StorageEntry`] values.
///
/// The builder only records declarations; validation, deduplication and
/// expansion all happen during normalization.
///
/// # Example
/// ```
/// use bindery::{Component, Inject, Injector, Result};
/// use std::sync::Arc;
///
/// struct Config {
///     url: String,
/// }
///
/// struct Database;
///
/// impl Inject for Database {
///     fn inject(_injector: &mut Injector) -> Result<Self> {
///         Ok(Database)
///     }
/// }
///
/// let component = Component::new()
///     .bind_instance(Arc::new(Config { url: "localhost".into() }))
///     .register_provider::<Database>();
/// ```
#[derive(Debug, Default)]
pub struct Component {
    entries: Vec<StorageEntry>,
}

impl Component {
    /// Create a new empty component
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind a type to an already-existing instance.
    ///
    /// Binding the same object twice is idempotent; binding a different
    /// object to the same type is a conflict reported at normalization.
    pub fn bind_instance<T: ?Sized + Send + Sync + 'static>(mut self, object: Arc<T>) -> Self {
        self.entries.push(StorageEntry::ConstructedObject {
            type_id: TypeId::of::<T>(),
            instance: Instance::new(object),
        });
        self
    }

    /// Bind a type to its [`Inject`] constructor, run on first injection
    pub fn register_provider<T: Inject>(mut self) -> Self {
        self.entries.push(StorageEntry::ObjectToConstruct {
            type_id: TypeId::of::<T>(),
            binding: ConstructBinding {
                create: create_from_provider::<T>,
                deps: T::dependencies().into(),
                alloc: AllocRequirement::of::<T>(),
            },
        });
        self
    }

    /// Bind an interface to a concrete implementation.
    ///
    /// Emits the `I -> C` forwarding binding plus a compression hint carrying
    /// the fused constructor, so the intermediate `C` object can be elided
    /// when nothing else needs it.
    pub fn bind<I, C>(mut self) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Inject + Upcast<I>,
    {
        let interface_id = TypeId::of::<I>();
        let impl_id = TypeId::of::<C>();
        self.entries.push(StorageEntry::ObjectToConstruct {
            type_id: interface_id,
            binding: ConstructBinding {
                create: create_forwarding::<I, C>,
                deps: vec![impl_id].into(),
                alloc: AllocRequirement::none(),
            },
        });
        self.entries.push(StorageEntry::CompressedBinding {
            interface_id,
            impl_id,
            create: create_compressed::<I, C>,
        });
        self
    }

    /// Contribute an existing instance to the multibinding set of `T`.
    ///
    /// Multibindings are not deduplicated: adding the same instance `n` times
    /// yields a list with `n` occurrences.
    pub fn add_multibinding_instance<T: ?Sized + Send + Sync + 'static>(
        mut self,
        object: Arc<T>,
    ) -> Self {
        let type_id = TypeId::of::<T>();
        self.entries.push(StorageEntry::Multibinding {
            type_id,
            data: MultibindingData::Instance(Instance::new(object)),
        });
        self.push_vector_creator::<T>(type_id)
    }

    /// Contribute a constructed element to the multibinding set of `T`
    pub fn add_multibinding_provider<T: Inject>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        self.entries.push(StorageEntry::Multibinding {
            type_id,
            data: MultibindingData::ToConstruct(ConstructBinding {
                create: create_from_provider::<T>,
                deps: T::dependencies().into(),
                alloc: AllocRequirement::of::<T>(),
            }),
        });
        self.push_vector_creator::<T>(type_id)
    }

    fn push_vector_creator<T: ?Sized + Send + Sync + 'static>(mut self, type_id: TypeId) -> Self {
        self.entries.push(StorageEntry::MultibindingVectorCreator {
            type_id,
            create_vector: create_multibinding_vector::<T>,
        });
        self
    }

    /// Install a sub-component.
    ///
    /// Installation is lazy and deduplicated: the factory runs during
    /// normalization, at most once per identity.
    pub fn install(self, fun: fn() -> Component) -> Self {
        self.install_component(LazyComponent::of(fun))
    }

    /// Install a sub-component factory applied to `args`, deduplicated
    /// structurally by `(fn, args)`
    pub fn install_with_args<A>(self, fun: fn(A) -> Component, args: A) -> Self
    where
        A: Hash + PartialEq + Clone + Send + Sync + 'static,
    {
        self.install_component(LazyComponent::with_args(fun, args))
    }

    /// Install an already-built [`LazyComponent`] reference
    pub fn install_component(mut self, component: LazyComponent) -> Self {
        self.entries.push(StorageEntry::LazyComponent(component));
        self
    }

    /// Declare that wherever `target` is installed, `replacement` expands in
    /// its place.
    ///
    /// The declaration must precede the first installation of `target`; a
    /// replacement whose target has no installation is silently dropped.
    pub fn replace_component(mut self, target: LazyComponent, replacement: LazyComponent) -> Self {
        self.entries.push(StorageEntry::ReplacedLazyComponent {
            target,
            replacement,
        });
        self
    }

    /// No-args convenience form of [`Component::replace_component`]
    pub fn replace(self, target: fn() -> Component, replacement: fn() -> Component) -> Self {
        self.replace_component(LazyComponent::of(target), LazyComponent::of(replacement))
    }

    /// Number of entries recorded so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the builder, yielding the stream reversed so LIFO consumption
    /// restores declaration order.
    pub(crate) fn into_reversed_entries(mut self) -> Vec<StorageEntry> {
        self.entries.reverse();
        self.entries
    }
}

fn create_from_provider<T: Inject>(injector: &mut Injector) -> Result<Instance> {
    let value = T::inject(injector)?;
    Ok(Instance::new(Arc::new(value)))
}

fn create_forwarding<I, C>(injector: &mut Injector) -> Result<Instance>
where
    I: ?Sized + Send + Sync + 'static,
    C: Inject + Upcast<I>,
{
    let concrete = injector.get::<C>()?;
    Ok(Instance::new(<C as Upcast<I>>::upcast(concrete)))
}

/// Fused `I -> C -> constructor` thunk: builds the concrete object directly,
/// without materializing a `C` singleton.
fn create_compressed<I, C>(injector: &mut Injector) -> Result<Instance>
where
    I: ?Sized + Send + Sync + 'static,
    C: Inject + Upcast<I>,
{
    let concrete = Arc::new(C::inject(injector)?);
    Ok(Instance::new(<C as Upcast<I>>::upcast(concrete)))
}

fn create_multibinding_vector<T: ?Sized + Send + Sync + 'static>(
    elements: Vec<Instance>,
) -> Result<Instance> {
    let mut vector: Vec<Arc<T>> = Vec::with_capacity(elements.len());
    for element in &elements {
        vector.push(element.downcast::<T>()?);
    }
    Ok(Instance::new(Arc::new(vector)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    struct Service;

    impl Inject for Service {
        fn inject(_injector: &mut Injector) -> Result<Self> {
            Ok(Service)
        }
    }

    fn sub_component() -> Component {
        Component::new().register_provider::<Service>()
    }

    #[test]
    fn test_empty_component() {
        assert!(Component::new().is_empty());
    }

    #[test]
    fn test_bind_emits_forwarding_and_compression_hint() {
        trait Api: Send + Sync {}
        impl Api for Service {}
        impl Upcast<dyn Api> for Service {
            fn upcast(self: Arc<Self>) -> Arc<dyn Api> {
                self
            }
        }

        let component = Component::new().bind::<dyn Api, Service>();
        assert_eq!(component.len(), 2);
        let entries = component.into_reversed_entries();
        assert!(matches!(entries[1], StorageEntry::ObjectToConstruct { .. }));
        assert!(matches!(entries[0], StorageEntry::CompressedBinding { .. }));
    }

    #[test]
    fn test_entries_are_reversed() {
        let component = Component::new()
            .register_provider::<Service>()
            .install(sub_component);
        let entries = component.into_reversed_entries();
        assert!(matches!(entries[0], StorageEntry::LazyComponent(_)));
        assert!(matches!(entries[1], StorageEntry::ObjectToConstruct { .. }));
    }

    #[test]
    fn test_multibinding_emits_adjacent_pair() {
        let component = Component::new().add_multibinding_instance(Arc::new(Service));
        let entries = component.into_reversed_entries();
        assert!(matches!(
            entries[1],
            StorageEntry::Multibinding { .. }
        ));
        assert!(matches!(
            entries[0],
            StorageEntry::MultibindingVectorCreator { .. }
        ));
    }

    #[test]
    fn test_provider_create_thunk_identity_is_stable() {
        let a = Component::new().register_provider::<Service>();
        let b = Component::new().register_provider::<Service>();
        let entry_a = a.into_reversed_entries().pop().unwrap();
        let entry_b = b.into_reversed_entries().pop().unwrap();
        match (entry_a, entry_b) {
            (
                StorageEntry::ObjectToConstruct { binding: a, .. },
                StorageEntry::ObjectToConstruct { binding: b, .. },
            ) => assert_eq!(a.create as usize, b.create as usize),
            _ => panic!("expected provider bindings"),
        }
    }
}

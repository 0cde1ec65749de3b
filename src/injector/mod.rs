//! The injector: resolves types against a normalized component, constructing
//! each object at most once.

use crate::component::{Component, Instance, MultibindingData, VectorCreateFn};
use crate::error::{BinderyError, Result};
use crate::normalize;
use crate::registry::TypeId;
use crate::storage::{
    AllocatorSizing, CompressionMode, NormalizedBinding, NormalizedComponentStorage,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Runtime object producing and owning instances on request.
///
/// Lookup is `TypeId`-keyed and O(1) average; every type is constructed at
/// most once and shared behind an `Arc`. The injector is single-threaded by
/// contract, which the `&mut self` receivers make explicit.
///
/// # Example
/// ```
/// use bindery::{Component, Inject, Injector, Result};
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
/// let mut injector = Injector::new(
///     Component::new().register_provider::<Database>(),
///     &[],
/// )
/// .unwrap();
///
/// let database: Arc<Database> = injector.get::<Database>().unwrap();
/// let again = injector.get::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&database, &again));
/// ```
#[derive(Debug)]
pub struct Injector {
    base: Option<Arc<NormalizedComponentStorage>>,
    storage: NormalizedComponentStorage,
    instances: HashMap<TypeId, Instance>,
    multibinding_instances: HashMap<TypeId, Instance>,
    resolving: Vec<TypeId>,
}

impl Injector {
    /// Normalize `component` (permanent compression) and build an injector
    /// over it
    pub fn new(component: Component, exposed_types: &[TypeId]) -> Result<Self> {
        let storage = normalize::normalize(component, exposed_types, CompressionMode::Permanent)?;
        Ok(Self::from_storage(None, storage))
    }

    /// Overlay `component` onto a pre-normalized base and build an injector
    /// over the pair.
    ///
    /// Compressions recorded by the base (undoable mode) are reversed for
    /// every concrete type the overlay references.
    pub fn with_base(
        base: Arc<NormalizedComponentStorage>,
        component: Component,
        exposed_types: &[TypeId],
    ) -> Result<Self> {
        let storage = normalize::normalize_onto(&base, component, exposed_types)?;
        Ok(Self::from_storage(Some(base), storage))
    }

    fn from_storage(
        base: Option<Arc<NormalizedComponentStorage>>,
        storage: NormalizedComponentStorage,
    ) -> Self {
        Self {
            base,
            storage,
            instances: HashMap::new(),
            multibinding_instances: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    /// Resolve an instance of `T`, constructing it (and its dependencies) on
    /// first request
    pub fn get<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>> {
        self.get_by_id(TypeId::of::<T>())?.downcast::<T>()
    }

    /// Type-erased resolution by identifier
    pub fn get_by_id(&mut self, type_id: TypeId) -> Result<Instance> {
        if let Some(existing) = self.instances.get(&type_id) {
            return Ok(existing.clone());
        }

        let binding = self
            .lookup_binding(type_id)
            .ok_or_else(|| BinderyError::type_not_bound(type_id))?
            .clone();

        match binding {
            NormalizedBinding::Instance(instance) => {
                self.instances.insert(type_id, instance.clone());
                Ok(instance)
            }
            NormalizedBinding::ToConstruct(binding) => {
                if let Some(position) = self.resolving.iter().position(|t| *t == type_id) {
                    let mut path = self.resolving[position..].to_vec();
                    path.push(type_id);
                    return Err(BinderyError::self_loop(path));
                }

                trace!(type_id = %type_id, "constructing object");
                self.resolving.push(type_id);
                let constructed = (binding.create)(self);
                self.resolving.pop();
                let instance = constructed?;
                self.instances.insert(type_id, instance.clone());
                Ok(instance)
            }
        }
    }

    /// Materialize the multibinding set of `T` as an ordered list.
    ///
    /// The list is built at most once; a type with no multibindings yields an
    /// empty list.
    pub fn get_multibindings<T: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<Arc<Vec<Arc<T>>>> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.multibinding_instances.get(&type_id) {
            return existing.downcast();
        }

        // Base elements come first: list order is arrival order across the
        // whole normalization.
        let mut elems: Vec<MultibindingData> = Vec::new();
        let mut create_vector: Option<VectorCreateFn> = None;
        if let Some(base) = &self.base {
            if let Some(set) = base.multibinding_set(type_id) {
                elems.extend(set.elems.iter().cloned());
                create_vector = Some(set.create_vector);
            }
        }
        if let Some(set) = self.storage.multibinding_set(type_id) {
            elems.extend(set.elems.iter().cloned());
            create_vector = Some(set.create_vector);
        }

        let Some(create_vector) = create_vector else {
            return Ok(Arc::new(Vec::new()));
        };

        let mut instances: Vec<Instance> = Vec::with_capacity(elems.len());
        for elem in elems {
            match elem {
                MultibindingData::Instance(instance) => instances.push(instance),
                MultibindingData::ToConstruct(binding) => {
                    instances.push((binding.create)(self)?);
                }
            }
        }

        let instance = create_vector(instances)?;
        self.multibinding_instances.insert(type_id, instance.clone());
        instance.downcast()
    }

    /// The storage this injector's own component normalized to (excluding the
    /// base, if any)
    pub fn storage(&self) -> &NormalizedComponentStorage {
        &self.storage
    }

    /// Total per-object buffer sizing across base and own storage
    pub fn allocator_sizing(&self) -> AllocatorSizing {
        match &self.base {
            Some(base) => base.allocator_sizing().combined(self.storage.allocator_sizing()),
            None => self.storage.allocator_sizing(),
        }
    }

    fn lookup_binding(&self, type_id: TypeId) -> Option<&NormalizedBinding> {
        self.storage
            .binding(type_id)
            .or_else(|| self.base.as_deref().and_then(|base| base.binding(type_id)))
    }
}

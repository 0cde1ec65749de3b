use crate::component::LazyComponent;
use crate::error::{BinderyError, Result};
use crate::injector::Injector;
use crate::registry::TypeId;
use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Type-erased shared pointer payload.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Thunk constructing one object, resolving its dependencies on the way.
///
/// Thunks are plain fn pointers so binding identity is pointer identity;
/// per-type state is carried by monomorphization, never by captures.
pub type CreateFn = fn(&mut Injector) -> Result<Instance>;

/// Thunk materializing the final ordered list of a multibinding set.
pub type VectorCreateFn = fn(Vec<Instance>) -> Result<Instance>;

/// A constructed object held behind a type-erased pointer.
///
/// The object is double-wrapped (`Arc<Arc<T>>` erased to `Arc<dyn Any>`) so
/// unsized targets such as `Arc<dyn Service>` travel through the same code
/// path as concrete ones.
#[derive(Clone)]
pub struct Instance {
    object: AnyArc,
    address: usize,
}

impl Instance {
    pub fn new<T: ?Sized + Send + Sync + 'static>(object: Arc<T>) -> Self {
        let address = Arc::as_ptr(&object) as *const () as usize;
        Self {
            object: Arc::new(object),
            address,
        }
    }

    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.object
            .clone()
            .downcast::<Arc<T>>()
            .map(|wrapper| (*wrapper).clone())
            .map_err(|_| BinderyError::downcast_failed(std::any::type_name::<T>()))
    }

    /// Whether two instances point at the same underlying object.
    pub fn same_object(&self, other: &Instance) -> bool {
        self.address == other.address
    }

    pub fn address(&self) -> usize {
        self.address
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({:#x})", self.address)
    }
}

/// Arena space one constructed object will need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocRequirement {
    pub size: usize,
    pub align: usize,
}

impl AllocRequirement {
    pub fn of<T>() -> Self {
        Self {
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
        }
    }

    /// Requirement for a binding that only forwards an existing object.
    pub fn none() -> Self {
        Self { size: 0, align: 1 }
    }
}

/// A binding that constructs its object on first injection.
#[derive(Clone)]
pub struct ConstructBinding {
    pub create: CreateFn,
    pub deps: Arc<[TypeId]>,
    pub alloc: AllocRequirement,
}

impl fmt::Debug for ConstructBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructBinding")
            .field("create", &(self.create as usize as *const ()))
            .field("deps", &self.deps)
            .field("alloc", &self.alloc)
            .finish()
    }
}

/// One element contributed to a multibinding set.
#[derive(Clone, Debug)]
pub enum MultibindingData {
    /// An already-existing instance.
    Instance(Instance),
    /// An element constructed when the set is first materialized.
    ToConstruct(ConstructBinding),
}

/// One tagged entry of the component storage stream.
///
/// The surface builder compiles user declarations down to a linear stream of
/// these; normalization consumes the stream in reverse (LIFO) order so natural
/// declaration order is preserved when popping.
#[derive(Clone)]
pub enum StorageEntry {
    /// Binding to an already-existing instance.
    ConstructedObject { type_id: TypeId, instance: Instance },

    /// Binding that constructs the object on first injection.
    ObjectToConstruct {
        type_id: TypeId,
        binding: ConstructBinding,
    },

    /// Hint that `interface_id` aliases `impl_id`; `create` is the fused
    /// constructor used if the pair is compressed.
    CompressedBinding {
        interface_id: TypeId,
        impl_id: TypeId,
        create: CreateFn,
    },

    /// One element of a multibinding set.
    Multibinding {
        type_id: TypeId,
        data: MultibindingData,
    },

    /// Builds the final ordered list for a multibinding set. Always adjacent
    /// to its [`StorageEntry::Multibinding`] in the stream.
    MultibindingVectorCreator {
        type_id: TypeId,
        create_vector: VectorCreateFn,
    },

    /// Sub-component to expand on demand, deduplicated by identity.
    LazyComponent(LazyComponent),

    /// Brackets the scope of a lazy component's expansion. Pushed by the
    /// expansion engine, never by the surface builder.
    EndMarker(LazyComponent),

    /// Substitution rule: expand `replacement` wherever `target` is installed.
    ReplacedLazyComponent {
        target: LazyComponent,
        replacement: LazyComponent,
    },
}

impl fmt::Debug for StorageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConstructedObject { type_id, instance } => f
                .debug_struct("ConstructedObject")
                .field("type_id", type_id)
                .field("instance", instance)
                .finish(),
            Self::ObjectToConstruct { type_id, binding } => f
                .debug_struct("ObjectToConstruct")
                .field("type_id", type_id)
                .field("binding", binding)
                .finish(),
            Self::CompressedBinding {
                interface_id,
                impl_id,
                ..
            } => f
                .debug_struct("CompressedBinding")
                .field("interface_id", interface_id)
                .field("impl_id", impl_id)
                .finish_non_exhaustive(),
            Self::Multibinding { type_id, data } => f
                .debug_struct("Multibinding")
                .field("type_id", type_id)
                .field("data", data)
                .finish(),
            Self::MultibindingVectorCreator { type_id, .. } => f
                .debug_struct("MultibindingVectorCreator")
                .field("type_id", type_id)
                .finish_non_exhaustive(),
            Self::LazyComponent(component) => {
                f.debug_tuple("LazyComponent").field(component).finish()
            }
            Self::EndMarker(component) => f.debug_tuple("EndMarker").field(component).finish(),
            Self::ReplacedLazyComponent {
                target,
                replacement,
            } => f
                .debug_struct("ReplacedLazyComponent")
                .field("target", target)
                .field("replacement", replacement)
                .finish(),
        }
    }
}

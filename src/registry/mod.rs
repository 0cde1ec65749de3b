//! Process-wide type identifier registry.
//!
//! Every injectable type is assigned a stable [`TypeId`] the first time it is
//! seen. Identifiers are interned in an append-only map, so two lookups of the
//! same (annotated) type always return the same identifier, and identifiers
//! can be used as hash-map keys or ordered without touching the registry
//! again.

mod lazy;

use dashmap::DashMap;
use lazy::Lazy;
use std::any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// A stable identifier for an injectable type.
///
/// Two `TypeId`s are equal iff they name the same annotated type. The ordering
/// is total and stable within a process run (assignment order).
///
/// # Example
/// ```
/// use bindery::TypeId;
///
/// struct Database;
///
/// let a = TypeId::of::<Database>();
/// let b = TypeId::of::<Database>();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Get (or assign) the identifier for a type.
    ///
    /// Works for unsized types too, so `TypeId::of::<dyn Service>()` names the
    /// trait object itself, distinct from any implementation's identifier.
    pub fn of<T: ?Sized + 'static>() -> Self {
        REGISTRY.intern(any::TypeId::of::<T>(), any::type_name::<T>())
    }

    /// The Rust type name this identifier was registered with
    pub fn name(self) -> &'static str {
        REGISTRY
            .names
            .get(&self)
            .map(|entry| *entry.value())
            .unwrap_or("<unregistered>")
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Marker pairing a type with an annotation, so the same underlying type can
/// be bound more than once under distinct identifiers.
///
/// # Example
/// ```
/// use bindery::{Annotated, TypeId};
///
/// struct Primary;
/// struct Replica;
/// struct Database;
///
/// let primary = TypeId::of::<Annotated<Primary, Database>>();
/// let replica = TypeId::of::<Annotated<Replica, Database>>();
/// assert_ne!(primary, replica);
/// ```
pub struct Annotated<A, T: ?Sized> {
    _annotation: PhantomData<A>,
    _inner: PhantomData<T>,
}

/// TypeId → identifier intern table, written once per distinct type.
struct TypeRegistry {
    ids: DashMap<any::TypeId, TypeId>,
    names: DashMap<TypeId, &'static str>,
    next_id: AtomicU32,
}

impl TypeRegistry {
    fn new() -> Self {
        Self {
            ids: DashMap::new(),
            names: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    fn intern(&self, key: any::TypeId, name: &'static str) -> TypeId {
        if let Some(existing) = self.ids.get(&key) {
            return *existing;
        }
        let id = *self
            .ids
            .entry(key)
            .or_insert_with(|| TypeId(self.next_id.fetch_add(1, Ordering::Relaxed)));
        self.names.entry(id).or_insert(name);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;
    struct Bar;
    trait Service: Send + Sync {}

    #[test]
    fn test_same_type_same_id() {
        assert_eq!(TypeId::of::<Foo>(), TypeId::of::<Foo>());
    }

    #[test]
    fn test_distinct_types_distinct_ids() {
        assert_ne!(TypeId::of::<Foo>(), TypeId::of::<Bar>());
    }

    #[test]
    fn test_trait_object_id_differs_from_impl() {
        assert_ne!(TypeId::of::<dyn Service>(), TypeId::of::<Foo>());
    }

    #[test]
    fn test_annotation_distinguishes() {
        struct Primary;
        assert_ne!(
            TypeId::of::<Annotated<Primary, Foo>>(),
            TypeId::of::<Foo>()
        );
    }

    #[test]
    fn test_ordering_is_total() {
        let a = TypeId::of::<Foo>();
        let b = TypeId::of::<Bar>();
        assert!(a < b || b < a);
    }

    #[test]
    fn test_name_resolves() {
        assert!(TypeId::of::<Foo>().name().contains("Foo"));
    }
}

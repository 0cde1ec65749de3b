//! Immutable normalized component storage consumed by the injector.

use crate::component::{
    AllocRequirement, Component, ConstructBinding, Instance, MultibindingData, VectorCreateFn,
};
use crate::error::Result;
use crate::normalize;
use crate::registry::TypeId;
use std::collections::HashMap;

/// A fully-resolved binding: either an existing object or a constructor.
#[derive(Debug, Clone)]
pub enum NormalizedBinding {
    Instance(Instance),
    ToConstruct(ConstructBinding),
}

impl NormalizedBinding {
    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Instance(_))
    }

    /// Dependency list; empty for instance bindings
    pub fn deps(&self) -> &[TypeId] {
        match self {
            Self::Instance(_) => &[],
            Self::ToConstruct(binding) => &binding.deps,
        }
    }

    /// Whether two bindings are interchangeable: same object address, or same
    /// create thunk.
    pub fn equivalent(&self, other: &NormalizedBinding) -> bool {
        match (self, other) {
            (Self::Instance(a), Self::Instance(b)) => a.same_object(b),
            (Self::ToConstruct(a), Self::ToConstruct(b)) => a.create as usize == b.create as usize,
            _ => false,
        }
    }
}

/// All multibindings collected for one type, in arrival order.
#[derive(Clone)]
pub struct NormalizedMultibindingSet {
    pub(crate) elems: Vec<MultibindingData>,
    pub(crate) create_vector: VectorCreateFn,
}

impl std::fmt::Debug for NormalizedMultibindingSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedMultibindingSet")
            .field("elems", &self.elems)
            .finish_non_exhaustive()
    }
}

impl NormalizedMultibindingSet {
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

/// Sizing contract for the injector's per-object allocation buffer.
///
/// Accumulates worst-case bytes (size plus alignment slack) per object to
/// construct. An upper bound when compressions were later undone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorSizing {
    pub total_bytes: usize,
    pub object_count: usize,
}

impl AllocatorSizing {
    pub(crate) fn add(&mut self, requirement: AllocRequirement) {
        if requirement.size == 0 {
            return;
        }
        self.total_bytes += requirement.size + requirement.align - 1;
        self.object_count += 1;
    }

    pub fn combined(self, other: AllocatorSizing) -> AllocatorSizing {
        AllocatorSizing {
            total_bytes: self.total_bytes + other.total_bytes,
            object_count: self.object_count + other.object_count,
        }
    }
}

/// The bindings removed by one compression, kept so it can be reversed.
#[derive(Debug, Clone)]
pub struct CompressionUndoInfo {
    pub(crate) interface_id: TypeId,
    pub(crate) interface_binding: NormalizedBinding,
    pub(crate) impl_binding: NormalizedBinding,
}

/// Whether the compressor records undo information.
///
/// Permanent compression is cheaper; use undoable when the storage will serve
/// as the base for overlay components that may need compressed types back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Permanent,
    Undoable,
}

/// The immutable output of binding normalization: the binding table, the
/// multibinding sets, allocator sizing, and (in undoable mode) the
/// compression undo records.
///
/// # Example
/// ```
/// use bindery::{Component, CompressionMode, NormalizedComponentStorage};
///
/// let storage = NormalizedComponentStorage::new(
///     Component::new(),
///     &[],
///     CompressionMode::Permanent,
/// )
/// .unwrap();
/// assert_eq!(storage.binding_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct NormalizedComponentStorage {
    bindings: HashMap<TypeId, NormalizedBinding>,
    multibindings: HashMap<TypeId, NormalizedMultibindingSet>,
    allocator_sizing: AllocatorSizing,
    compression_undo: HashMap<TypeId, CompressionUndoInfo>,
}

impl NormalizedComponentStorage {
    /// Normalize a component into immutable storage.
    ///
    /// `exposed_types` are the injection roots: each must end up bound, and
    /// none is ever compressed away.
    pub fn new(
        component: Component,
        exposed_types: &[TypeId],
        mode: CompressionMode,
    ) -> Result<Self> {
        normalize::normalize(component, exposed_types, mode)
    }

    /// Look up the binding for a type, O(1) average
    pub fn binding(&self, type_id: TypeId) -> Option<&NormalizedBinding> {
        self.bindings.get(&type_id)
    }

    /// Look up the multibinding set for a type
    pub fn multibinding_set(&self, type_id: TypeId) -> Option<&NormalizedMultibindingSet> {
        self.multibindings.get(&type_id)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.multibindings.is_empty()
    }

    /// All bound type identifiers, sorted
    pub fn binding_type_ids(&self) -> Vec<TypeId> {
        let mut ids: Vec<TypeId> = self.bindings.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn allocator_sizing(&self) -> AllocatorSizing {
        self.allocator_sizing
    }

    /// Whether a compression involving `impl_id` was recorded for undo
    pub fn has_compression_undo_for(&self, impl_id: TypeId) -> bool {
        self.compression_undo.contains_key(&impl_id)
    }

    pub(crate) fn compression_undo_info(&self, impl_id: TypeId) -> Option<&CompressionUndoInfo> {
        self.compression_undo.get(&impl_id)
    }

    pub(crate) fn from_parts(
        bindings: HashMap<TypeId, NormalizedBinding>,
        multibindings: HashMap<TypeId, NormalizedMultibindingSet>,
        compression_undo: HashMap<TypeId, CompressionUndoInfo>,
    ) -> Self {
        let mut allocator_sizing = AllocatorSizing::default();
        for binding in bindings.values() {
            if let NormalizedBinding::ToConstruct(binding) = binding {
                allocator_sizing.add(binding.alloc);
            }
        }
        for set in multibindings.values() {
            for elem in &set.elems {
                if let MultibindingData::ToConstruct(binding) = elem {
                    allocator_sizing.add(binding.alloc);
                }
            }
        }
        Self {
            bindings,
            multibindings,
            allocator_sizing,
            compression_undo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::AllocRequirement;

    #[test]
    fn test_empty_component_normalizes_to_empty_storage() {
        let storage =
            NormalizedComponentStorage::new(Component::new(), &[], CompressionMode::Permanent)
                .unwrap();
        assert!(storage.is_empty());
        assert_eq!(storage.allocator_sizing(), AllocatorSizing::default());
    }

    #[test]
    fn test_allocator_sizing_accumulates_with_alignment_slack() {
        let mut sizing = AllocatorSizing::default();
        sizing.add(AllocRequirement { size: 16, align: 8 });
        sizing.add(AllocRequirement { size: 4, align: 4 });
        assert_eq!(sizing.object_count, 2);
        assert_eq!(sizing.total_bytes, 16 + 7 + 4 + 3);
    }

    #[test]
    fn test_allocator_sizing_skips_forwarding_bindings() {
        let mut sizing = AllocatorSizing::default();
        sizing.add(AllocRequirement::none());
        assert_eq!(sizing, AllocatorSizing::default());
    }
}

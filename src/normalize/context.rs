use crate::component::{Component, LazyComponent, MultibindingData, StorageEntry, VectorCreateFn};
use crate::registry::TypeId;
use crate::storage::{NormalizedBinding, NormalizedComponentStorage};
use std::collections::{HashMap, HashSet};

/// Lookup into a pre-normalized base component, used when overlaying new
/// entries onto an existing storage.
pub(crate) trait BaseLookup {
    fn find_binding(&self, type_id: TypeId) -> Option<&NormalizedBinding>;
}

/// Base lookup for a standalone normalization.
pub(crate) struct NoBase;

impl BaseLookup for NoBase {
    fn find_binding(&self, _type_id: TypeId) -> Option<&NormalizedBinding> {
        None
    }
}

impl BaseLookup for NormalizedComponentStorage {
    fn find_binding(&self, type_id: TypeId) -> Option<&NormalizedBinding> {
        self.binding(type_id)
    }
}

/// One collected multibinding element paired with its vector creator.
pub(crate) type MultibindingVectorElem = (TypeId, MultibindingData, VectorCreateFn);

/// Mutable working state threaded through every expansion handler.
pub(crate) struct NormalizationContext<'a> {
    /// Remaining entries, reversed; popping yields declaration order.
    pub to_process: Vec<StorageEntry>,

    /// Working map that becomes the final binding table.
    pub binding_data_map: HashMap<TypeId, NormalizedBinding>,

    /// Lazy components whose expansion has completed.
    pub fully_expanded: HashSet<LazyComponent>,

    /// Lazy components whose end marker has not yet been reached.
    pub in_progress: HashSet<LazyComponent>,

    /// Substitution rules, target -> replacement.
    pub replacements: HashMap<LazyComponent, LazyComponent>,

    /// Multibindings in arrival order; duplicates retained.
    pub multibindings_vector: Vec<MultibindingVectorElem>,

    pub base: &'a dyn BaseLookup,
}

impl<'a> NormalizationContext<'a> {
    pub fn new(component: Component, base: &'a dyn BaseLookup) -> Self {
        Self {
            to_process: component.into_reversed_entries(),
            binding_data_map: HashMap::new(),
            fully_expanded: HashSet::new(),
            in_progress: HashSet::new(),
            replacements: HashMap::new(),
            multibindings_vector: Vec::new(),
            base,
        }
    }
}

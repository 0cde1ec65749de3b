use crate::normalize::context::MultibindingVectorElem;
use crate::registry::TypeId;
use crate::storage::NormalizedMultibindingSet;
use std::collections::HashMap;

/// Fold the collected (element, vector creator) pairs into per-type sets.
///
/// Elements keep arrival order and duplicates; vector creators for the same
/// type are equivalent thunks, so the last one wins.
pub(crate) fn add_multibindings(
    multibindings: &mut HashMap<TypeId, NormalizedMultibindingSet>,
    multibindings_vector: Vec<MultibindingVectorElem>,
) {
    use std::collections::hash_map::Entry;

    for (type_id, data, create_vector) in multibindings_vector {
        match multibindings.entry(type_id) {
            Entry::Occupied(mut existing) => {
                let set = existing.get_mut();
                set.elems.push(data);
                set.create_vector = create_vector;
            }
            Entry::Vacant(slot) => {
                slot.insert(NormalizedMultibindingSet {
                    elems: vec![data],
                    create_vector,
                });
            }
        }
    }
}

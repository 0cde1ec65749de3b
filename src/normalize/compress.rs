//! Binding compression: rewriting `I -> C` plus `C -> f(deps)` into a single
//! `I -> f(deps)` binding, eliminating the intermediate object, and undoing
//! that rewrite when a later overlay needs the intermediate type back.

use crate::component::{ConstructBinding, CreateFn, MultibindingData};
use crate::error::{BinderyError, Result};
use crate::normalize::context::MultibindingVectorElem;
use crate::registry::TypeId;
use crate::storage::{CompressionUndoInfo, NormalizedBinding, NormalizedComponentStorage};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// A compression hint collected during expansion, keyed by the concrete type.
pub(crate) struct CompressionCandidate {
    pub interface_id: TypeId,
    pub create: CreateFn,
}

/// Apply every compression the veto rules allow, rewriting the binding map in
/// place. `save_undo` is called with `(concrete_type, undo_info)` for each
/// rewrite so undoable normalization can reverse it later.
pub(crate) fn perform_binding_compression(
    binding_data_map: &mut HashMap<TypeId, NormalizedBinding>,
    mut candidates: HashMap<TypeId, CompressionCandidate>,
    multibindings_vector: &[MultibindingVectorElem],
    exposed_types: &HashSet<TypeId>,
    mut save_undo: impl FnMut(TypeId, CompressionUndoInfo),
) {
    // The user explicitly requested exposed types; they must stay addressable.
    candidates.retain(|impl_id, _| {
        let exposed = exposed_types.contains(impl_id);
        if exposed {
            trace!(type_id = %impl_id, "compression vetoed: exposed root");
        }
        !exposed
    });

    // Any binding other than the interface's own forwarder depending on the
    // concrete type keeps it alive.
    let mut vetoed: Vec<TypeId> = Vec::new();
    for (type_id, binding) in binding_data_map.iter() {
        for dep in binding.deps() {
            if let Some(candidate) = candidates.get(dep) {
                if candidate.interface_id != *type_id {
                    trace!(type_id = %dep, dependent = %type_id, "compression vetoed: external dependency");
                    vetoed.push(*dep);
                }
            }
        }
    }

    // Multibinding sets and their elements' dependencies also pin the type.
    for (type_id, data, _) in multibindings_vector {
        if candidates.contains_key(type_id) {
            vetoed.push(*type_id);
        }
        if let MultibindingData::ToConstruct(binding) = data {
            for dep in binding.deps.iter() {
                if candidates.contains_key(dep) {
                    vetoed.push(*dep);
                }
            }
        }
    }
    for type_id in vetoed {
        candidates.remove(&type_id);
    }

    for (impl_id, candidate) in candidates {
        let Some(NormalizedBinding::ToConstruct(impl_binding)) =
            binding_data_map.get(&impl_id).cloned()
        else {
            continue;
        };
        let Some(interface_binding) = binding_data_map.get(&candidate.interface_id).cloned()
        else {
            continue;
        };

        save_undo(
            impl_id,
            CompressionUndoInfo {
                interface_id: candidate.interface_id,
                interface_binding,
                impl_binding: NormalizedBinding::ToConstruct(impl_binding.clone()),
            },
        );

        debug!(interface = %candidate.interface_id, concrete = %impl_id, "binding compressed");
        binding_data_map.insert(
            candidate.interface_id,
            NormalizedBinding::ToConstruct(ConstructBinding {
                create: candidate.create,
                deps: impl_binding.deps.clone(),
                alloc: impl_binding.alloc,
            }),
        );
        binding_data_map.remove(&impl_id);
    }
}

/// Restore the original interface and concrete bindings for every compressed
/// type the overlay references, shadowing the base's fused binding.
pub(crate) fn undo_binding_compressions(
    base: &NormalizedComponentStorage,
    referenced: impl IntoIterator<Item = TypeId>,
    bindings: &mut HashMap<TypeId, NormalizedBinding>,
) -> Result<()> {
    for type_id in referenced {
        let Some(undo) = base.compression_undo_info(type_id) else {
            continue;
        };
        debug!(interface = %undo.interface_id, concrete = %type_id, "undoing binding compression");
        restore_binding(bindings, type_id, &undo.impl_binding)?;
        restore_binding(bindings, undo.interface_id, &undo.interface_binding)?;
    }
    Ok(())
}

fn restore_binding(
    bindings: &mut HashMap<TypeId, NormalizedBinding>,
    type_id: TypeId,
    original: &NormalizedBinding,
) -> Result<()> {
    use std::collections::hash_map::Entry;

    match bindings.entry(type_id) {
        Entry::Vacant(slot) => {
            slot.insert(original.clone());
            Ok(())
        }
        // The overlay bound the type itself; identical declarations coexist.
        Entry::Occupied(existing) if existing.get().equivalent(original) => Ok(()),
        Entry::Occupied(_) => Err(BinderyError::multiple_bindings(type_id)),
    }
}

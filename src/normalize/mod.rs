//! Binding normalization: turning a component's deferred entry stream into an
//! immutable, deduplicated, compressed binding table.

mod compress;
mod context;
mod expand;
mod multibinding;

use crate::component::Component;
use crate::error::{BinderyError, Result};
use crate::registry::TypeId;
use crate::storage::{CompressionMode, CompressionUndoInfo, NormalizedComponentStorage};
use compress::CompressionCandidate;
use context::{NoBase, NormalizationContext};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Normalize a standalone component: expand, deduplicate, compress.
pub(crate) fn normalize(
    component: Component,
    exposed_types: &[TypeId],
    mode: CompressionMode,
) -> Result<NormalizedComponentStorage> {
    debug!(entries = component.len(), ?mode, "normalizing component");

    let base = NoBase;
    let mut ctx = NormalizationContext::new(component, &base);
    let mut candidates: HashMap<TypeId, CompressionCandidate> = HashMap::new();
    expand::run(&mut ctx, |interface_id, impl_id, create| {
        candidates.insert(
            impl_id,
            CompressionCandidate {
                interface_id,
                create,
            },
        );
    })?;

    let NormalizationContext {
        mut binding_data_map,
        multibindings_vector,
        ..
    } = ctx;

    let exposed: HashSet<TypeId> = exposed_types.iter().copied().collect();
    let mut undo_map: HashMap<TypeId, CompressionUndoInfo> = HashMap::new();
    match mode {
        CompressionMode::Permanent => compress::perform_binding_compression(
            &mut binding_data_map,
            candidates,
            &multibindings_vector,
            &exposed,
            |_, _| {},
        ),
        CompressionMode::Undoable => compress::perform_binding_compression(
            &mut binding_data_map,
            candidates,
            &multibindings_vector,
            &exposed,
            |impl_id, undo_info| {
                undo_map.insert(impl_id, undo_info);
            },
        ),
    }

    for exposed_type in exposed_types {
        if !binding_data_map.contains_key(exposed_type) {
            return Err(BinderyError::type_not_bound(*exposed_type));
        }
    }

    let mut multibindings = HashMap::new();
    multibinding::add_multibindings(&mut multibindings, multibindings_vector);

    let storage =
        NormalizedComponentStorage::from_parts(binding_data_map, multibindings, undo_map);
    debug!(
        bindings = storage.binding_count(),
        "normalization complete"
    );
    Ok(storage)
}

/// Normalize an overlay component against a pre-normalized base.
///
/// Bindings already present in the base are deduplicated rather than copied;
/// compression hints are ignored (the overlay is not compressed), and base
/// compressions are undone for every concrete type the overlay references.
pub(crate) fn normalize_onto(
    base: &NormalizedComponentStorage,
    component: Component,
    exposed_types: &[TypeId],
) -> Result<NormalizedComponentStorage> {
    debug!(entries = component.len(), "normalizing overlay component");

    let mut ctx = NormalizationContext::new(component, base);
    expand::run(&mut ctx, |_, _, _| {})?;

    let NormalizationContext {
        mut binding_data_map,
        multibindings_vector,
        ..
    } = ctx;

    let mut referenced: Vec<TypeId> = exposed_types.to_vec();
    for binding in binding_data_map.values() {
        referenced.extend(binding.deps().iter().copied());
    }
    for (_, data, _) in &multibindings_vector {
        if let crate::component::MultibindingData::ToConstruct(binding) = data {
            referenced.extend(binding.deps.iter().copied());
        }
    }
    compress::undo_binding_compressions(base, referenced, &mut binding_data_map)?;

    for exposed_type in exposed_types {
        if !binding_data_map.contains_key(exposed_type) && base.binding(*exposed_type).is_none() {
            return Err(BinderyError::type_not_bound(*exposed_type));
        }
    }

    let mut multibindings = HashMap::new();
    multibinding::add_multibindings(&mut multibindings, multibindings_vector);

    Ok(NormalizedComponentStorage::from_parts(
        binding_data_map,
        multibindings,
        HashMap::new(),
    ))
}

//! The expansion engine: drains the entry stream, expanding lazy
//! sub-components, honoring replacements, and deduplicating resolved
//! bindings.

use crate::component::{
    ComponentRef, CreateFn, LazyComponent, MultibindingData, StorageEntry, VectorCreateFn,
};
use crate::error::{BinderyError, Result};
use crate::normalize::context::NormalizationContext;
use crate::registry::TypeId;
use crate::storage::NormalizedBinding;
use tracing::{debug, trace};

/// Drain the context's stream to exhaustion.
///
/// `handle_compressed` receives every compression hint; the caller decides
/// whether hints feed the compressor or are ignored (overlay normalization).
pub(crate) fn run(
    ctx: &mut NormalizationContext<'_>,
    mut handle_compressed: impl FnMut(TypeId, TypeId, CreateFn),
) -> Result<()> {
    while let Some(entry) = ctx.to_process.pop() {
        match entry {
            StorageEntry::ConstructedObject { type_id, instance } => {
                handle_resolved_binding(ctx, type_id, NormalizedBinding::Instance(instance))?;
            }
            StorageEntry::ObjectToConstruct { type_id, binding } => {
                handle_resolved_binding(ctx, type_id, NormalizedBinding::ToConstruct(binding))?;
            }
            StorageEntry::CompressedBinding {
                interface_id,
                impl_id,
                create,
            } => {
                handle_compressed(interface_id, impl_id, create);
            }
            StorageEntry::Multibinding { type_id, data } => {
                let create_vector = pop_vector_creator(ctx, type_id)?;
                ctx.multibindings_vector.push((type_id, data, create_vector));
            }
            StorageEntry::MultibindingVectorCreator {
                type_id,
                create_vector,
            } => {
                let data = pop_multibinding(ctx, type_id)?;
                ctx.multibindings_vector.push((type_id, data, create_vector));
            }
            StorageEntry::LazyComponent(component) => {
                handle_lazy_component(ctx, component)?;
            }
            StorageEntry::EndMarker(component) => {
                trace!(component = ?component, "expansion complete");
                ctx.in_progress.remove(&component);
                ctx.fully_expanded.insert(component);
            }
            StorageEntry::ReplacedLazyComponent {
                target,
                replacement,
            } => {
                handle_replacement_rule(ctx, target, replacement)?;
            }
        }
    }
    debug_assert!(ctx.in_progress.is_empty(), "unbalanced end markers");
    Ok(())
}

/// Insert a resolved binding, treating identical re-declarations as
/// idempotent and divergent ones as conflicts. Bindings already present in
/// the base component are checked but not re-inserted.
fn handle_resolved_binding(
    ctx: &mut NormalizationContext<'_>,
    type_id: TypeId,
    binding: NormalizedBinding,
) -> Result<()> {
    use std::collections::hash_map::Entry;

    match ctx.binding_data_map.entry(type_id) {
        Entry::Occupied(existing) => {
            if !existing.get().equivalent(&binding) {
                return Err(BinderyError::multiple_bindings(type_id));
            }
            trace!(type_id = %type_id, "duplicate binding ignored");
        }
        Entry::Vacant(slot) => match ctx.base.find_binding(type_id) {
            Some(base_binding) => {
                if !base_binding.equivalent(&binding) {
                    return Err(BinderyError::multiple_bindings(type_id));
                }
                trace!(type_id = %type_id, "binding already present in base");
            }
            None => {
                trace!(type_id = %type_id, "binding added");
                slot.insert(binding);
            }
        },
    }
    Ok(())
}

/// Multibindings travel as an adjacent (element, vector creator) pair; either
/// order is accepted.
fn pop_vector_creator(
    ctx: &mut NormalizationContext<'_>,
    expected_type: TypeId,
) -> Result<VectorCreateFn> {
    match ctx.to_process.pop() {
        Some(StorageEntry::MultibindingVectorCreator {
            type_id,
            create_vector,
        }) if type_id == expected_type => Ok(create_vector),
        _ => Err(BinderyError::internal(format!(
            "multibinding for {expected_type} not followed by its vector creator"
        ))),
    }
}

fn pop_multibinding(
    ctx: &mut NormalizationContext<'_>,
    expected_type: TypeId,
) -> Result<MultibindingData> {
    match ctx.to_process.pop() {
        Some(StorageEntry::Multibinding { type_id, data }) if type_id == expected_type => Ok(data),
        _ => Err(BinderyError::internal(format!(
            "multibinding vector creator for {expected_type} not adjacent to its element"
        ))),
    }
}

fn handle_lazy_component(
    ctx: &mut NormalizationContext<'_>,
    component: LazyComponent,
) -> Result<()> {
    let mut component = component;

    // Follow the replacement chain to its fixed point. The mapping stays
    // registered so later installations of the target keep landing on the
    // replacement.
    let mut chain = vec![component.clone()];
    loop {
        if ctx.fully_expanded.contains(&component) {
            trace!(component = ?component, "already fully expanded, skipping");
            return Ok(());
        }
        match ctx.replacements.get(&component) {
            Some(replacement) => {
                if chain.contains(replacement) {
                    chain.push(replacement.clone());
                    let path = chain.iter().map(ComponentRef::from).collect();
                    return Err(BinderyError::installation_loop(path));
                }
                debug!(replaced = ?component, replacement = ?replacement, "applying component replacement");
                component = replacement.clone();
                chain.push(component.clone());
            }
            None => break,
        }
    }

    if ctx.in_progress.contains(&component) {
        return Err(installation_loop_error(ctx, &component));
    }

    trace!(component = ?component, "expanding lazy component");
    ctx.in_progress.insert(component.clone());
    let expanded = component.expand();
    ctx.to_process.push(StorageEntry::EndMarker(component));
    ctx.to_process.append(&mut expanded.into_reversed_entries());
    Ok(())
}

/// Diagnostic path for an installation cycle: the end markers still on the
/// stack, from the repeated component outward, with the repeat appended.
fn installation_loop_error(
    ctx: &NormalizationContext<'_>,
    component: &LazyComponent,
) -> BinderyError {
    let mut path: Vec<ComponentRef> = Vec::new();
    let mut found = false;
    for entry in &ctx.to_process {
        if let StorageEntry::EndMarker(marker) = entry {
            if !found && marker == component {
                found = true;
            }
            if found {
                path.push(marker.into());
            }
        }
    }
    path.push(component.into());
    BinderyError::installation_loop(path)
}

fn handle_replacement_rule(
    ctx: &mut NormalizationContext<'_>,
    target: LazyComponent,
    replacement: LazyComponent,
) -> Result<()> {
    if let Some(existing) = ctx.replacements.get(&target) {
        if *existing == replacement {
            trace!(replaced = ?target, "duplicate replacement ignored");
            return Ok(());
        }
        return Err(BinderyError::incompatible_replacements(
            (&target).into(),
            existing.into(),
            (&replacement).into(),
        ));
    }
    if ctx.fully_expanded.contains(&target) {
        return Err(BinderyError::replacement_after_expansion(
            (&target).into(),
            (&replacement).into(),
        ));
    }
    debug!(replaced = ?target, replacement = ?replacement, "replacement registered");
    ctx.replacements.insert(target, replacement);
    Ok(())
}

use crate::component::ComponentRef;
use crate::registry::TypeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BinderyError>;

/// Errors surfaced by binding normalization and injector lookup.
///
/// Payloads are structured (type identifiers, component identities, cycle
/// paths) so callers and tests can match on them instead of parsing messages.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BinderyError {
    /// Two non-equivalent bindings were declared for the same type.
    #[error("Multiple bindings for type {type_id}")]
    MultipleBindings { type_id: TypeId },

    /// A binding's dependency closure reached itself during construction.
    #[error("Dependency loop while constructing: {}", format_type_path(.path))]
    SelfLoop { path: Vec<TypeId> },

    /// A lazy component (transitively) installs itself.
    #[error("Component installation loop: {}", format_component_path(.path))]
    LazyComponentInstallationLoop { path: Vec<ComponentRef> },

    /// Two distinct replacements were declared for the same component.
    #[error("Incompatible replacements for component {target}")]
    IncompatibleReplacements {
        target: ComponentRef,
        first: ComponentRef,
        second: ComponentRef,
    },

    /// A replacement was declared after its target had already been expanded.
    #[error("Component {target} was already expanded when its replacement was declared")]
    ReplacementAfterExpansion {
        target: ComponentRef,
        replacement: ComponentRef,
    },

    /// No binding exists for the requested type.
    #[error("No binding found for type {type_id}")]
    TypeNotBound { type_id: TypeId },

    /// A stored instance could not be downcast to the requested type.
    #[error("Failed to downcast instance to {type_name}")]
    DowncastFailed { type_name: &'static str },

    /// The entry stream violated its well-formedness contract.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BinderyError {
    /// Create a multiple-bindings conflict error
    pub fn multiple_bindings(type_id: TypeId) -> Self {
        Self::MultipleBindings { type_id }
    }

    /// Create a dependency self-loop error
    pub fn self_loop(path: Vec<TypeId>) -> Self {
        Self::SelfLoop { path }
    }

    /// Create an installation-loop error
    pub fn installation_loop(path: Vec<ComponentRef>) -> Self {
        Self::LazyComponentInstallationLoop { path }
    }

    /// Create an incompatible-replacements error
    pub fn incompatible_replacements(
        target: ComponentRef,
        first: ComponentRef,
        second: ComponentRef,
    ) -> Self {
        Self::IncompatibleReplacements {
            target,
            first,
            second,
        }
    }

    /// Create a replacement-after-expansion error
    pub fn replacement_after_expansion(target: ComponentRef, replacement: ComponentRef) -> Self {
        Self::ReplacementAfterExpansion {
            target,
            replacement,
        }
    }

    /// Create a type-not-bound error
    pub fn type_not_bound(type_id: TypeId) -> Self {
        Self::TypeNotBound { type_id }
    }

    /// Create a downcast failure error
    pub fn downcast_failed(type_name: &'static str) -> Self {
        Self::DowncastFailed { type_name }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

fn format_type_path(path: &[TypeId]) -> String {
    path.iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_component_path(path: &[ComponentRef]) -> String {
    path.iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

use crate::component::Component;
use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A sub-component referenced by factory function, expanded on demand.
///
/// Identity drives deduplication: a component taking no arguments is
/// identified by its fn pointer; one taking arguments is identified
/// structurally by `(fn, args)`. A given identity is expanded at most once
/// per normalization.
///
/// # Example
/// ```
/// use bindery::{Component, LazyComponent};
///
/// fn logging_component() -> Component {
///     Component::new()
/// }
///
/// let a = LazyComponent::of(logging_component);
/// let b = LazyComponent::of(logging_component);
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct LazyComponent {
    kind: LazyComponentKind,
}

#[derive(Clone)]
enum LazyComponentKind {
    NoArgs(fn() -> Component),
    WithArgs(Arc<dyn ErasedComponentFn>),
}

impl LazyComponent {
    /// Reference a component factory taking no arguments
    pub fn of(fun: fn() -> Component) -> Self {
        Self {
            kind: LazyComponentKind::NoArgs(fun),
        }
    }

    /// Reference a component factory applied to `args`.
    ///
    /// The argument tuple is heap-held and owned by this value; equality and
    /// hashing are resolved against the owned copy.
    pub fn with_args<A>(fun: fn(A) -> Component, args: A) -> Self
    where
        A: Hash + PartialEq + Clone + Send + Sync + 'static,
    {
        Self {
            kind: LazyComponentKind::WithArgs(Arc::new(ComponentFnWithArgs { fun, args })),
        }
    }

    /// Invoke the factory, producing the component's entries
    pub(crate) fn expand(&self) -> Component {
        match &self.kind {
            LazyComponentKind::NoArgs(fun) => fun(),
            LazyComponentKind::WithArgs(erased) => erased.invoke(),
        }
    }

    fn fn_address(&self) -> usize {
        match &self.kind {
            LazyComponentKind::NoArgs(fun) => *fun as usize,
            LazyComponentKind::WithArgs(erased) => erased.fn_address(),
        }
    }
}

impl PartialEq for LazyComponent {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (LazyComponentKind::NoArgs(a), LazyComponentKind::NoArgs(b)) => {
                *a as usize == *b as usize
            }
            (LazyComponentKind::WithArgs(a), LazyComponentKind::WithArgs(b)) => {
                a.fn_address() == b.fn_address() && a.args_eq(b.as_ref())
            }
            _ => false,
        }
    }
}

impl Eq for LazyComponent {}

impl Hash for LazyComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.kind {
            LazyComponentKind::NoArgs(fun) => {
                state.write_u8(0);
                (*fun as usize).hash(state);
            }
            LazyComponentKind::WithArgs(erased) => {
                state.write_u8(1);
                erased.fn_address().hash(state);
                erased.args_hash().hash(state);
            }
        }
    }
}

impl fmt::Debug for LazyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LazyComponentKind::NoArgs(_) => {
                write!(f, "LazyComponent({:#x})", self.fn_address())
            }
            LazyComponentKind::WithArgs(_) => {
                write!(f, "LazyComponent({:#x}, with args)", self.fn_address())
            }
        }
    }
}

/// Type-erased `(fn, args)` pair behind a lazy component with arguments.
pub(crate) trait ErasedComponentFn: Send + Sync {
    fn invoke(&self) -> Component;
    fn fn_address(&self) -> usize;
    fn args_hash(&self) -> u64;
    fn args_eq(&self, other: &dyn ErasedComponentFn) -> bool;
    fn as_any(&self) -> &dyn Any;
}

struct ComponentFnWithArgs<A> {
    fun: fn(A) -> Component,
    args: A,
}

impl<A> ErasedComponentFn for ComponentFnWithArgs<A>
where
    A: Hash + PartialEq + Clone + Send + Sync + 'static,
{
    fn invoke(&self) -> Component {
        (self.fun)(self.args.clone())
    }

    fn fn_address(&self) -> usize {
        self.fun as usize
    }

    fn args_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.args.hash(&mut hasher);
        hasher.finish()
    }

    fn args_eq(&self, other: &dyn ErasedComponentFn) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|other| self.args == other.args)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opaque component identity carried in error payloads.
#[derive(Clone, PartialEq, Eq)]
pub struct ComponentRef(LazyComponent);

impl ComponentRef {
    /// Identity of a no-args component factory
    pub fn of(fun: fn() -> Component) -> Self {
        Self(LazyComponent::of(fun))
    }

    /// Identity of a component factory applied to `args`
    pub fn with_args<A>(fun: fn(A) -> Component, args: A) -> Self
    where
        A: Hash + PartialEq + Clone + Send + Sync + 'static,
    {
        Self(LazyComponent::with_args(fun, args))
    }
}

impl From<&LazyComponent> for ComponentRef {
    fn from(component: &LazyComponent) -> Self {
        Self(component.clone())
    }
}

impl From<LazyComponent> for ComponentRef {
    fn from(component: LazyComponent) -> Self {
        Self(component)
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.kind {
            LazyComponentKind::NoArgs(_) => write!(f, "component fn {:#x}", self.0.fn_address()),
            LazyComponentKind::WithArgs(_) => {
                write!(f, "component fn {:#x} (with args)", self.0.fn_address())
            }
        }
    }
}

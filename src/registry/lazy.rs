use std::cell::UnsafeCell;
use std::sync::Once;

/// A thread-safe lazily initialized cell, used for the global type registry.
pub(crate) struct Lazy<T> {
    init: Once,
    value: UnsafeCell<Option<T>>,
    factory: fn() -> T,
}

// Safety: initialization is guarded by `init`; the factory is a plain fn pointer.
unsafe impl<T: Sync> Sync for Lazy<T> {}
unsafe impl<T: Send> Send for Lazy<T> {}

impl<T> Lazy<T> {
    /// Create a new lazy value
    pub(crate) const fn new(factory: fn() -> T) -> Self {
        Self {
            init: Once::new(),
            value: UnsafeCell::new(None),
            factory,
        }
    }

    /// Get the value, initializing it if necessary
    pub(crate) fn get(&self) -> &T {
        self.init.call_once(|| {
            let value = (self.factory)();
            // SAFETY: this block is executed only once, before any read.
            unsafe {
                *self.value.get() = Some(value);
            }
        });

        // SAFETY: self.init ensures the value is initialized and visible.
        unsafe { (*self.value.get()).as_ref().unwrap() }
    }
}

impl<T> std::ops::Deref for Lazy<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CELL: Lazy<Vec<u32>> = Lazy::new(|| vec![1, 2, 3]);

    #[test]
    fn test_initializes_once() {
        assert_eq!(CELL.get().len(), 3);
        assert_eq!(CELL[0], 1);
    }
}

//! Viewport-wide pointer listener registry.
//!
//! A drag that starts on the comparison surface must keep tracking when the
//! pointer leaves it, so move/release handling is widened to the whole
//! viewport for the duration of the drag. That registration is a
//! [`ListenerGuard`]: acquired on press and released when dropped, so every
//! exit path (release, comparator teardown mid-drag, panic unwind) detaches.
//!
//! The host (the viewer window) consults [`ListenerSet::is_tracking`] to decide
//! whether to forward pointer positions from outside the surface.

use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

/// Shared count of attached viewport listeners.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Debug, Default)]
pub struct ListenerSet {
    attached: Rc<Cell<usize>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach move/release listeners until the returned guard is dropped.
    pub fn attach(&self) -> ListenerGuard {
        let n = self.attached.get() + 1;
        self.attached.set(n);
        trace!("viewport listeners attached ({n})");
        ListenerGuard {
            attached: Rc::clone(&self.attached),
        }
    }

    /// Number of live guards.
    pub fn attached(&self) -> usize {
        self.attached.get()
    }

    /// True while any drag holds the viewport.
    pub fn is_tracking(&self) -> bool {
        self.attached.get() > 0
    }
}

/// Detaches its listeners on drop.
#[derive(Debug)]
#[must_use = "listeners detach as soon as the guard is dropped"]
pub struct ListenerGuard {
    attached: Rc<Cell<usize>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let n = self.attached.get().saturating_sub(1);
        self.attached.set(n);
        trace!("viewport listeners detached ({n})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_detaches_on_drop() {
        let set = ListenerSet::new();
        assert!(!set.is_tracking());
        {
            let _g = set.attach();
            assert_eq!(set.attached(), 1);
            assert!(set.clone().is_tracking());
        }
        assert_eq!(set.attached(), 0);
    }
}

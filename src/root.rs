use std::cell::UnsafeCell;
use std::sync::Arc;

use crate::node::Node;
use crate::sync::{Lock, RawLock};

/// The latched slot that owns the root node. It plays the role of the
/// root's parent: every operation enters the tree by latching the slot,
/// latching the root node, and releasing the slot — the same hand-over-hand
/// step used at every level below. Replacing the root (insert into an empty
/// tree, deleting the last node, promoting a child over a deleted root)
/// happens only while the slot latch is held, which is what serializes
/// root replacement against a concurrent second root-level operation.
pub(crate) struct RootSlot<K> {
    latch: Lock,
    slot: UnsafeCell<Option<Arc<Node<K>>>>,
}

// `slot` is only ever accessed through a `RootGuard`, which holds `latch`,
// or through `&mut self` during teardown.
unsafe impl<K: Send> Send for RootSlot<K> {}
unsafe impl<K: Send> Sync for RootSlot<K> {}

impl<K> RootSlot<K> {
    pub fn new(root: Option<Arc<Node<K>>>) -> Self {
        RootSlot {
            latch: Lock::new(),
            slot: UnsafeCell::new(root),
        }
    }

    pub fn lock(&self) -> RootGuard<'_, K> {
        self.latch.acquire();
        RootGuard { slot: self }
    }

    /// Takes the root without touching the latch. `&mut self` is the proof
    /// that no concurrent operation is in flight (teardown).
    pub fn take_root_mut(&mut self) -> Option<Arc<Node<K>>> {
        self.slot.get_mut().take()
    }
}

pub(crate) struct RootGuard<'a, K> {
    slot: &'a RootSlot<K>,
}

impl<K> RootGuard<'_, K> {
    pub fn get(&self) -> Option<&Arc<Node<K>>> {
        // Safety: the slot latch is held for as long as this guard lives.
        unsafe { (*self.slot.slot.get()).as_ref() }
    }

    pub fn slot_mut(&mut self) -> &mut Option<Arc<Node<K>>> {
        // Safety: as above, and `&mut self` keeps this the only live
        // reference handed out through the guard.
        unsafe { &mut *self.slot.slot.get() }
    }
}

impl<K> Drop for RootGuard<'_, K> {
    fn drop(&mut self) {
        self.slot.latch.release();
    }
}

//! Lock-coupling cursors.
//!
//! A cursor bundles the latch guard(s) a walk currently holds with its
//! logical position, so releasing the wrong latch — or forgetting one on an
//! exit path — is not expressible. Advancing always latches the child
//! before anything above it is released, so at every instant at least one
//! latch on the path from the root to the cursor is held.

use std::mem;
use std::sync::Arc;

use crate::node::{LockedNode, Node, Side};
use crate::root::RootGuard;

/// A walk position holding exactly one latch: the current node's. Used by
/// search, minimum-find, and insertion, which never unlink nodes and so
/// never need the link above the current node.
pub(crate) struct Cursor<K> {
    current: LockedNode<K>,
}

impl<K> Cursor<K> {
    pub fn start(root: LockedNode<K>) -> Self {
        Cursor { current: root }
    }

    pub fn node(&self) -> &LockedNode<K> {
        &self.current
    }

    pub fn node_mut(&mut self) -> &mut LockedNode<K> {
        &mut self.current
    }

    /// Hand-over-hand step: latch the child on `side`, then release the
    /// current node. Returns `false` with the cursor unmoved if the slot is
    /// empty — the caller branches on that while still covered by the
    /// current node's latch, which is what lets insertion attach a leaf and
    /// search conclude "absent" without a protection gap.
    pub fn advance(&mut self, side: Side) -> bool {
        let Some(child) = self.current.child(side) else {
            return false;
        };
        let child = LockedNode::acquire(child);
        // the previous guard drops here, after the child latch is held
        self.current = child;
        true
    }

    pub fn into_node(self) -> LockedNode<K> {
        self.current
    }
}

/// The latched link a removal holds above its current node: either the
/// tree's root slot or a parent node plus the side the current node hangs
/// off. Whichever it is, it owns the child slot that points at the current
/// node, and unlinking rewrites exactly that slot.
pub(crate) enum ParentLink<'a, K> {
    Slot(RootGuard<'a, K>),
    Node(LockedNode<K>, Side),
}

impl<K> ParentLink<'_, K> {
    pub fn slot_mut(&mut self) -> &mut Option<Arc<Node<K>>> {
        match self {
            ParentLink::Slot(guard) => guard.slot_mut(),
            ParentLink::Node(parent, side) => parent.body_mut().child_mut(*side),
        }
    }
}

/// A removal walk position: the current node's latch plus the latched link
/// above it, retained until the walk knows whether the current node is the
/// one being unlinked.
pub(crate) struct CoupledCursor<'a, K> {
    parent: ParentLink<'a, K>,
    current: LockedNode<K>,
}

impl<'a, K> CoupledCursor<'a, K> {
    pub fn start(root_slot: RootGuard<'a, K>, root: LockedNode<K>) -> Self {
        CoupledCursor {
            parent: ParentLink::Slot(root_slot),
            current: root,
        }
    }

    pub fn node(&self) -> &LockedNode<K> {
        &self.current
    }

    /// Hand-over-hand step retaining the new parent: latch the child, make
    /// the current node the parent link, and only then release the previous
    /// parent. Three latches are held for the instant of the hand-over;
    /// acquisition order stays strictly top-down.
    pub fn advance(&mut self, side: Side) -> bool {
        let Some(child) = self.current.child(side) else {
            return false;
        };
        let child = LockedNode::acquire(child);
        let prev = mem::replace(&mut self.current, child);
        // the previous parent latch is released by this assignment
        self.parent = ParentLink::Node(prev, side);
        true
    }

    pub fn into_parts(self) -> (ParentLink<'a, K>, LockedNode<K>) {
        (self.parent, self.current)
    }
}

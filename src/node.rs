use std::cell::UnsafeCell;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use crate::sync::{Lock, RawLock};

/// Which child slot of a node a walk descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// One tree position: a latch and the latch-protected body. The latch is
/// created with the node and destroyed with it; because every guard holds a
/// strong reference (see [`LockedNode`]), the node cannot be freed while any
/// thread still holds or could release its latch.
pub(crate) struct Node<K> {
    latch: Lock,
    body: UnsafeCell<NodeBody<K>>,
}

// `body` is only ever accessed through a `LockedNode`, which holds `latch`.
unsafe impl<K: Send> Send for Node<K> {}
unsafe impl<K: Send> Sync for Node<K> {}

pub(crate) struct NodeBody<K> {
    pub key: K,
    pub left: Option<Arc<Node<K>>>,
    pub right: Option<Arc<Node<K>>>,
}

impl<K> NodeBody<K> {
    pub fn child(&self, side: Side) -> &Option<Arc<Node<K>>> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn child_mut(&mut self, side: Side) -> &mut Option<Arc<Node<K>>> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

impl<K> Node<K> {
    pub fn new(key: K) -> Arc<Self> {
        Arc::new(Node {
            latch: Lock::new(),
            body: UnsafeCell::new(NodeBody {
                key,
                left: None,
                right: None,
            }),
        })
    }

    fn into_body(self) -> NodeBody<K> {
        self.body.into_inner()
    }

    /// Dismantles a node that nothing else references anymore, handing its
    /// body back so the caller can keep unlinking children iteratively.
    /// Only valid once the tree is quiescent (teardown).
    pub fn unwrap_body(this: Arc<Self>) -> NodeBody<K> {
        match Arc::try_unwrap(this) {
            Ok(node) => node.into_body(),
            Err(_) => unreachable!("tree node still referenced during teardown"),
        }
    }
}

/// An acquired node latch. Holding one is the only way to read or write a
/// node's body, and the guard keeps the node alive for exactly as long as
/// the latch is held, so release-after-free and double-release have no
/// code path that reaches them.
pub(crate) struct LockedNode<K> {
    node: ManuallyDrop<Arc<Node<K>>>,
}

impl<K> LockedNode<K> {
    /// Blocks until the node's latch is held.
    pub fn acquire(node: Arc<Node<K>>) -> Self {
        node.latch.acquire();
        LockedNode {
            node: ManuallyDrop::new(node),
        }
    }

    pub fn body(&self) -> &NodeBody<K> {
        // Safety: the latch is held for as long as this guard lives.
        unsafe { &*self.node.body.get() }
    }

    pub fn body_mut(&mut self) -> &mut NodeBody<K> {
        // Safety: as above, and `&mut self` keeps this the only live
        // reference handed out through the guard.
        unsafe { &mut *self.node.body.get() }
    }

    /// Clones the reference to the child on `side`, if present. The clone is
    /// what a walk latches next; the child itself stays linked under this
    /// node until someone holding this node's latch unlinks it.
    pub fn child(&self, side: Side) -> Option<Arc<Node<K>>> {
        self.body().child(side).clone()
    }

    /// Releases the latch and hands back the guard's node reference.
    fn into_arc(mut self) -> Arc<Node<K>> {
        self.node.latch.release();
        // Safety: `self` is forgotten immediately afterwards, so `drop`
        // cannot run and the arc cannot be taken twice.
        let node = unsafe { ManuallyDrop::take(&mut self.node) };
        std::mem::forget(self);
        node
    }

    /// Takes the key out of a node that has just been unlinked from the
    /// tree. The caller must still hold the latch of the node (or root slot)
    /// that owned the unlinked node's slot: that is what guarantees no other
    /// walk can reach the node, making this guard's reference the last one.
    pub fn into_detached_key(self) -> K {
        match Arc::try_unwrap(self.into_arc()) {
            Ok(node) => node.into_body().key,
            Err(_) => unreachable!("unlinked node still referenced"),
        }
    }
}

impl<K> Drop for LockedNode<K> {
    fn drop(&mut self) {
        self.node.latch.release();
        // Safety: drop runs at most once, and `into_arc` forgets `self`
        // before it could run at all.
        unsafe { ManuallyDrop::drop(&mut self.node) };
    }
}

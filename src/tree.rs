use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt::Debug;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::cursor::{CoupledCursor, Cursor};
use crate::iter::{self, Order};
use crate::node::{LockedNode, Node, Side};
use crate::root::RootSlot;
use crate::search;
use crate::sync::{AtomicUsize, Ordering};

pub trait TreeKey: Ord + Debug + Send + Sync + 'static {}

impl<K: Ord + Debug + Send + Sync + 'static> TreeKey for K {}

/// Concurrent binary search tree synchronized by lock coupling.
///
/// Every operation walks from the root taking one latch per step,
/// acquiring the next node's latch before releasing the current one.
/// Acquisition order is strictly top-down on every path, including the
/// nested successor walk inside two-child removal; that is the
/// deadlock-freedom argument. Keys equal to a node's key descend left, so
/// repeated inserts of the same key accumulate (multiset semantics).
///
/// ```
/// use latchtree::LatchTree;
///
/// let tree = LatchTree::new();
/// tree.insert(3);
/// tree.insert(1);
/// tree.insert(2);
/// assert!(tree.contains(&2));
/// assert_eq!(tree.in_order(), vec![1, 2, 3]);
/// assert_eq!(tree.min(), Some(1));
/// ```
// To test with Miri:
//   MIRIFLAGS=-Zmiri-tree-borrows cargo +nightly miri test
// Run the model-checked tests:
//   cargo test --features=shuttle -- shuttle
pub struct LatchTree<K: TreeKey> {
    root: RootSlot<K>,
    // updated with relaxed atomics after insert/remove, so it's not
    // perfectly consistent mid-flight -- but that lets us avoid holding any
    // latch for the duration of an operation just to count it
    len: AtomicUsize,
}

impl<K: TreeKey> LatchTree<K> {
    pub fn new() -> Self {
        LatchTree {
            root: RootSlot::new(None),
            len: AtomicUsize::new(0),
        }
    }

    /// A tree holding a single key.
    pub fn with_root(key: K) -> Self {
        LatchTree {
            root: RootSlot::new(Some(Node::new(key))),
            len: AtomicUsize::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Latches the root node, releasing the root slot on the way in — the
    /// same hand-over step every walk uses below the root. `None` means the
    /// tree was empty at the instant the slot was held.
    fn lock_root(&self) -> Option<LockedNode<K>> {
        let slot = self.root.lock();
        let root = slot.get()?.clone();
        let root = LockedNode::acquire(root);
        drop(slot);
        Some(root)
    }

    /// Adds `key` to the tree. Equal keys route left, so inserting a key
    /// that is already present grows the tree by one node; nothing is ever
    /// replaced.
    pub fn insert(&self, key: K) {
        debug_println!("top-level insert {:?}", key);

        let mut slot = self.root.lock();
        let Some(root) = slot.get().cloned() else {
            *slot.slot_mut() = Some(Node::new(key));
            self.len.fetch_add(1, Ordering::Relaxed);
            return;
        };
        let root = LockedNode::acquire(root);
        drop(slot);

        let mut cursor = Cursor::start(root);
        loop {
            let side = if key <= cursor.node().body().key {
                Side::Left
            } else {
                Side::Right
            };
            if !cursor.advance(side) {
                // the slot is empty and we still hold the latch of the node
                // that owns it, so attaching here cannot race another writer
                *cursor.node_mut().body_mut().child_mut(side) = Some(Node::new(key));
                self.len.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Whether any node currently holds `key`.
    pub fn contains(&self, key: &K) -> bool {
        let Some(root) = self.lock_root() else {
            return false;
        };
        search::contains_key(root, key)
    }

    /// The smallest key in the tree, or `None` if it is empty.
    pub fn min(&self) -> Option<K>
    where
        K: Clone,
    {
        let root = self.lock_root()?;
        let leftmost = search::leftmost(root);
        let key = leftmost.body().key.clone();
        Some(key)
    }

    /// Removes one node holding `key`. Returns `false`, leaving the tree
    /// untouched, if no node holds it.
    pub fn remove(&self, key: &K) -> bool {
        debug_println!("top-level remove {:?}", key);

        let slot = self.root.lock();
        let Some(root) = slot.get().cloned() else {
            return false;
        };
        let root = LockedNode::acquire(root);
        let mut cursor = CoupledCursor::start(slot, root);

        // locate: couple downward, keeping the link above the current node
        // latched until we know whether the current node is the target
        loop {
            let side = match key.cmp(&cursor.node().body().key) {
                Equal => break,
                Less => Side::Left,
                Greater => Side::Right,
            };
            if !cursor.advance(side) {
                // both held latches drop here
                return false;
            }
        }

        let (mut parent, mut target) = cursor.into_parts();

        // two children: the target is not unlinked at all -- its key is
        // rewritten with the in-order successor's and the successor is
        // unlinked instead. The target node keeps its identity, so its
        // latch stays valid for the rest of the operation and is released
        // last.
        if target.body().left.is_some() && target.body().right.is_some() {
            drop(parent);
            let succ_key = unlink_successor(&mut target);
            target.body_mut().key = succ_key;
            self.len.fetch_sub(1, Ordering::Relaxed);
            return true;
        }

        // zero or one child: unlink the target, splicing its child (if any)
        // into the latched link above it. With the root slot standing in as
        // the root's parent, deleting the root is the same splice.
        let orphan = {
            let body = target.body_mut();
            body.left.take().or_else(|| body.right.take())
        };
        *parent.slot_mut() = orphan;
        drop(parent);
        // last reference: releases the latch, then frees the node
        drop(target);
        self.len.fetch_sub(1, Ordering::Relaxed);
        true
    }

    /// Collects every key in the given visit order. Each key is read under
    /// its node's latch; concurrent mutation elsewhere in the tree may
    /// interleave with the walk.
    pub fn traverse(&self, order: Order) -> Vec<K>
    where
        K: Clone,
    {
        let mut out = Vec::new();
        if let Some(root) = self.lock_root() {
            iter::collect(root, order, &mut out);
        }
        out
    }

    pub fn in_order(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.traverse(Order::In)
    }

    pub fn pre_order(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.traverse(Order::Pre)
    }

    pub fn post_order(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.traverse(Order::Post)
    }

    /// Asserts the ordering invariant over the whole tree: an in-order walk
    /// must be non-decreasing (left subtree keys `<=` node key, right
    /// subtree keys `>=` node key — see `check_subtree` for why the right
    /// bound is not strict). Latches hand-over-hand like any other walk, so
    /// it can run alongside concurrent operations.
    pub fn check_invariants(&self) {
        debug_println!("checking invariants");
        if let Some(root) = self.lock_root() {
            check_subtree(root, None, None);
        }
    }

    /// Removes every node. `&mut self` is the caller's guarantee that no
    /// concurrent operation is in flight, so no latches are taken.
    pub fn clear(&mut self) {
        // dismantle iteratively rather than letting nested child drops
        // recurse down a possibly degenerate spine
        let mut stack: SmallVec<[Arc<Node<K>>; 32]> = SmallVec::new();
        stack.extend(self.root.take_root_mut());
        while let Some(node) = stack.pop() {
            let body = Node::unwrap_body(node);
            stack.extend(body.left);
            stack.extend(body.right);
        }
        *self.len.get_mut() = 0;
    }
}

impl<K: TreeKey> Default for LatchTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TreeKey> Drop for LatchTree<K> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Unlinks the in-order successor (leftmost node of the right subtree) and
/// returns its key. The target's latch is held throughout; the sub-walk
/// couples strictly downward from the right child, retaining only its most
/// recent ancestor, so together with the target at most three latches are
/// held outside a hand-over instant.
fn unlink_successor<K: TreeKey>(target: &mut LockedNode<K>) -> K {
    let Some(right) = target.body().right.clone() else {
        unreachable!("successor walk requires a right subtree");
    };
    let mut succ = LockedNode::acquire(right);
    // `None` while the candidate is still the target's right child, whose
    // slot the target itself owns
    let mut succ_parent: Option<LockedNode<K>> = None;
    while let Some(left) = succ.body().left.clone() {
        let next = LockedNode::acquire(left);
        // the previous sub-walk ancestor is released by this assignment,
        // after the next latch is held
        succ_parent = Some(std::mem::replace(&mut succ, next));
    }

    // the successor has no left child; at most a right child survives it
    let orphan = succ.body_mut().right.take();
    match succ_parent.as_mut() {
        Some(parent) => parent.body_mut().left = orphan,
        None => target.body_mut().right = orphan,
    }
    // the latch above the successor is still held here, so the detached
    // node is unreachable and the key can be moved out of it
    succ.into_detached_key()
}

fn check_subtree<K: TreeKey>(node: LockedNode<K>, lo: Option<&K>, hi: Option<&K>) {
    let body = node.body();
    if let Some(lo) = lo {
        // `>=`, not `>`: successor promotion during a two-child removal can
        // leave a duplicate of a node's key on its right subtree's leftmost
        // edge, and that state is reachable, not corrupt
        assert!(
            body.key >= *lo,
            "right-of-ancestor key {:?} below bound {:?}",
            body.key,
            lo
        );
    }
    if let Some(hi) = hi {
        assert!(
            body.key <= *hi,
            "left-of-ancestor key {:?} above bound {:?}",
            body.key,
            hi
        );
    }
    if let Some(left) = body.left.clone() {
        check_subtree(LockedNode::acquire(left), lo, Some(&body.key));
    }
    if let Some(right) = body.right.clone() {
        check_subtree(LockedNode::acquire(right), Some(&body.key), hi);
    }
}

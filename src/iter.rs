//! Traversals. A node's latch is held from just before it is visited until
//! both child subtrees have been visited, so every key is read under mutual
//! exclusion at the instant of its visit. There is no whole-traversal
//! snapshot guarantee: concurrent mutation in parts of the tree the walk
//! has not latched yet is free to interleave.

use crate::node::LockedNode;

/// Visit orders for [`crate::LatchTree::traverse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    In,
    Pre,
    Post,
}

pub(crate) fn collect<K: Clone>(node: LockedNode<K>, order: Order, out: &mut Vec<K>) {
    let body = node.body();
    if order == Order::Pre {
        out.push(body.key.clone());
    }
    if let Some(left) = body.left.clone() {
        collect(LockedNode::acquire(left), order, out);
    }
    if order == Order::In {
        out.push(body.key.clone());
    }
    if let Some(right) = body.right.clone() {
        collect(LockedNode::acquire(right), order, out);
    }
    if order == Order::Post {
        out.push(body.key.clone());
    }
}

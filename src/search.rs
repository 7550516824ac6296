//! Read-only coupled descents. These never mutate the tree; every latch
//! they take is released by the time they return (by guard drop, on every
//! exit path including "not found").

use std::cmp::Ordering;

use crate::cursor::Cursor;
use crate::node::{LockedNode, Side};
use crate::tree::TreeKey;

/// Coupled descent to `key`. The entry latch (the root's) must already be
/// held; equality anywhere on the path terminates the walk.
pub(crate) fn contains_key<K: TreeKey>(root: LockedNode<K>, key: &K) -> bool {
    let mut cursor = Cursor::start(root);
    loop {
        let side = match key.cmp(&cursor.node().body().key) {
            Ordering::Equal => return true,
            Ordering::Less => Side::Left,
            Ordering::Greater => Side::Right,
        };
        if !cursor.advance(side) {
            return false;
        }
    }
}

/// Coupled descent to the leftmost node, returned with its latch still
/// held so the caller can read the minimum key before releasing.
pub(crate) fn leftmost<K: TreeKey>(root: LockedNode<K>) -> LockedNode<K> {
    let mut cursor = Cursor::start(root);
    while cursor.advance(Side::Left) {}
    cursor.into_node()
}

use core::borrow::Borrow;

use log::trace;

use crate::{
    error::{InvariantViolation, RotationError},
    node::{Entry, NodeId},
    ordered_tree::RawTree,
};

const NIL: NodeId = NodeId::NIL;

/// Color of a node as reported by [`RbTree::color_of`].
///
/// A freshly inserted node starts out [`Red`](Color::Red). The sentinel handle,
/// and any handle that no longer names a node, reads as [`Black`](Color::Black).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// Never the root, and never the parent of another red node
    Red,
    /// Counted towards the black height of every path through it
    Black,
}

/// An ordered key-value container kept balanced by red-black coloring.
///
/// Keys are placed by the same structural insert as
/// [`OrderedTree`](crate::OrderedTree); a fresh node starts red and the
/// insertion fixup then recolors and rotates until:
/// - the root is black,
/// - no red node has a red parent,
/// - every root-to-sentinel path crosses the same number of black nodes.
///
/// Every absent child and the root's parent are the shared sentinel handle,
/// which reads as black and is never written through. Deletion splices in the
/// in-order successor and runs the matching deletion fixup, so the rules above
/// hold after every completed insert or delete.
#[derive(Debug, Clone)]
pub struct RbTree<K, V> {
    raw: RawTree<K, V, Color>,
}

impl<K, V> Default for RbTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RbTree<K, V> {
    /// Creates an empty tree.
    pub const fn new() -> Self {
        Self {
            raw: RawTree::new(),
        }
    }

    /// Creates an empty tree with room for `capacity` nodes before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: RawTree::with_capacity(capacity),
        }
    }

    /// Returns the number of keys stored.
    #[inline]
    pub fn count(&self) -> usize {
        self.raw.count()
    }

    /// Returns `true` if the tree holds no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Number of nodes on the longest root-to-leaf path, `0` when empty.
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the entry with the smallest key.
    pub fn first(&self) -> Option<Entry<'_, K, V>> {
        let min = self.raw.find_minimum(self.raw.root());
        self.raw.get(min).map(Entry::from_node)
    }

    /// Returns the entry with the largest key.
    pub fn last(&self) -> Option<Entry<'_, K, V>> {
        let max = self.raw.find_maximum(self.raw.root());
        self.raw.get(max).map(Entry::from_node)
    }

    /// Calls `callback` for every entry in ascending key order, passing the
    /// entry, its zero-based rank and the tree. The walk holds a shared borrow,
    /// so the tree cannot be mutated from the callback.
    pub fn for_each<F>(&self, mut callback: F)
    where
        F: FnMut(Entry<'_, K, V>, usize, &Self),
    {
        self.raw
            .walk_in_order(|_, node, rank| callback(Entry::from_node(node), rank, self));
    }

    /// The shared sentinel handle standing in for every absent link.
    #[inline]
    pub const fn sentinel(&self) -> NodeId {
        NIL
    }

    /// Handle of the root node, the sentinel when empty.
    #[inline]
    pub const fn root(&self) -> NodeId {
        self.raw.root()
    }

    /// Key stored at `id`, `None` for the sentinel.
    pub fn key_of(&self, id: NodeId) -> Option<&K> {
        self.raw.get(id).map(|node| &node.key)
    }

    /// Value stored at `id`, `None` for the sentinel.
    pub fn value_of(&self, id: NodeId) -> Option<&V> {
        self.raw.get(id).map(|node| &node.value)
    }

    /// Color of `id`; the sentinel is always black.
    #[inline]
    pub fn color_of(&self, id: NodeId) -> Color {
        self.raw.get(id).map_or(Color::Black, |node| node.color)
    }

    /// Parent of `id`; the root's parent is the sentinel.
    pub fn parent_of(&self, id: NodeId) -> NodeId {
        self.raw.get(id).map_or(NIL, |node| node.parent)
    }

    /// Left child of `id`, or the sentinel.
    pub fn left_of(&self, id: NodeId) -> NodeId {
        self.raw.get(id).map_or(NIL, |node| node.left)
    }

    /// Right child of `id`, or the sentinel.
    pub fn right_of(&self, id: NodeId) -> NodeId {
        self.raw.get(id).map_or(NIL, |node| node.right)
    }

    /// Rotates the subtree at `node` to the left, promoting its right child.
    ///
    /// The child's left subtree becomes `node`'s right subtree, the child takes
    /// `node`'s place under its former parent (or as root), and `node` becomes
    /// the child's left child. In-order key order is preserved; coloring is not
    /// touched, so calling this outside the fixups can break the red-black rules.
    ///
    /// # Errors
    ///
    /// [`RotationError::SentinelPivot`] if `node` is the sentinel,
    /// [`RotationError::StaleHandle`] if it names no live slot and
    /// [`RotationError::SentinelChild`] if its right child is the sentinel.
    pub(crate) fn rotate_left(&mut self, node: NodeId) -> Result<(), RotationError> {
        if node == NIL {
            return Err(RotationError::SentinelPivot);
        }
        let Some(pivot) = self.raw.get(node) else {
            return Err(RotationError::StaleHandle);
        };
        let child = pivot.right;
        if child == NIL {
            return Err(RotationError::SentinelChild);
        }

        let inner = self.raw.get_left(child);
        self.raw.set_right(node, inner);
        self.raw.set_parent(inner, node);

        let parent = self.raw.get_parent(node);
        self.raw.set_parent(child, parent);
        self.raw.replace_child(parent, node, child);

        self.raw.set_left(child, node);
        self.raw.set_parent(node, child);

        trace!("rotated left at node {}", node.index());
        Ok(())
    }

    /// Rotates the subtree at `node` to the right, promoting its left child.
    ///
    /// Mirror image of [`rotate_left`](Self::rotate_left).
    ///
    /// # Errors
    ///
    /// [`RotationError::SentinelPivot`] if `node` is the sentinel,
    /// [`RotationError::StaleHandle`] if it names no live slot and
    /// [`RotationError::SentinelChild`] if its left child is the sentinel.
    pub(crate) fn rotate_right(&mut self, node: NodeId) -> Result<(), RotationError> {
        if node == NIL {
            return Err(RotationError::SentinelPivot);
        }
        let Some(pivot) = self.raw.get(node) else {
            return Err(RotationError::StaleHandle);
        };
        let child = pivot.left;
        if child == NIL {
            return Err(RotationError::SentinelChild);
        }

        let inner = self.raw.get_right(child);
        self.raw.set_left(node, inner);
        self.raw.set_parent(inner, node);

        let parent = self.raw.get_parent(node);
        self.raw.set_parent(child, parent);
        self.raw.replace_child(parent, node, child);

        self.raw.set_right(child, node);
        self.raw.set_parent(node, child);

        trace!("rotated right at node {}", node.index());
        Ok(())
    }

    #[inline]
    fn set_color(&mut self, id: NodeId, color: Color) {
        if id != NIL {
            self.raw.node_at_mut(id).color = color;
        }
    }

    #[inline]
    fn is_red(&self, id: NodeId) -> bool {
        self.color_of(id) == Color::Red
    }

    #[inline]
    fn is_black(&self, id: NodeId) -> bool {
        self.color_of(id) == Color::Black
    }

    /// Restores the coloring rules after `node` was hung from the tree red.
    ///
    /// The only rule that can be broken is a red node under a red parent. A red
    /// uncle is resolved by recoloring and moving the conflict up to the
    /// grandparent; a black uncle by at most two rotations, which ends the loop.
    fn fix_insertion_violations(&mut self, mut node: NodeId) -> Result<(), RotationError> {
        while self.is_red(node) && self.is_red(self.raw.get_parent(node)) {
            let parent = self.raw.get_parent(node);
            let grandparent = self.raw.get_parent(parent);
            if grandparent == NIL {
                // red parent is the root; blackening it below settles the conflict
                break;
            }

            if parent == self.raw.get_left(grandparent) {
                let uncle = self.raw.get_right(grandparent);

                if self.is_red(uncle) {
                    trace!("insert fixup: recolor at node {}", grandparent.index());
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    node = grandparent;
                } else {
                    if node == self.raw.get_right(parent) {
                        node = parent;
                        self.rotate_left(node)?;
                    }
                    let parent = self.raw.get_parent(node);
                    let grandparent = self.raw.get_parent(parent);
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.rotate_right(grandparent)?;
                }
            } else {
                let uncle = self.raw.get_left(grandparent);

                if self.is_red(uncle) {
                    trace!("insert fixup: recolor at node {}", grandparent.index());
                    self.set_color(parent, Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    node = grandparent;
                } else {
                    if node == self.raw.get_left(parent) {
                        node = parent;
                        self.rotate_right(node)?;
                    }
                    let parent = self.raw.get_parent(node);
                    let grandparent = self.raw.get_parent(parent);
                    self.set_color(parent, Color::Black);
                    self.set_color(grandparent, Color::Red);
                    self.rotate_left(grandparent)?;
                }
            }
        }

        self.set_color(self.raw.root(), Color::Black);
        Ok(())
    }

    /// Restores black heights after a black node left the position now held by
    /// `node`, whose parent is passed separately since `node` may be the sentinel.
    fn fix_deletion_violations(
        &mut self,
        mut node: NodeId,
        mut parent: NodeId,
    ) -> Result<(), RotationError> {
        while node != self.raw.root() && self.is_black(node) {
            if node == self.raw.get_left(parent) {
                let mut sibling = self.raw.get_right(parent);

                if self.is_red(sibling) {
                    self.set_color(sibling, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_left(parent)?;
                    sibling = self.raw.get_right(parent);
                }

                if self.is_black(self.raw.get_left(sibling))
                    && self.is_black(self.raw.get_right(sibling))
                {
                    trace!("delete fixup: recolor sibling {}", sibling.index());
                    self.set_color(sibling, Color::Red);
                    node = parent;
                    parent = self.raw.get_parent(node);
                } else {
                    if self.is_black(self.raw.get_right(sibling)) {
                        self.set_color(self.raw.get_left(sibling), Color::Black);
                        self.set_color(sibling, Color::Red);
                        self.rotate_right(sibling)?;
                        sibling = self.raw.get_right(parent);
                    }

                    self.set_color(sibling, self.color_of(parent));
                    self.set_color(parent, Color::Black);
                    self.set_color(self.raw.get_right(sibling), Color::Black);
                    self.rotate_left(parent)?;
                    node = self.raw.root();
                }
            } else {
                let mut sibling = self.raw.get_left(parent);

                if self.is_red(sibling) {
                    self.set_color(sibling, Color::Black);
                    self.set_color(parent, Color::Red);
                    self.rotate_right(parent)?;
                    sibling = self.raw.get_left(parent);
                }

                if self.is_black(self.raw.get_right(sibling))
                    && self.is_black(self.raw.get_left(sibling))
                {
                    trace!("delete fixup: recolor sibling {}", sibling.index());
                    self.set_color(sibling, Color::Red);
                    node = parent;
                    parent = self.raw.get_parent(node);
                } else {
                    if self.is_black(self.raw.get_left(sibling)) {
                        self.set_color(self.raw.get_right(sibling), Color::Black);
                        self.set_color(sibling, Color::Red);
                        self.rotate_left(sibling)?;
                        sibling = self.raw.get_left(parent);
                    }

                    self.set_color(sibling, self.color_of(parent));
                    self.set_color(parent, Color::Black);
                    self.set_color(self.raw.get_left(sibling), Color::Black);
                    self.rotate_right(parent)?;
                    node = self.raw.root();
                }
            }
        }

        self.set_color(node, Color::Black);
        Ok(())
    }

    /// Returns the black height of the subtree at `node` (the sentinel counts
    /// as one), or the first broken coloring or link rule below it.
    fn verify_black_height(&self, node: NodeId) -> Result<usize, InvariantViolation> {
        if node == NIL {
            return Ok(1);
        }

        let current = self.raw.node_at(node);
        for child in [current.left, current.right] {
            if child == NIL {
                continue;
            }
            if self.raw.node_at(child).parent != node {
                return Err(InvariantViolation::ParentLink { node: child });
            }
            if current.color == Color::Red && self.is_red(child) {
                return Err(InvariantViolation::RedRed { node });
            }
        }

        let left_height = self.verify_black_height(current.left)?;
        let right_height = self.verify_black_height(current.right)?;
        if left_height != right_height {
            return Err(InvariantViolation::BlackHeight { node });
        }

        Ok(left_height + usize::from(current.color == Color::Black))
    }
}

impl<K: Ord, V> RbTree<K, V> {
    /// Inserts `key` with `value`, overwriting the value if the key is present.
    ///
    /// Only a newly created node triggers rebalancing; an overwrite leaves the
    /// shape and colors alone. Returns the handle of the new or updated node.
    pub fn insert(&mut self, key: K, value: V) -> NodeId {
        let (node, created) = self.raw.insert_internal(key, value, Color::Red);
        if !created {
            return node;
        }

        if let Err(err) = self.fix_insertion_violations(node) {
            unreachable!("insertion fixup hit an invalid rotation: {err}");
        }

        debug_assert!(
            self.check_invariants().is_ok(),
            "red-black invariants violated after insertion"
        );
        node
    }

    /// Removes `key` and returns its value, or `None` (leaving the tree
    /// untouched) if it is absent.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (node, _) = self.raw.find_node_and_parent(key);
        if node == NIL {
            return None;
        }

        let unlinked = self.raw.unlink(node);
        let removed_color = self.color_of(unlinked.moved);
        if unlinked.moved != node {
            self.set_color(unlinked.moved, self.color_of(node));
        }

        if removed_color == Color::Black {
            if let Err(err) = self.fix_deletion_violations(unlinked.child, unlinked.child_parent) {
                unreachable!("deletion fixup hit an invalid rotation: {err}");
            }
        }

        let (_, value) = self.raw.release(node);

        debug_assert!(
            self.check_invariants().is_ok(),
            "red-black invariants violated after removal"
        );
        Some(value)
    }

    /// Returns the value stored for `key`.
    pub fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.lookup(key)
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn lookup_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.lookup_mut(key)
    }

    /// Returns `true` if `key` is stored.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.raw.find_node(key).is_some()
    }

    /// Checks every red-black and search-order rule.
    ///
    /// Returns the tree's black height (counting the sentinel, so an empty tree
    /// has height 1) or the first violation found.
    pub fn check_invariants(&self) -> Result<usize, InvariantViolation> {
        let root = self.raw.root();
        if self.is_red(root) {
            return Err(InvariantViolation::RedRoot);
        }
        if root != NIL && self.raw.node_at(root).parent != NIL {
            return Err(InvariantViolation::ParentLink { node: root });
        }

        let mut out_of_order = None;
        let mut previous: Option<&K> = None;
        self.raw.walk_in_order(|id, node, _| {
            if out_of_order.is_none() && previous.is_some_and(|key| *key >= node.key) {
                out_of_order = Some(id);
            }
            previous = Some(&node.key);
        });
        if let Some(node) = out_of_order {
            return Err(InvariantViolation::KeyOrder { node });
        }

        self.verify_black_height(root)
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RbTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for RbTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{vec, vec::Vec};

    fn collect_keys<K: Clone, V>(tree: &RbTree<K, V>) -> Vec<K> {
        let mut keys = Vec::with_capacity(tree.count());
        tree.for_each(|entry, _, _| keys.push(entry.key.clone()));
        keys
    }

    fn key_at(tree: &RbTree<i32, i32>, id: NodeId) -> Option<i32> {
        tree.key_of(id).copied()
    }

    #[test]
    fn test_rbtree_creation() {
        let tree = RbTree::<i32, i32>::new();
        assert_eq!(tree.count(), 0);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), tree.sentinel());
        assert_eq!(tree.color_of(tree.sentinel()), Color::Black);
        assert_eq!(tree.check_invariants(), Ok(1));
        assert!(tree.first().is_none());
        assert!(tree.last().is_none());
    }

    #[test]
    fn test_rbtree_single_element() {
        let mut tree = RbTree::new();

        let id = tree.insert(42, 420);
        assert_eq!(tree.count(), 1);
        assert_eq!(tree.root(), id);
        assert_eq!(tree.color_of(id), Color::Black);
        assert_eq!(tree.parent_of(id), tree.sentinel());
        assert_eq!(tree.left_of(id), tree.sentinel());
        assert_eq!(tree.right_of(id), tree.sentinel());

        assert_eq!(tree.delete(&42), Some(420));
        assert!(tree.is_empty());
        assert_eq!(tree.root(), tree.sentinel());
    }

    #[test]
    fn test_rbtree_left_rotation_on_ascending_insert() {
        let mut tree = RbTree::new();
        for key in [10, 20, 30] {
            tree.insert(key, key);
        }

        let root = tree.root();
        assert_eq!(key_at(&tree, root), Some(20));
        assert_eq!(tree.color_of(root), Color::Black);

        let left = tree.left_of(root);
        let right = tree.right_of(root);
        assert_eq!(key_at(&tree, left), Some(10));
        assert_eq!(tree.color_of(left), Color::Red);
        assert_eq!(key_at(&tree, right), Some(30));
        assert_eq!(tree.color_of(right), Color::Red);

        assert_eq!(collect_keys(&tree), vec![10, 20, 30]);
    }

    #[test]
    fn test_rbtree_right_rotation_on_descending_insert() {
        let mut tree = RbTree::new();
        for key in [30, 20, 10] {
            tree.insert(key, key);
        }

        let root = tree.root();
        assert_eq!(key_at(&tree, root), Some(20));
        assert_eq!(key_at(&tree, tree.left_of(root)), Some(10));
        assert_eq!(key_at(&tree, tree.right_of(root)), Some(30));
        assert_eq!(tree.color_of(tree.left_of(root)), Color::Red);
    }

    #[test]
    fn test_rbtree_inner_child_double_rotation() {
        let mut tree = RbTree::new();
        for key in [10, 30, 20] {
            tree.insert(key, key);
        }

        let root = tree.root();
        assert_eq!(key_at(&tree, root), Some(20));
        assert_eq!(tree.color_of(root), Color::Black);
        assert_eq!(key_at(&tree, tree.left_of(root)), Some(10));
        assert_eq!(key_at(&tree, tree.right_of(root)), Some(30));
    }

    #[test]
    fn test_rbtree_red_uncle_recolors() {
        let mut tree = RbTree::new();
        for key in [20, 10, 30, 5] {
            tree.insert(key, key);
        }

        let root = tree.root();
        assert_eq!(key_at(&tree, root), Some(20));
        assert_eq!(tree.color_of(tree.left_of(root)), Color::Black);
        assert_eq!(tree.color_of(tree.right_of(root)), Color::Black);

        let five = tree.left_of(tree.left_of(root));
        assert_eq!(key_at(&tree, five), Some(5));
        assert_eq!(tree.color_of(five), Color::Red);
        assert_eq!(tree.check_invariants(), Ok(3));
    }

    #[test]
    fn test_rbtree_overwrite_keeps_shape() {
        let mut tree = RbTree::new();
        for key in [10, 20, 30] {
            tree.insert(key, 0);
        }
        let root = tree.root();

        let id = tree.insert(10, 99);
        assert_eq!(tree.count(), 3);
        assert_eq!(tree.root(), root);
        assert_eq!(tree.value_of(id), Some(&99));
        assert_eq!(tree.color_of(id), Color::Red);
        assert_eq!(tree.lookup(&10), Some(&99));
    }

    #[test]
    fn test_rbtree_rotate_sentinel_errors() {
        let mut tree = RbTree::new();
        let id = tree.insert(1, ());

        assert_eq!(
            tree.rotate_left(tree.sentinel()),
            Err(RotationError::SentinelPivot)
        );
        assert_eq!(
            tree.rotate_right(tree.sentinel()),
            Err(RotationError::SentinelPivot)
        );
        assert_eq!(tree.rotate_left(id), Err(RotationError::SentinelChild));
        assert_eq!(tree.rotate_right(id), Err(RotationError::SentinelChild));
        assert_eq!(tree.root(), id);
    }

    #[test]
    fn test_rbtree_rotation_errors_leave_tree_untouched() {
        let mut tree = RbTree::new();
        for key in [10, 20, 30] {
            tree.insert(key, key);
        }
        let leaf = tree.left_of(tree.root());

        assert_eq!(tree.rotate_left(leaf), Err(RotationError::SentinelChild));
        assert_eq!(
            tree.rotate_right(tree.sentinel()),
            Err(RotationError::SentinelPivot)
        );
        assert_eq!(tree.check_invariants(), Ok(2));
        assert_eq!(collect_keys(&tree), vec![10, 20, 30]);
    }

    #[test]
    fn test_rbtree_rotate_stale_handle() {
        let mut tree = RbTree::new();
        let ids: Vec<NodeId> = [10, 20, 30]
            .iter()
            .map(|key| tree.insert(*key, *key))
            .collect();

        tree.delete(&30);
        tree.delete(&10);
        assert_eq!(tree.count(), 1);

        assert_eq!(tree.rotate_left(ids[2]), Err(RotationError::StaleHandle));
        assert_eq!(tree.rotate_right(ids[2]), Err(RotationError::StaleHandle));
        assert_eq!(key_at(&tree, tree.root()), Some(20));
        assert_eq!(tree.check_invariants(), Ok(2));
    }

    #[test]
    fn test_rbtree_insert_under_red_root() {
        let mut tree = RbTree::new();
        let low = tree.insert(10, 10);
        let high = tree.insert(20, 20);

        // leave 20 as a red root with a red left child
        tree.rotate_left(low).unwrap();
        tree.set_color(low, Color::Red);
        assert_eq!(tree.root(), high);
        assert_eq!(tree.color_of(high), Color::Red);

        let id = tree.insert(30, 30);
        assert_eq!(tree.parent_of(id), high);
        assert_eq!(tree.color_of(high), Color::Black);
        assert_eq!(tree.color_of(low), Color::Red);
        assert_eq!(tree.color_of(id), Color::Red);
        assert_eq!(tree.check_invariants(), Ok(2));
        assert_eq!(collect_keys(&tree), vec![10, 20, 30]);
    }

    #[test]
    fn test_rbtree_rotations_preserve_order() {
        let mut tree = RbTree::new();
        for key in [4, 2, 6, 1, 3, 5, 7] {
            tree.insert(key, key);
        }
        let before = collect_keys(&tree);
        let root = tree.root();
        let old_right = tree.right_of(root);
        let old_inner = tree.left_of(old_right);

        tree.rotate_left(root).unwrap();
        assert_eq!(tree.root(), old_right);
        assert_eq!(tree.left_of(old_right), root);
        assert_eq!(tree.parent_of(root), old_right);
        assert_eq!(tree.right_of(root), old_inner);
        assert_eq!(tree.parent_of(old_inner), root);
        assert_eq!(tree.parent_of(old_right), tree.sentinel());
        assert_eq!(collect_keys(&tree), before);

        tree.rotate_right(old_right).unwrap();
        assert_eq!(tree.root(), root);
        assert_eq!(collect_keys(&tree), before);
        assert_eq!(tree.check_invariants(), Ok(3));
    }

    #[test]
    fn test_rbtree_rotation_on_inner_node_relinks_parent() {
        let mut tree = RbTree::new();
        for key in [4, 2, 6, 1, 3, 5, 7] {
            tree.insert(key, key);
        }
        let root = tree.root();
        let two = tree.left_of(root);
        let three = tree.right_of(two);

        tree.rotate_left(two).unwrap();
        assert_eq!(tree.left_of(root), three);
        assert_eq!(tree.parent_of(three), root);
        assert_eq!(tree.left_of(three), two);
        assert_eq!(collect_keys(&tree), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_rbtree_delete_two_children() {
        let mut tree = RbTree::new();
        for key in [5, 3, 7] {
            tree.insert(key, key * 10);
        }

        assert_eq!(tree.delete(&5), Some(50));

        let root = tree.root();
        assert_eq!(key_at(&tree, root), Some(7));
        assert_eq!(tree.color_of(root), Color::Black);
        assert_eq!(key_at(&tree, tree.left_of(root)), Some(3));
        assert_eq!(tree.right_of(root), tree.sentinel());
        assert_eq!(collect_keys(&tree), vec![3, 7]);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_rbtree_delete_absent() {
        let mut tree = RbTree::new();
        for key in [10, 20, 30] {
            tree.insert(key, key);
        }
        let root = tree.root();

        assert_eq!(tree.delete(&25), None);
        assert_eq!(tree.count(), 3);
        assert_eq!(tree.root(), root);
        assert_eq!(collect_keys(&tree), vec![10, 20, 30]);
    }

    #[test]
    fn test_rbtree_delete_black_leaf_rebalances() {
        let mut tree = RbTree::new();
        for key in 1..=10 {
            tree.insert(key, key);
        }

        for key in [1, 2, 3] {
            assert_eq!(tree.delete(&key), Some(key));
            assert!(tree.check_invariants().is_ok());
        }
        assert_eq!(collect_keys(&tree), (4..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_rbtree_delete_everything() {
        let mut tree = RbTree::new();
        for key in (0..64).map(|i| (i * 11) % 64) {
            tree.insert(key, key);
        }
        for key in (0..64).rev() {
            assert_eq!(tree.delete(&key), Some(key));
            assert!(tree.check_invariants().is_ok());
        }
        assert!(tree.is_empty());
        assert_eq!(tree.root(), tree.sentinel());
    }

    #[test]
    fn test_rbtree_large_dataset_stays_shallow() {
        let mut tree = RbTree::with_capacity(1024);
        for key in 0..1024 {
            tree.insert(key, key);
        }

        assert_eq!(tree.count(), 1024);
        // 2 * log2(n + 1) bound
        assert!(tree.height() <= 21);
        assert!(tree.check_invariants().is_ok());

        for key in (0..1024).step_by(2) {
            tree.delete(&key);
        }
        assert_eq!(tree.count(), 512);
        assert!(tree.check_invariants().is_ok());
        for key in (1..1024).step_by(2) {
            assert_eq!(tree.lookup(&key), Some(&key));
        }
    }

    #[test]
    fn test_rbtree_check_invariants_detects_red_root() {
        let mut tree = RbTree::new();
        let id = tree.insert(1, ());
        tree.set_color(id, Color::Red);

        assert_eq!(tree.check_invariants(), Err(InvariantViolation::RedRoot));
    }

    #[test]
    fn test_rbtree_check_invariants_detects_red_red() {
        let mut tree = RbTree::new();
        for key in [2, 1, 3] {
            tree.insert(key, ());
        }
        let root = tree.root();
        let left = tree.left_of(root);
        tree.rotate_right(root).unwrap();

        // 1 is root now, with 2 and then 3 down its right spine
        tree.set_color(left, Color::Black);
        tree.set_color(root, Color::Red);
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::RedRed { node: root })
        );
    }

    #[test]
    fn test_rbtree_check_invariants_detects_black_height() {
        let mut tree = RbTree::new();
        for key in [2, 1, 3] {
            tree.insert(key, ());
        }
        let root = tree.root();
        tree.set_color(tree.left_of(root), Color::Black);

        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::BlackHeight { node: root })
        );
    }

    #[test]
    fn test_rbtree_first_last_and_lookup_mut() {
        let mut tree: RbTree<i32, i32> = (0..20).map(|key| (key, key)).collect();

        assert_eq!(tree.first().map(|entry| *entry.key), Some(0));
        assert_eq!(tree.last().map(|entry| *entry.key), Some(19));

        if let Some(value) = tree.lookup_mut(&7) {
            *value = -7;
        }
        assert_eq!(tree.lookup(&7), Some(&-7));
        assert!(tree.contains_key(&19));
        assert!(!tree.contains_key(&20));
    }

    #[test]
    fn test_rbtree_for_each_ranks() {
        let tree: RbTree<i32, char> = [(2, 'b'), (3, 'c'), (1, 'a')].into_iter().collect();

        let mut seen = Vec::new();
        tree.for_each(|entry, rank, owner| {
            assert_eq!(owner.count(), 3);
            seen.push((rank, *entry.key, *entry.value));
        });
        assert_eq!(seen, vec![(0, 1, 'a'), (1, 2, 'b'), (2, 3, 'c')]);
    }

    #[test]
    fn test_rbtree_clear_and_reuse() {
        let mut tree = RbTree::new();
        for key in 1..=5 {
            tree.insert(key, ());
        }

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.root(), tree.sentinel());

        tree.insert(42, ());
        assert_eq!(tree.count(), 1);
        assert_eq!(tree.color_of(tree.root()), Color::Black);
    }

    #[test]
    fn test_rbtree_alternating_insert_remove() {
        let mut tree = RbTree::new();

        tree.insert(5, ());
        tree.insert(3, ());
        tree.delete(&5);
        tree.insert(7, ());
        tree.delete(&3);
        tree.insert(1, ());

        assert_eq!(tree.count(), 2);
        assert_eq!(collect_keys(&tree), vec![1, 7]);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn test_rbtree_invariants_stress() {
        let mut tree = RbTree::new();

        let operations = [
            (true, 50),
            (true, 25),
            (true, 75),
            (true, 12),
            (true, 37),
            (false, 25),
            (true, 100),
            (false, 50),
            (true, 1),
            (false, 12),
            (true, 200),
            (true, 150),
            (false, 75),
            (true, 300),
            (false, 1),
        ];

        for (is_insert, key) in operations {
            if is_insert {
                tree.insert(key, key);
            } else {
                assert_eq!(tree.delete(&key), Some(key));
            }
            assert!(tree.check_invariants().is_ok());
        }

        assert_eq!(collect_keys(&tree), vec![37, 100, 150, 200, 300]);
    }
}

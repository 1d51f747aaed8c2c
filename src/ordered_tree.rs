use alloc::vec::Vec;
use core::{borrow::Borrow, cmp::Ordering};

use log::{debug, trace};

use crate::node::{Entry, Node, NodeId};

const NIL: NodeId = NodeId::NIL;

/// Result of splicing a node out of the tree shape.
///
/// The balanced layer uses it to decide whether, and from where, the deletion
/// fixup has to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Unlinked {
    /// Node that left its position: the removed node, or its in-order successor
    pub(crate) moved: NodeId,

    /// Node now sitting where `moved` used to be (nil if none)
    pub(crate) child: NodeId,

    /// Parent of `child` after the splice; tracked separately because the
    /// sentinel carries no parent link
    pub(crate) child_parent: NodeId,
}

/// Arena-backed binary search tree shared by both containers.
///
/// Nodes live densely in `nodes`; links are indices, with [`NodeId::NIL`]
/// standing in for every absent child or parent. Reads through the sentinel
/// yield the sentinel, and writes through it are skipped, so the sentinel is
/// never mutated.
#[derive(Debug, Clone)]
pub(crate) struct RawTree<K, V, C> {
    /// Live nodes; slot indices are the node handles
    nodes: Vec<Node<K, V, C>>,

    /// Index of the root node, nil when the tree is empty
    root: NodeId,
}

impl<K, V, C> RawTree<K, V, C> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NIL,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: NIL,
        }
    }

    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub(crate) const fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
    }

    #[inline]
    pub(crate) fn node_at(&self, id: NodeId) -> &Node<K, V, C> {
        &self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn node_at_mut(&mut self, id: NodeId) -> &mut Node<K, V, C> {
        &mut self.nodes[id.0]
    }

    /// Returns the node behind `id`, or `None` for the sentinel or a stale handle
    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<K, V, C>> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub(crate) fn get_parent(&self, id: NodeId) -> NodeId {
        if id == NIL {
            NIL
        } else {
            self.node_at(id).parent
        }
    }

    #[inline]
    pub(crate) fn get_left(&self, id: NodeId) -> NodeId {
        if id == NIL { NIL } else { self.node_at(id).left }
    }

    #[inline]
    pub(crate) fn get_right(&self, id: NodeId) -> NodeId {
        if id == NIL { NIL } else { self.node_at(id).right }
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        if id != NIL {
            self.node_at_mut(id).parent = parent;
        }
    }

    #[inline]
    pub(crate) fn set_left(&mut self, id: NodeId, left: NodeId) {
        if id != NIL {
            self.node_at_mut(id).left = left;
        }
    }

    #[inline]
    pub(crate) fn set_right(&mut self, id: NodeId, right: NodeId) {
        if id != NIL {
            self.node_at_mut(id).right = right;
        }
    }

    /// Points whichever link of `parent` referenced `old` at `new`, or moves the
    /// root when `parent` is nil. Does not touch `new`'s parent link.
    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if parent == NIL {
            self.root = new;
        } else if self.node_at(parent).left == old {
            self.node_at_mut(parent).left = new;
        } else {
            self.node_at_mut(parent).right = new;
        }
    }

    pub(crate) fn find_minimum(&self, mut node: NodeId) -> NodeId {
        while node != NIL {
            let left = self.node_at(node).left;
            if left == NIL {
                break;
            }
            node = left;
        }
        node
    }

    pub(crate) fn find_maximum(&self, mut node: NodeId) -> NodeId {
        while node != NIL {
            let right = self.node_at(node).right;
            if right == NIL {
                break;
            }
            node = right;
        }
        node
    }

    /// Number of nodes on the longest root-to-leaf path
    pub(crate) fn height(&self) -> usize {
        let mut deepest = 0;
        let mut stack = Vec::new();
        if self.root != NIL {
            stack.push((self.root, 1));
        }
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let node = self.node_at(id);
            if node.left != NIL {
                stack.push((node.left, depth + 1));
            }
            if node.right != NIL {
                stack.push((node.right, depth + 1));
            }
        }
        deepest
    }

    /// Visits every node in ascending key order together with its zero-based rank.
    ///
    /// Uses an explicit stack, so a degenerate (list-shaped) plain tree does not
    /// recurse once per level.
    pub(crate) fn walk_in_order<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(NodeId, &'a Node<K, V, C>, usize),
    {
        let mut stack = Vec::new();
        let mut current = self.root;
        let mut rank = 0;

        loop {
            while current != NIL {
                stack.push(current);
                current = self.node_at(current).left;
            }
            let Some(id) = stack.pop() else {
                break;
            };
            let node = self.node_at(id);
            visit(id, node, rank);
            rank += 1;
            current = node.right;
        }
    }

    /// Splices `node` out of the tree shape without freeing its slot.
    ///
    /// With two children the in-order successor takes `node`'s position: when
    /// it is not `node`'s right child it is first cut from its own parent (its
    /// right subtree moving up) and adopts `node`'s right subtree. In every
    /// two-child case it adopts `node`'s left subtree. With one child that child
    /// moves up; with none the position becomes the sentinel.
    pub(crate) fn unlink(&mut self, node: NodeId) -> Unlinked {
        let parent = self.get_parent(node);
        let left = self.get_left(node);
        let right = self.get_right(node);

        let (replacement, unlinked) = if left != NIL && right != NIL {
            let successor = self.find_minimum(right);
            let child = self.get_right(successor);

            let child_parent = if successor == right {
                successor
            } else {
                let successor_parent = self.get_parent(successor);
                self.set_left(successor_parent, child);
                self.set_parent(child, successor_parent);

                self.set_right(successor, right);
                self.set_parent(right, successor);
                successor_parent
            };

            self.set_left(successor, left);
            self.set_parent(left, successor);

            debug!(
                "splicing successor {} into position of node {}",
                successor.0, node.0
            );

            let unlinked = Unlinked {
                moved: successor,
                child,
                child_parent,
            };
            (successor, unlinked)
        } else {
            let replacement = if left != NIL { left } else { right };
            let unlinked = Unlinked {
                moved: node,
                child: replacement,
                child_parent: parent,
            };
            (replacement, unlinked)
        };

        self.replace_child(parent, node, replacement);
        self.set_parent(replacement, parent);

        unlinked
    }

    /// Frees the slot of an already unlinked node and returns its key and value.
    ///
    /// The last slot is moved into the freed one and its neighbours are relinked,
    /// which keeps the arena dense.
    pub(crate) fn release(&mut self, node: NodeId) -> (K, V) {
        let last = NodeId(self.nodes.len() - 1);
        let removed = self.nodes.swap_remove(node.0);

        if node != last {
            let moved = self.node_at(node);
            let (parent, left, right) = (moved.parent, moved.left, moved.right);

            self.replace_child(parent, last, node);
            self.set_parent(left, node);
            self.set_parent(right, node);
            trace!("relocated node {} into slot {}", last.0, node.0);
        }

        (removed.key, removed.value)
    }
}

impl<K: Ord, V, C> RawTree<K, V, C> {
    /// Returns `(node, parent)` for `key`.
    ///
    /// `node` is nil when the key is absent; `parent` is then the node a new key
    /// would hang from, or nil for an empty tree. The descent stops at the
    /// sentinel, so it never reads through a missing child.
    pub(crate) fn find_node_and_parent<Q>(&self, key: &Q) -> (NodeId, NodeId)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self.root;
        let mut parent = NIL;

        while node != NIL {
            let current = self.node_at(node);
            match key.cmp(current.key.borrow()) {
                Ordering::Less => {
                    parent = node;
                    node = current.left;
                }
                Ordering::Greater => {
                    parent = node;
                    node = current.right;
                }
                Ordering::Equal => break,
            }
        }
        (node, parent)
    }

    /// Structural insert shared by both containers.
    ///
    /// Overwrites the value of an existing key in place, otherwise hangs a new
    /// node carrying `color` off the attach point. The flag is `true` only when
    /// a node was created.
    pub(crate) fn insert_internal(&mut self, key: K, value: V, color: C) -> (NodeId, bool) {
        let (found, parent) = self.find_node_and_parent(&key);

        if found != NIL {
            self.node_at_mut(found).value = value;
            return (found, false);
        }

        let goes_left = parent != NIL && key < self.node_at(parent).key;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            key,
            value,
            parent,
            left: NIL,
            right: NIL,
            color,
        });

        if parent == NIL {
            self.root = id;
        } else if goes_left {
            self.node_at_mut(parent).left = id;
        } else {
            self.node_at_mut(parent).right = id;
        }

        (id, true)
    }

    /// Live node holding `key`, if any.
    pub(crate) fn find_node<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (node, _) = self.find_node_and_parent(key);
        (node != NIL).then_some(node)
    }

    pub(crate) fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_node(key).map(|id| &self.node_at(id).value)
    }

    pub(crate) fn lookup_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find_node(key)?;
        Some(&mut self.node_at_mut(id).value)
    }
}

/// An ordered key-value container backed by a plain binary search tree.
///
/// Keys are unique: inserting an existing key replaces its value. No balancing
/// is done, so the height follows the insertion order (sorted input yields a
/// list). Use [`RbTree`](crate::RbTree) when a logarithmic height is needed.
///
/// Node handles returned by [`insert`](Self::insert) can be inspected with
/// [`key_of`](Self::key_of), [`parent_of`](Self::parent_of) and friends; at this
/// layer a missing link is reported as `None`.
#[derive(Debug, Clone)]
pub struct OrderedTree<K, V> {
    raw: RawTree<K, V, ()>,
}

impl<K, V> Default for OrderedTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OrderedTree<K, V> {
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

    /// Calls `callback` for every entry in ascending key order.
    ///
    /// The callback receives the entry, its zero-based rank and the tree itself.
    /// The tree is borrowed shared for the whole walk, so it cannot be mutated
    /// from inside the callback.
    pub fn for_each<F>(&self, mut callback: F)
    where
        F: FnMut(Entry<'_, K, V>, usize, &Self),
    {
        self.raw
            .walk_in_order(|_, node, rank| callback(Entry::from_node(node), rank, self));
    }

    /// Handle of the root node.
    pub fn root(&self) -> Option<NodeId> {
        self.link(self.raw.root())
    }

    /// Key stored at `id`.
    pub fn key_of(&self, id: NodeId) -> Option<&K> {
        self.raw.get(id).map(|node| &node.key)
    }

    /// Value stored at `id`.
    pub fn value_of(&self, id: NodeId) -> Option<&V> {
        self.raw.get(id).map(|node| &node.value)
    }

    /// Parent of `id`, `None` for the root.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.raw.get(id).and_then(|node| self.link(node.parent))
    }

    /// Left child of `id`.
    pub fn left_of(&self, id: NodeId) -> Option<NodeId> {
        self.raw.get(id).and_then(|node| self.link(node.left))
    }

    /// Right child of `id`.
    pub fn right_of(&self, id: NodeId) -> Option<NodeId> {
        self.raw.get(id).and_then(|node| self.link(node.right))
    }

    #[inline]
    fn link(&self, id: NodeId) -> Option<NodeId> {
        (!id.is_sentinel()).then_some(id)
    }
}

impl<K: Ord, V> OrderedTree<K, V> {
    /// Inserts `key` with `value`, overwriting the value if the key is present.
    ///
    /// Returns the handle of the new or updated node.
    pub fn insert(&mut self, key: K, value: V) -> NodeId {
        let (id, created) = self.raw.insert_internal(key, value, ());
        if !created {
            trace!("overwrote value of node {}", id.0);
        }
        id
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

    /// Removes `key` and returns its value, or `None` (leaving the tree
    /// untouched) if it is absent.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (node, _) = self.raw.find_node_and_parent(key);
        if node.is_sentinel() {
            return None;
        }

        self.raw.unlink(node);
        let (_, value) = self.raw.release(node);
        Some(value)
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for OrderedTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for OrderedTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

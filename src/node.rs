/// Handle to a node slot inside a tree's arena.
///
/// Handles stay valid across inserts and rotations. Deleting a key moves the
/// last arena slot into the freed one, so a handle taken before a delete may
/// name a different node afterwards, or no node at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Shared sentinel handle, one past any slot an arena can address
    pub(crate) const NIL: NodeId = NodeId(usize::MAX);

    /// Returns `true` if this handle is the sentinel rather than a live slot
    #[inline]
    pub const fn is_sentinel(self) -> bool {
        self.0 == Self::NIL.0
    }

    /// Returns the arena slot index this handle points at
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A node stored in the arena.
///
/// Child links own their subtree; `parent` is a plain back-reference. Absent
/// links hold [`NodeId::NIL`].
#[derive(Debug, Clone)]
pub(crate) struct Node<K, V, C> {
    /// Key that fixes the node's position in the tree
    pub(crate) key: K,

    /// Payload, overwritten in place when the key is inserted again
    pub(crate) value: V,

    /// Index of the parent node (nil for the root)
    pub(crate) parent: NodeId,

    /// Index of the left child (nil if no left child)
    pub(crate) left: NodeId,

    /// Index of the right child (nil if no right child)
    pub(crate) right: NodeId,

    /// Balancing color; `()` for the plain layer
    pub(crate) color: C,
}

/// Borrowed `{key, value}` view of one stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry<'a, K, V> {
    /// The entry's key
    pub key: &'a K,
    /// The value currently associated with `key`
    pub value: &'a V,
}

impl<'a, K, V> Entry<'a, K, V> {
    #[inline]
    pub(crate) fn from_node<C>(node: &'a Node<K, V, C>) -> Self {
        Entry {
            key: &node.key,
            value: &node.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_sentinel() {
        assert!(NodeId::NIL.is_sentinel());
        assert!(!NodeId(0).is_sentinel());
        assert_eq!(NodeId(7).index(), 7);
    }

    #[test]
    fn test_entry_from_node() {
        let node = Node {
            key: 3,
            value: "three",
            parent: NodeId::NIL,
            left: NodeId::NIL,
            right: NodeId::NIL,
            color: (),
        };
        let entry = Entry::from_node(&node);
        assert_eq!(entry.key, &3);
        assert_eq!(entry.value, &"three");
    }
}

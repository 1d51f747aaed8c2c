use core::fmt;

use crate::NodeId;

/// Error returned when a rotation cannot find the two nodes it moves.
///
/// A rotation needs a live pivot and a real child to promote. The balancing
/// fixups only rotate at nodes they just walked to, so they never see one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RotationError {
    /// The pivot handle is the sentinel
    SentinelPivot,
    /// The pivot handle names a slot that no longer holds a node
    StaleHandle,
    /// The child that would be promoted is the sentinel
    SentinelChild,
}

impl fmt::Display for RotationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationError::SentinelPivot => write!(formatter, "cannot rotate a sentinel node"),
            RotationError::StaleHandle => {
                write!(formatter, "cannot rotate a node that is no longer in the tree")
            }
            RotationError::SentinelChild => {
                write!(formatter, "cannot rotate away from a sentinel child")
            }
        }
    }
}

impl core::error::Error for RotationError {}

/// First red-black or search-order rule found broken by
/// [`RbTree::check_invariants`](crate::RbTree::check_invariants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The root is red
    RedRoot,
    /// A red node has a red child
    RedRed {
        /// The red parent of the offending edge
        node: NodeId,
    },
    /// The two subtrees of a node have different black heights
    BlackHeight {
        /// The node whose subtrees disagree
        node: NodeId,
    },
    /// A child's parent link does not point back at its parent
    ParentLink {
        /// The child with the broken back-reference
        node: NodeId,
    },
    /// In-order traversal met a key not strictly greater than its predecessor
    KeyOrder {
        /// The node whose key is out of order
        node: NodeId,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::RedRoot => write!(formatter, "root node is red"),
            InvariantViolation::RedRed { node } => {
                write!(formatter, "red node {} has a red child", node.index())
            }
            InvariantViolation::BlackHeight { node } => write!(
                formatter,
                "subtrees of node {} have unequal black heights",
                node.index()
            ),
            InvariantViolation::ParentLink { node } => write!(
                formatter,
                "node {} does not link back to its parent",
                node.index()
            ),
            InvariantViolation::KeyOrder { node } => {
                write!(formatter, "key of node {} is out of order", node.index())
            }
        }
    }
}

impl core::error::Error for InvariantViolation {}

//! The witness tree: a partial trie reconstructed from a proof.
//!
//! Parts of the trie the proof expands are materialized as [`WitnessNode::Internal`],
//! [`WitnessNode::Leaf`] and [`WitnessNode::Empty`] nodes. Everything else is an opaque
//! [`WitnessNode::Hash`] whose contents are unknown.
//!
//! Nodes live in an arena and are addressed by [`NodeIndex`]. Every slot caches the hash of its
//! node, so the root is available in constant time and updates only rehash the nodes along the
//! updated path. Slots which become unreachable during updates are left in place; the tree is
//! short-lived and discarded after use.

use core::{fmt, marker::PhantomData};

use crate::{
    hasher::TrieHasher,
    trie::{self, Hex, InternalData, LeafData, Node, NodeKind, TERMINATOR},
};

/// The index of a node within a [`WitnessTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(usize);

/// A leaf materialized by a proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessLeaf {
    /// The key path and value hash of the leaf.
    pub leaf: LeafData,
    /// The value itself, if the proof carried it. Leaves which only serve as evidence of
    /// non-inclusion usually carry just the value hash.
    pub value: Option<Vec<u8>>,
}

/// A node of the witness tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessNode {
    /// No leaf lives under this position.
    Empty,
    /// A fully materialized leaf.
    Leaf(WitnessLeaf),
    /// A fully materialized internal node.
    Internal {
        /// The left child.
        left: NodeIndex,
        /// The right child.
        right: NodeIndex,
    },
    /// A sub-trie the proof did not expand. Only its hash is known.
    Hash(Node),
}

#[derive(Clone)]
struct Slot {
    node: WitnessNode,
    hash: Node,
}

/// Errors when the root of a witness tree does not match the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("root mismatch: expected {}, computed {}", Hex(.expected), Hex(.actual))]
pub struct RootMismatch {
    /// The root the caller expected.
    pub expected: Node,
    /// The root computed from the witness tree.
    pub actual: Node,
}

/// A partial trie, generic over the hash function used to build it.
pub struct WitnessTree<H> {
    slots: Vec<Slot>,
    root: NodeIndex,
    _marker: PhantomData<H>,
}

impl<H> Clone for WitnessTree<H> {
    fn clone(&self) -> Self {
        WitnessTree {
            slots: self.slots.clone(),
            root: self.root,
            _marker: PhantomData,
        }
    }
}

impl<H> fmt::Debug for WitnessTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessTree")
            .field("root", &Hex(&self.slots[self.root.0].hash))
            .field("nodes", &self.slots.len())
            .finish()
    }
}

impl<H: TrieHasher> WitnessTree<H> {
    /// Create the witness tree of an empty trie. Its root is the [`TERMINATOR`] and it proves the
    /// absence of every key.
    pub fn empty() -> Self {
        let mut tree = Self::with_capacity(1);
        tree.root = tree.push(WitnessNode::Empty);
        tree
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        WitnessTree {
            slots: Vec::with_capacity(capacity),
            root: NodeIndex(0),
            _marker: PhantomData,
        }
    }

    /// The root hash of the trie this tree witnesses.
    pub fn root(&self) -> Node {
        self.slots[self.root.0].hash
    }

    /// The index of the root node.
    pub fn root_index(&self) -> NodeIndex {
        self.root
    }

    /// Get the node at the given index.
    ///
    /// # Panics
    ///
    /// Panics if the index does not belong to this tree.
    pub fn node(&self, index: NodeIndex) -> &WitnessNode {
        &self.slots[index.0].node
    }

    /// Get the cached hash of the node at the given index.
    ///
    /// # Panics
    ///
    /// Panics if the index does not belong to this tree.
    pub fn hash(&self, index: NodeIndex) -> Node {
        self.slots[index.0].hash
    }

    /// The number of nodes allocated in the arena, including those no longer reachable after
    /// updates.
    pub fn allocated_nodes(&self) -> usize {
        self.slots.len()
    }

    /// Check the root against an expected value.
    pub fn verify_root(&self, expected: Node) -> Result<(), RootMismatch> {
        let actual = self.root();
        if actual == expected {
            Ok(())
        } else {
            Err(RootMismatch { expected, actual })
        }
    }

    /// Fold the whole tree into its root hash, ignoring all cached hashes except those of opaque
    /// [`WitnessNode::Hash`] nodes.
    ///
    /// This always agrees with [`WitnessTree::root`].
    pub fn recompute_root(&self) -> Node {
        // post-order traversal with an explicit stack. `expanded` marks internal nodes whose
        // children have already been scheduled.
        let mut pending = vec![(self.root, false)];
        let mut hashes: Vec<Node> = Vec::new();

        while let Some((index, expanded)) = pending.pop() {
            match self.node(index) {
                WitnessNode::Empty => hashes.push(TERMINATOR),
                WitnessNode::Hash(hash) => hashes.push(*hash),
                WitnessNode::Leaf(leaf) => hashes.push(H::hash_leaf(&leaf.leaf)),
                WitnessNode::Internal { left, right } => {
                    if expanded {
                        // the right child is evaluated last, so it is on top.
                        let right = hashes.pop().unwrap_or(TERMINATOR);
                        let left = hashes.pop().unwrap_or(TERMINATOR);
                        hashes.push(H::hash_internal(&InternalData { left, right }));
                    } else {
                        pending.push((index, true));
                        pending.push((*right, false));
                        pending.push((*left, false));
                    }
                }
            }
        }

        hashes.pop().unwrap_or(TERMINATOR)
    }

    /// Whether the node is a leaf, either materialized or known to be one by its hash label.
    pub(crate) fn is_leaf_like(&self, index: NodeIndex) -> bool {
        match self.node(index) {
            WitnessNode::Leaf(_) => true,
            WitnessNode::Hash(hash) => trie::is_leaf::<H>(hash),
            _ => false,
        }
    }

    /// Whether the node is known to be an empty sub-trie.
    pub(crate) fn is_empty_node(&self, index: NodeIndex) -> bool {
        matches!(self.node(index), WitnessNode::Empty)
    }

    /// Allocate a node, computing its hash from its contents.
    pub(crate) fn push(&mut self, node: WitnessNode) -> NodeIndex {
        let hash = self.hash_of(&node);
        let index = NodeIndex(self.slots.len());
        self.slots.push(Slot { node, hash });
        index
    }

    /// Replace the node at `index`, recomputing the hash of that slot only. Ancestors must be
    /// rehashed by the caller.
    pub(crate) fn replace(&mut self, index: NodeIndex, node: WitnessNode) -> WitnessNode {
        let hash = self.hash_of(&node);
        let slot = &mut self.slots[index.0];
        slot.hash = hash;
        core::mem::replace(&mut slot.node, node)
    }

    /// Take the node at `index`, leaving an empty node behind.
    pub(crate) fn take(&mut self, index: NodeIndex) -> WitnessNode {
        self.replace(index, WitnessNode::Empty)
    }

    /// Recompute the cached hash of an internal node from its children.
    pub(crate) fn rehash(&mut self, index: NodeIndex) {
        let hash = self.hash_of(&self.slots[index.0].node);
        self.slots[index.0].hash = hash;
    }

    pub(crate) fn set_root(&mut self, root: NodeIndex) {
        self.root = root;
    }

    fn hash_of(&self, node: &WitnessNode) -> Node {
        match node {
            WitnessNode::Empty => TERMINATOR,
            WitnessNode::Hash(hash) => *hash,
            WitnessNode::Leaf(leaf) => H::hash_leaf(&leaf.leaf),
            WitnessNode::Internal { left, right } => H::hash_internal(&InternalData {
                left: self.hash(*left),
                right: self.hash(*right),
            }),
        }
    }

    /// The kind of the node at the given index, as it would appear in the full trie.
    pub fn kind(&self, index: NodeIndex) -> NodeKind {
        match self.node(index) {
            WitnessNode::Empty => NodeKind::Terminator,
            WitnessNode::Leaf(_) => NodeKind::Leaf,
            WitnessNode::Internal { .. } => NodeKind::Internal,
            WitnessNode::Hash(hash) => NodeKind::of::<H>(hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{WitnessLeaf, WitnessNode, WitnessTree};
    use crate::{
        hasher::{Blake3Hasher, NodeHasher},
        trie::{InternalData, LeafData, NodeKind, TERMINATOR},
    };

    fn leaf(key: u8, value: u8) -> WitnessNode {
        WitnessNode::Leaf(WitnessLeaf {
            leaf: LeafData {
                key_path: [key; 32],
                value_hash: [value; 32],
            },
            value: None,
        })
    }

    #[test]
    fn empty_tree_root_is_terminator() {
        let tree = WitnessTree::<Blake3Hasher>::empty();
        assert_eq!(tree.root(), TERMINATOR);
        assert_eq!(tree.recompute_root(), TERMINATOR);
        assert_eq!(tree.kind(tree.root_index()), NodeKind::Terminator);
    }

    #[test]
    fn cached_and_recomputed_roots_agree() {
        let mut tree = WitnessTree::<Blake3Hasher>::with_capacity(5);
        let a = tree.push(leaf(0x00, 1));
        let b = tree.push(WitnessNode::Hash([0x42; 32]));
        let inner = tree.push(WitnessNode::Internal { left: a, right: b });
        let e = tree.push(WitnessNode::Empty);
        let root = tree.push(WitnessNode::Internal {
            left: inner,
            right: e,
        });
        tree.set_root(root);

        let a_hash = Blake3Hasher::hash_leaf(&LeafData {
            key_path: [0; 32],
            value_hash: [1; 32],
        });
        let inner_hash = Blake3Hasher::hash_internal(&InternalData {
            left: a_hash,
            right: [0x42; 32],
        });
        let expected = Blake3Hasher::hash_internal(&InternalData {
            left: inner_hash,
            right: TERMINATOR,
        });

        assert_eq!(tree.root(), expected);
        assert_eq!(tree.recompute_root(), expected);
        assert!(tree.verify_root(expected).is_ok());
        assert!(tree.verify_root(TERMINATOR).is_err());
    }

    #[test]
    fn leaf_like_uses_hash_label() {
        let mut tree = WitnessTree::<Blake3Hasher>::with_capacity(3);
        let leaf_hash = Blake3Hasher::hash_leaf(&LeafData::default());
        let opaque_leaf = tree.push(WitnessNode::Hash(leaf_hash));
        let opaque_internal = tree.push(WitnessNode::Hash([0x01; 32]));
        let materialized = tree.push(leaf(3, 3));

        assert!(tree.is_leaf_like(opaque_leaf));
        assert!(!tree.is_leaf_like(opaque_internal));
        assert!(tree.is_leaf_like(materialized));
    }
}

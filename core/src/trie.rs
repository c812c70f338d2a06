//! This module defines the types of a compact binary sparse merkle trie, generalized over a
//! 256 bit hash function. All lookup paths in the trie are 256 bits: the hash of the key.
//!
//! All node hashes are 256 bits. There are three kinds of nodes.
//!   1. Internal (branch) nodes, which each have two children. The hash of an internal node is
//!      given by hashing a branch tag followed by the two child hashes and setting the MSB to 0.
//!   2. Leaf nodes, which have zero children. The hash of a leaf node is given by hashing a leaf
//!      tag followed by the 256-bit lookup path and the hash of the value stored at the leaf,
//!      and setting the MSB to 1.
//!   3. [`TERMINATOR`] nodes, which have the special value of all 0s. These nodes have no children
//!      and serve as a stand-in for an empty sub-trie at any height.
//!
//! The trie is compact: a leaf lives at the shallowest position where its path is unique among
//! all stored keys, so the hash of a leaf never depends on its depth.

use core::fmt;

use bitvec::prelude::*;

use crate::hasher::NodeHasher;

/// A node in the binary trie. In this schema, it is always 256 bits and is the hash of either
/// a [`LeafData`] or [`InternalData`], or zeroed if it's a [`TERMINATOR`].
pub type Node = [u8; 32];

/// The path to a key. All paths have a 256 bit fixed length.
pub type KeyPath = [u8; 32];

/// The hash of a value. In this schema, it is always 256 bits.
pub type ValueHash = [u8; 32];

/// The number of bits in a [`KeyPath`] and therefore the maximum depth of a leaf.
pub const MAX_DEPTH: usize = 256;

/// The terminator hash is a special node hash value denoting an empty sub-tree.
/// Concretely, when this appears at a given location in the trie,
/// it implies that no key with a path beginning with the location has a value.
///
/// This value may appear at any height.
pub const TERMINATOR: Node = [0u8; 32];

/// Whether the node hash indicates the node is a leaf.
pub fn is_leaf<H: NodeHasher>(hash: &Node) -> bool {
    H::node_kind(hash) == NodeKind::Leaf
}

/// Whether the node hash indicates the node is an internal node.
pub fn is_internal<H: NodeHasher>(hash: &Node) -> bool {
    H::node_kind(hash) == NodeKind::Internal
}

/// Whether the node holds the special `TERMINATOR` value.
pub fn is_terminator<H: NodeHasher>(hash: &Node) -> bool {
    H::node_kind(hash) == NodeKind::Terminator
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A terminator node indicates an empty sub-trie.
    Terminator,
    /// A leaf node indicates a sub-trie with a single leaf.
    Leaf,
    /// An internal node indicates at least two values.
    Internal,
}

impl NodeKind {
    /// Get the kind of the provided node.
    pub fn of<H: NodeHasher>(node: &Node) -> Self {
        H::node_kind(node)
    }
}

/// The data of an internal (branch) node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalData {
    /// The hash of the left child of this node.
    pub left: Node,
    /// The hash of the right child of this node.
    pub right: Node,
}

/// The data of a leaf node.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LeafData {
    /// The total path to this value within the trie.
    ///
    /// The actual location of this node may be anywhere along this path, depending on the other
    /// data within the trie.
    pub key_path: KeyPath,
    /// The hash of the value carried in this leaf.
    pub value_hash: ValueHash,
}

/// Get the bit of the key path at the given depth. `false` is left, `true` is right.
pub fn bit_at(key_path: &KeyPath, depth: usize) -> bool {
    key_path.view_bits::<Msb0>()[depth]
}

/// The number of leading bits shared by two key paths.
pub fn shared_bits(a: &KeyPath, b: &KeyPath) -> usize {
    shared_prefix(a.view_bits::<Msb0>(), b.view_bits::<Msb0>())
}

pub(crate) fn shared_prefix(a: &BitSlice<u8, Msb0>, b: &BitSlice<u8, Msb0>) -> usize {
    a.iter().zip(b.iter()).take_while(|(a, b)| a == b).count()
}

/// Hex formatting helper for 32-byte hashes and paths.
pub struct Hex<'a>(pub &'a [u8; 32]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

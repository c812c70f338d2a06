//! Hashers (feature-gated) and utilities for implementing them.

use crate::trie::{InternalData, KeyPath, LeafData, Node, NodeKind, ValueHash, TERMINATOR};

/// The tag prepended to the preimage of every leaf node.
pub const LEAF_TAG: u8 = 0x00;

/// The tag prepended to the preimage of every internal node.
pub const INTERNAL_TAG: u8 = 0x01;

/// A trie node hash function.
///
/// Note that it is illegal for the produced hash to equal [0; 32], as this value is reserved
/// for the terminator node.
///
/// A node hasher must domain-separate internal and leaf nodes. Without it, the children of an
/// internal node could be presented as the `(key_path, value_hash)` pair of a leaf, yielding the
/// same hash for two structurally different tries.
pub trait NodeHasher {
    /// Hash a leaf. This should domain-separate the hash
    /// according to the node kind.
    fn hash_leaf(data: &LeafData) -> Node;

    /// Hash an internal node. This should domain-separate
    /// the hash according to the node kind.
    fn hash_internal(data: &InternalData) -> Node;

    /// Get the kind of the given node.
    fn node_kind(node: &Node) -> NodeKind;
}

/// A hasher for arbitrary-length values.
pub trait ValueHasher {
    /// Hash an arbitrary-length value.
    fn hash_value(value: &[u8]) -> ValueHash;
}

/// A hasher mapping arbitrary-length keys onto their lookup paths.
pub trait KeyHasher {
    /// Get the lookup path of a key.
    fn key_path(key: &[u8]) -> KeyPath;
}

/// Everything the witness trie needs from a hash function.
pub trait TrieHasher: NodeHasher + ValueHasher + KeyHasher {}

impl<T: NodeHasher + ValueHasher + KeyHasher> TrieHasher for T {}

/// Get the node kind, according to a most-significant bit labeling scheme.
///
/// If the MSB is true, it's a leaf. If the node is empty, it's a [`TERMINATOR`]. Otherwise, it's
/// an internal node.
pub fn node_kind_by_msb(node: &Node) -> NodeKind {
    if node[0] >> 7 == 1 {
        NodeKind::Leaf
    } else if node == &TERMINATOR {
        NodeKind::Terminator
    } else {
        NodeKind::Internal
    }
}

/// Set the most-significant bit of the node.
pub fn set_msb(node: &mut Node) {
    node[0] |= 0b10000000;
}

/// Unset the most-significant bit of the node.
pub fn unset_msb(node: &mut Node) {
    node[0] &= 0b01111111;
}

/// A simple trait for representing binary hash functions.
pub trait BinaryHash {
    /// Given a bit-string, produce a 32-byte hash.
    fn hash(input: &[u8]) -> [u8; 32];

    /// An optional specialization of `hash` for a one-byte tag followed by two 32-byte inputs.
    fn hash_tagged(tag: u8, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut buf = [0u8; 65];
        buf[0] = tag;
        buf[1..33].copy_from_slice(left);
        buf[33..65].copy_from_slice(right);
        Self::hash(&buf)
    }
}

/// A node, value and key hasher constructed from a simple binary hasher.
///
/// Node preimages are prefixed with [`LEAF_TAG`] or [`INTERNAL_TAG`], and the resulting hash is
/// additionally labeled by setting or unsetting its MSB, so that the kind of an opaque node hash
/// can be recovered with [`node_kind_by_msb`].
///
/// The binary hash wrapped by this structure must behave approximately like a random oracle over
/// the space 2^256, i.e. all 256 bit outputs are valid and inputs are uniformly distributed.
///
/// Functions like Sha2/Blake3/Keccak/Groestl all meet these criteria.
pub struct BinaryHasher<H>(core::marker::PhantomData<H>);

impl<H: BinaryHash> ValueHasher for BinaryHasher<H> {
    fn hash_value(value: &[u8]) -> ValueHash {
        H::hash(value)
    }
}

impl<H: BinaryHash> KeyHasher for BinaryHasher<H> {
    fn key_path(key: &[u8]) -> KeyPath {
        H::hash(key)
    }
}

impl<H: BinaryHash> NodeHasher for BinaryHasher<H> {
    fn hash_leaf(data: &LeafData) -> Node {
        let mut h = H::hash_tagged(LEAF_TAG, &data.key_path, &data.value_hash);
        set_msb(&mut h);
        h
    }

    fn hash_internal(data: &InternalData) -> Node {
        let mut h = H::hash_tagged(INTERNAL_TAG, &data.left, &data.right);
        unset_msb(&mut h);
        h
    }

    fn node_kind(node: &Node) -> NodeKind {
        node_kind_by_msb(node)
    }
}

#[cfg(any(feature = "blake3-hasher", test))]
pub use blake3::Blake3Hasher;

/// A trie hasher making use of blake3.
#[cfg(any(feature = "blake3-hasher", test))]
pub mod blake3 {
    use super::{BinaryHash, BinaryHasher};

    /// A [`BinaryHash`] implementation for Blake3.
    pub struct Blake3BinaryHasher;

    /// A wrapper around Blake3 for use in the witness trie.
    pub type Blake3Hasher = BinaryHasher<Blake3BinaryHasher>;

    impl BinaryHash for Blake3BinaryHasher {
        fn hash(value: &[u8]) -> [u8; 32] {
            blake3::hash(value).into()
        }

        fn hash_tagged(tag: u8, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&[tag]);
            hasher.update(left);
            hasher.update(right);
            hasher.finalize().into()
        }
    }
}

#[cfg(feature = "sha2-hasher")]
pub use sha2::Sha2Hasher;

/// A trie hasher making use of sha2-256.
#[cfg(feature = "sha2-hasher")]
pub mod sha2 {
    use super::{BinaryHash, BinaryHasher};
    use sha2::{Digest, Sha256};

    /// A [`BinaryHash`] implementation for Sha2.
    pub struct Sha2BinaryHasher;

    /// A wrapper around sha2-256 for use in the witness trie.
    pub type Sha2Hasher = BinaryHasher<Sha2BinaryHasher>;

    impl BinaryHash for Sha2BinaryHasher {
        fn hash(value: &[u8]) -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update(value);
            hasher.finalize().into()
        }

        fn hash_tagged(tag: u8, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
            let mut hasher = Sha256::new();
            hasher.update([tag]);
            hasher.update(left);
            hasher.update(right);
            hasher.finalize().into()
        }
    }
}

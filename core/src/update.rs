//! Trie update logic.
//!
//! Two things live here: building the root of a trie out of a sorted set of leaves, and applying
//! puts and deletes to a [`WitnessTree`] so that its root follows the root of the full trie.
//!
//! ## Updating a witness tree
//!
//! Each operation seeks its key path down to a terminal node. Reaching an opaque node fails the
//! operation, since the proof does not hold enough of the trie to perform it.
//!
//!   - A put onto the leaf of the same key replaces the leaf.
//!   - A put onto an empty node replaces it with a leaf.
//!   - A put onto the leaf of another key replaces it with a chain of internal nodes down to the
//!     first bit at which the two key paths differ, where both leaves are placed. Unused sides of
//!     the chain are empty.
//!   - A delete of an existing leaf replaces it with an empty node and compacts upwards: as long as
//!     a node is empty and its sibling is empty or a leaf, or vice versa, the parent is replaced by
//!     the non-empty one of the two. Opaque siblings take part in compaction when their hash is
//!     labeled as a leaf.
//!
//! Afterwards, only the ancestors of the changed node are rehashed.
//!
//! The trie is kept in its canonical compact form throughout, so the resulting root only depends
//! on the final set of leaves and not on the order of operations.

use bitvec::prelude::*;

use crate::{
    hasher::{NodeHasher, TrieHasher},
    seek::{IncompleteWitness, SeekPath},
    trie::{self, InternalData, KeyPath, LeafData, Node, ValueHash},
    witness::{NodeIndex, WitnessLeaf, WitnessNode, WitnessTree},
};

/// Errors when applying a batch of updates to a witness tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// An update touches a part of the trie the proof did not expand.
    #[error(transparent)]
    Incomplete(#[from] IncompleteWitness),
}

impl<H: TrieHasher> WitnessTree<H> {
    /// Apply a batch of updates, in order, and return the updated tree along with its new root.
    ///
    /// `Some(value)` puts a value, `None` deletes the key. The batch is all-or-nothing: if any
    /// update fails, the partially updated tree is dropped.
    pub fn apply<K: AsRef<[u8]>>(
        self,
        updates: impl IntoIterator<Item = (K, Option<Vec<u8>>)>,
    ) -> Result<(Self, Node), UpdateError> {
        self.apply_paths(
            updates
                .into_iter()
                .map(|(key, value)| (H::key_path(key.as_ref()), value)),
        )
    }

    /// Like [`WitnessTree::apply`], for already-hashed key paths.
    pub fn apply_paths(
        mut self,
        updates: impl IntoIterator<Item = (KeyPath, Option<Vec<u8>>)>,
    ) -> Result<(Self, Node), UpdateError> {
        for (key_path, value) in updates {
            self.update_path(key_path, value)?;
        }
        let root = self.root();
        Ok((self, root))
    }

    /// Apply a single update. On failure, the tree is left untouched.
    pub fn update_path(
        &mut self,
        key_path: KeyPath,
        value: Option<Vec<u8>>,
    ) -> Result<(), IncompleteWitness> {
        match value {
            Some(value) => self.put_path(key_path, value),
            None => self.delete_path(key_path),
        }
    }

    /// Put a value under a key. On failure, the tree is left untouched.
    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), IncompleteWitness> {
        self.put_path(H::key_path(key), value)
    }

    /// Put a value under an already-hashed key path. On failure, the tree is left untouched.
    pub fn put_path(&mut self, key_path: KeyPath, value: Vec<u8>) -> Result<(), IncompleteWitness> {
        let seek = self.seek(&key_path)?;

        let new_leaf = WitnessLeaf {
            leaf: LeafData {
                key_path,
                value_hash: H::hash_value(&value),
            },
            value: Some(value),
        };

        let other_key = match self.node(seek.terminal) {
            WitnessNode::Leaf(leaf) if leaf.leaf.key_path != key_path => Some(leaf.leaf.key_path),
            _ => None,
        };

        match other_key {
            Some(other_key) => self.split_leaf(seek.terminal, seek.depth, &other_key, new_leaf),
            None => {
                self.replace(seek.terminal, WitnessNode::Leaf(new_leaf));
            }
        }

        self.hash_up(&seek.path);
        Ok(())
    }

    /// Delete a key. Deleting a key which is provably absent does nothing. On failure, the tree is
    /// left untouched.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), IncompleteWitness> {
        self.delete_path(H::key_path(key))
    }

    /// Delete an already-hashed key path. On failure, the tree is left untouched.
    pub fn delete_path(&mut self, key_path: KeyPath) -> Result<(), IncompleteWitness> {
        let seek = self.seek(&key_path)?;
        match self.node(seek.terminal) {
            WitnessNode::Leaf(leaf) if leaf.leaf.key_path == key_path => {}
            _ => return Ok(()),
        }

        self.replace(seek.terminal, WitnessNode::Empty);

        let mut path = seek.path;
        let mut current = seek.terminal;
        while let Some(&(parent, bit)) = path.last() {
            let sibling = match self.node(parent) {
                WitnessNode::Internal { left, right } => {
                    if bit {
                        *left
                    } else {
                        *right
                    }
                }
                _ => break,
            };

            let lifted = if self.is_empty_node(current)
                && (self.is_empty_node(sibling) || self.is_leaf_like(sibling))
            {
                sibling
            } else if self.is_leaf_like(current) && self.is_empty_node(sibling) {
                current
            } else {
                break;
            };

            let node = self.take(lifted);
            self.replace(parent, node);
            path.pop();
            current = parent;
        }

        self.hash_up(&path);
        Ok(())
    }

    // Replace the leaf at `index` by the smallest sub-trie holding both it and `new_leaf`.
    fn split_leaf(
        &mut self,
        index: NodeIndex,
        depth: usize,
        other_key: &KeyPath,
        new_leaf: WitnessLeaf,
    ) {
        let key_path = new_leaf.leaf.key_path;
        // the keys differ, so they diverge before the maximum depth. the leaf sits on the path
        // of both keys, so they share at least `depth` bits.
        let divergence = trie::shared_bits(other_key, &key_path);

        let old = self.take(index);
        let old = self.push(old);
        let new = self.push(WitnessNode::Leaf(new_leaf));

        let mut node = if trie::bit_at(&key_path, divergence) {
            WitnessNode::Internal {
                left: old,
                right: new,
            }
        } else {
            WitnessNode::Internal {
                left: new,
                right: old,
            }
        };

        for d in (depth..divergence).rev() {
            let child = self.push(node);
            let empty = self.push(WitnessNode::Empty);
            node = if trie::bit_at(&key_path, d) {
                WitnessNode::Internal {
                    left: empty,
                    right: child,
                }
            } else {
                WitnessNode::Internal {
                    left: child,
                    right: empty,
                }
            };
        }

        self.replace(index, node);
    }

    fn hash_up(&mut self, path: &SeekPath) {
        for (index, _) in path.iter().rev() {
            self.rehash(*index);
        }
    }
}

/// Build a compact trie out of the given leaves and return its root.
///
/// Leaves should all start with the same prefix of len `skip` and be ordered lexicographically by
/// key path, with no duplicates. The root of the resulting sub-trie sits at depth `skip`.
pub fn build_trie<H: NodeHasher>(
    skip: usize,
    leaves: impl IntoIterator<Item = (KeyPath, ValueHash)>,
) -> Node {
    // consider any three leaves, A, B, C in sorted order by key, with different keys.
    // A and B have some number of shared bits n1
    // B and C have some number of shared bits n2
    //
    // n1 cannot equal n2, as there are only 2 keys with shared prefix n and a != b != c.
    // If n1 is less than n2, then B is a leaf at depth n2+1 along its path (always left)
    // If n2 is less than n1, then B is a leaf at depth n1+1 along its path (always right)
    //
    // The first leaf in the list is a leaf on the left of an internal node at depth n, where n
    // is the number of shared bits with the following key. Likewise, the last leaf is on the
    // right of an internal node at depth n, where n is the number of bits shared with the
    // previous key.
    //
    // If the list has a single item, the sub-trie is a single leaf.
    // And if the list is empty, the sub-trie is a terminator.

    // A left-frontier of nodes which still await their right sibling, tagged with their depth
    // relative to `skip`.
    let mut pending_siblings: Vec<(Node, usize)> = Vec::new();

    let mut leaves = leaves.into_iter();
    let mut a: Option<KeyPath> = None;
    let mut b = leaves.next();
    let mut c = leaves.next();

    let common_after_prefix = |k1: &KeyPath, k2: &KeyPath| {
        trie::shared_prefix(
            &k1.view_bits::<Msb0>()[skip..],
            &k2.view_bits::<Msb0>()[skip..],
        )
    };

    while let Some((this_key, this_val)) = b {
        let n1 = a.as_ref().map(|k| common_after_prefix(k, &this_key));
        let n2 = c.as_ref().map(|(k, _)| common_after_prefix(k, &this_key));

        let (depth_after_skip, hash_up_layers) = match (n1, n2) {
            // single value - no hashing required.
            (None, None) => (0, 0),
            // first value, n2 ancestor will be affected by next.
            (None, Some(n2)) => (n2 + 1, 0),
            // last value, hash up to sub-trie root.
            (Some(n1), None) => (n1 + 1, n1 + 1),
            // middle value, hash up to incoming ancestor + 1.
            (Some(n1), Some(n2)) => (core::cmp::max(n1, n2) + 1, n1.saturating_sub(n2)),
        };

        let mut layer = depth_after_skip;
        let mut last_node = H::hash_leaf(&LeafData {
            key_path: this_key,
            value_hash: this_val,
        });

        for bit in this_key.view_bits::<Msb0>()[skip..skip + depth_after_skip]
            .iter()
            .by_vals()
            .rev()
            .take(hash_up_layers)
        {
            let sibling = match pending_siblings.last() {
                Some(&(node, depth)) if depth == layer => {
                    pending_siblings.pop();
                    node
                }
                _ => trie::TERMINATOR,
            };

            let node_data = if bit {
                InternalData {
                    left: sibling,
                    right: last_node,
                }
            } else {
                InternalData {
                    left: last_node,
                    right: sibling,
                }
            };
            last_node = H::hash_internal(&node_data);
            layer -= 1;
        }
        pending_siblings.push((last_node, layer));

        a = Some(this_key);
        b = c;
        c = leaves.next();
    }

    pending_siblings
        .pop()
        .map(|(node, _)| node)
        .unwrap_or(trie::TERMINATOR)
}

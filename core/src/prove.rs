//! Inclusion and non-inclusion of keys within a witness tree.
//!
//! Lookups are read-only: proving any number of keys in any order against the same tree gives
//! the same answers.

use crate::{
    hasher::TrieHasher,
    seek::IncompleteWitness,
    trie::{KeyPath, LeafData},
    witness::{WitnessNode, WitnessTree},
};

/// The evidence for a key being absent from the trie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The key's path ends in an empty sub-trie.
    Terminator,
    /// The key's path ends in a leaf belonging to a different key. The key path of that leaf is
    /// included.
    Leaf(KeyPath),
}

/// The membership of a key, as proven by a witness tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership<'a> {
    /// The key is present. The value is available if the proof carried it; the value hash is
    /// always available.
    Included {
        /// The leaf of the key.
        leaf: &'a LeafData,
        /// The value of the key, if it was carried by the proof.
        value: Option<&'a [u8]>,
    },
    /// The key is provably absent.
    Excluded(Exclusion),
}

impl<'a> Membership<'a> {
    /// Whether the key is included.
    pub fn is_included(&self) -> bool {
        matches!(self, Membership::Included { .. })
    }

    /// The value of an included key, if carried by the proof.
    pub fn value(&self) -> Option<&'a [u8]> {
        match self {
            Membership::Included { value, .. } => *value,
            Membership::Excluded(_) => None,
        }
    }
}

impl<H: TrieHasher> WitnessTree<H> {
    /// Prove the membership of a key.
    ///
    /// Fails with [`IncompleteWitness`] when the key's path reaches a sub-trie the proof did not
    /// expand.
    pub fn prove(&self, key: &[u8]) -> Result<Membership<'_>, IncompleteWitness> {
        self.prove_path(&H::key_path(key))
    }

    /// Prove the membership of an already-hashed key path.
    pub fn prove_path(&self, key_path: &KeyPath) -> Result<Membership<'_>, IncompleteWitness> {
        let seek = self.seek(key_path)?;
        Ok(match self.node(seek.terminal) {
            WitnessNode::Leaf(leaf) if &leaf.leaf.key_path == key_path => Membership::Included {
                leaf: &leaf.leaf,
                value: leaf.value.as_deref(),
            },
            WitnessNode::Leaf(leaf) => Membership::Excluded(Exclusion::Leaf(leaf.leaf.key_path)),
            _ => Membership::Excluded(Exclusion::Terminator),
        })
    }

    /// Check whether this proves that a key has no value in the trie.
    ///
    /// A return value of `Ok(true)` confirms that the key indeed has no value in the trie.
    /// A return value of `Ok(false)` means that the key definitely exists within the trie.
    pub fn confirm_nonexistence(&self, key_path: &KeyPath) -> Result<bool, IncompleteWitness> {
        Ok(!self.prove_path(key_path)?.is_included())
    }

    /// Check whether this proves that a key has exactly the given value hash.
    ///
    /// A return value of `Ok(false)` means that this key has a different value or does not exist.
    pub fn confirm_value(&self, expected_leaf: &LeafData) -> Result<bool, IncompleteWitness> {
        Ok(match self.prove_path(&expected_leaf.key_path)? {
            Membership::Included { leaf, .. } => leaf == expected_leaf,
            Membership::Excluded(_) => false,
        })
    }
}

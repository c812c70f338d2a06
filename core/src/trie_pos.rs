use bitvec::prelude::*;

use crate::trie::{KeyPath, MAX_DEPTH};

/// A position in the trie: a bit-path from the root and a depth.
///
/// The bits after `depth` are always zero, so two positions are equal exactly when they address
/// the same node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriePosition {
    path: [u8; 32],
    depth: usize,
}

impl TriePosition {
    /// Create a new `TriePosition` at the root.
    pub fn new() -> Self {
        TriePosition {
            path: [0; 32],
            depth: 0,
        }
    }

    /// Get the current `depth` of the position.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Get the path to the current position.
    pub fn path(&self) -> &BitSlice<u8, Msb0> {
        &self.path.view_bits::<Msb0>()[..self.depth]
    }

    /// Move the position down by 1, towards either the left or right child.
    ///
    /// Panics on depth out of range.
    pub fn down(&mut self, bit: bool) {
        assert!(self.depth < MAX_DEPTH, "cannot descend below a leaf-level position");
        self.path.view_bits_mut::<Msb0>().set(self.depth, bit);
        self.depth += 1;
    }

    /// Get the position of a child, leaving this one untouched.
    pub fn child(&self, bit: bool) -> Self {
        let mut child = self.clone();
        child.down(bit);
        child
    }

    /// Whether the given key path lies within the sub-trie rooted at this position.
    pub fn contains(&self, key_path: &KeyPath) -> bool {
        self.path() == &key_path.view_bits::<Msb0>()[..self.depth]
    }
}

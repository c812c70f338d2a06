//! Descent through a witness tree along a key path.

use arrayvec::ArrayVec;

use crate::{
    hasher::TrieHasher,
    trie::{self, Hex, KeyPath, MAX_DEPTH},
    witness::{NodeIndex, WitnessNode, WitnessTree},
};

/// The key path left the witnessed region of the trie: the proof did not carry enough
/// data to decide anything about this key.
///
/// This is never the same as non-inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("incomplete tree: key path {} reaches an unexpanded sub-trie at depth {depth}", Hex(.key_path))]
pub struct IncompleteWitness {
    /// The key path being looked up.
    pub key_path: KeyPath,
    /// The depth of the opaque node the lookup reached.
    pub depth: usize,
}

/// The internal nodes visited on the way to a terminal node, root first, tagged with the bit
/// taken at each of them.
pub type SeekPath = ArrayVec<(NodeIndex, bool), MAX_DEPTH>;

/// The result of seeking a key path.
#[derive(Debug, Clone)]
pub struct Seek {
    /// The terminal node: a leaf or an empty node.
    pub terminal: NodeIndex,
    /// The depth of the terminal node.
    pub depth: usize,
    /// The ancestors of the terminal node.
    pub path: SeekPath,
}

impl<H: TrieHasher> WitnessTree<H> {
    /// Descend from the root along `key_path` until a terminal node is found.
    ///
    /// Fails if an opaque node is reached first.
    pub fn seek(&self, key_path: &KeyPath) -> Result<Seek, IncompleteWitness> {
        let mut path = SeekPath::new();
        let mut current = self.root_index();

        loop {
            let depth = path.len();
            match self.node(current) {
                WitnessNode::Internal { left, right } => {
                    // decoding rejects internal nodes at the maximum depth, and updates never
                    // create them, so the depth is in bounds.
                    let bit = trie::bit_at(key_path, depth);
                    path.push((current, bit));
                    current = if bit { *right } else { *left };
                }
                WitnessNode::Hash(_) => {
                    return Err(IncompleteWitness {
                        key_path: *key_path,
                        depth,
                    })
                }
                WitnessNode::Leaf(_) | WitnessNode::Empty => {
                    return Ok(Seek {
                        terminal: current,
                        depth,
                        path,
                    })
                }
            }
        }
    }
}

//! The proof wire format.
//!
//! A proof is the borsh encoding of a sequence of [`ProofNode`]s: a little-endian `u32` count,
//! followed by the nodes in post-order. Each node starts with a one-byte tag.
//!
//! | tag | node      | payload                                   |
//! |-----|-----------|-------------------------------------------|
//! | 0   | Empty     | -                                         |
//! | 1   | Hash      | 32-byte node hash                         |
//! | 2   | Leaf      | 32-byte key path, `u32` length, value     |
//! | 3   | LeafHash  | 32-byte key path, 32-byte value hash      |
//! | 4   | Internal  | - (children are the two preceding nodes)  |
//!
//! Decoding is a single pass with an explicit stack: terminal nodes are pushed, internal nodes pop
//! their right and then left child. Exactly one node must remain at the end.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    hasher::TrieHasher,
    proof::Proof,
    trie::{Hex, KeyPath, LeafData, Node, NodeKind, ValueHash, MAX_DEPTH, TERMINATOR},
    trie_pos::TriePosition,
    witness::{NodeIndex, WitnessLeaf, WitnessNode, WitnessTree},
};

const TAG_INTERNAL: u8 = 4;

// Upper bound on the up-front allocation, whatever node count a proof announces.
const MAX_PREALLOCATED_NODES: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub(crate) enum ProofNode {
    Empty,
    Hash(Node),
    Leaf { key_path: KeyPath, value: Vec<u8> },
    LeafHash { key_path: KeyPath, value_hash: ValueHash },
    Internal,
}

/// Errors in decoding a proof. Any of these means the proof is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The byte stream ended in the middle of the proof.
    #[error("malformed proof: truncated")]
    Truncated,
    /// A node started with an unknown tag.
    #[error("malformed proof: unknown node tag {0}")]
    UnknownTag(u8),
    /// The node count is larger than the remaining bytes could possibly hold.
    #[error("malformed proof: {count} nodes announced, but only {remaining} bytes remain")]
    NodeCountTooLarge {
        /// The announced node count.
        count: usize,
        /// The bytes remaining after the count.
        remaining: usize,
    },
    /// Bytes remain after the announced nodes.
    #[error("malformed proof: {0} trailing bytes")]
    TrailingBytes(usize),
    /// An internal node was encountered with fewer than two nodes to take as children.
    #[error("malformed proof: internal node without two children")]
    StackUnderflow,
    /// The proof contains no nodes.
    #[error("malformed proof: no root node")]
    NoRoot,
    /// More than one node remained at the end of the proof.
    #[error("malformed proof: {0} disconnected nodes")]
    DanglingNodes(usize),
    /// The proof nests nodes deeper than any key path reaches.
    #[error("malformed proof: nodes below the maximum depth")]
    TooDeep,
    /// A leaf sits at a position which its key path does not go through.
    #[error("malformed proof: leaf {} misplaced at depth {depth}", Hex(.key_path))]
    LeafOutOfPosition {
        /// The key path of the leaf.
        key_path: KeyPath,
        /// The depth of the leaf.
        depth: usize,
    },
    /// An internal node whose children should have been compacted into it.
    #[error("malformed proof: uncompacted internal node at depth {depth}")]
    UncompactedInternal {
        /// The depth of the internal node.
        depth: usize,
    },
}

impl<H: TrieHasher> WitnessTree<H> {
    /// Decode proof bytes into a witness tree.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = bytes;
        let count = u32::deserialize(&mut buf).map_err(|_| DecodeError::Truncated)? as usize;

        // every node takes at least its tag byte.
        if count > buf.len() {
            return Err(DecodeError::NodeCountTooLarge {
                count,
                remaining: buf.len(),
            });
        }

        let mut tree = WitnessTree::with_capacity(count.min(MAX_PREALLOCATED_NODES));
        let mut stack: Vec<NodeIndex> = Vec::new();

        for _ in 0..count {
            let tag = *buf.first().ok_or(DecodeError::Truncated)?;
            if tag > TAG_INTERNAL {
                return Err(DecodeError::UnknownTag(tag));
            }

            let node = match ProofNode::deserialize(&mut buf).map_err(|_| DecodeError::Truncated)? {
                ProofNode::Empty => WitnessNode::Empty,
                ProofNode::Hash(hash) if hash == TERMINATOR => WitnessNode::Empty,
                ProofNode::Hash(hash) => WitnessNode::Hash(hash),
                ProofNode::Leaf { key_path, value } => WitnessNode::Leaf(WitnessLeaf {
                    leaf: LeafData {
                        key_path,
                        value_hash: H::hash_value(&value),
                    },
                    value: Some(value),
                }),
                ProofNode::LeafHash {
                    key_path,
                    value_hash,
                } => WitnessNode::Leaf(WitnessLeaf {
                    leaf: LeafData {
                        key_path,
                        value_hash,
                    },
                    value: None,
                }),
                ProofNode::Internal => {
                    let right = stack.pop().ok_or(DecodeError::StackUnderflow)?;
                    let left = stack.pop().ok_or(DecodeError::StackUnderflow)?;
                    WitnessNode::Internal { left, right }
                }
            };

            stack.push(tree.push(node));

            // a node at depth `d` waits on at most `d` left siblings.
            if stack.len() > MAX_DEPTH + 1 {
                return Err(DecodeError::TooDeep);
            }
        }

        if !buf.is_empty() {
            return Err(DecodeError::TrailingBytes(buf.len()));
        }

        let root = match stack.as_slice() {
            [] => return Err(DecodeError::NoRoot),
            [root] => *root,
            dangling => return Err(DecodeError::DanglingNodes(dangling.len())),
        };
        tree.set_root(root);
        tree.check_structure()?;

        Ok(tree)
    }

    /// Encode this tree as a proof. Decoding the result yields a tree with the same root.
    pub fn encode(&self) -> Proof {
        let mut nodes = Vec::new();
        let mut pending = vec![(self.root_index(), false)];

        while let Some((index, expanded)) = pending.pop() {
            match self.node(index) {
                WitnessNode::Empty => nodes.push(ProofNode::Empty),
                WitnessNode::Hash(hash) => nodes.push(ProofNode::Hash(*hash)),
                WitnessNode::Leaf(leaf) => nodes.push(match leaf.value {
                    Some(ref value) => ProofNode::Leaf {
                        key_path: leaf.leaf.key_path,
                        value: value.clone(),
                    },
                    None => ProofNode::LeafHash {
                        key_path: leaf.leaf.key_path,
                        value_hash: leaf.leaf.value_hash,
                    },
                }),
                WitnessNode::Internal { left, right } => {
                    if expanded {
                        nodes.push(ProofNode::Internal);
                    } else {
                        pending.push((index, true));
                        pending.push((*right, false));
                        pending.push((*left, false));
                    }
                }
            }
        }

        encode_nodes(&nodes)
    }

    // Walk the decoded tree top-down, checking every node against its position.
    fn check_structure(&self) -> Result<(), DecodeError> {
        let mut pending = vec![(self.root_index(), TriePosition::new())];

        while let Some((index, pos)) = pending.pop() {
            match self.node(index) {
                WitnessNode::Internal { left, right } => {
                    if pos.depth() >= MAX_DEPTH {
                        return Err(DecodeError::TooDeep);
                    }

                    let compactable = match (self.kind(*left), self.kind(*right)) {
                        (NodeKind::Terminator, NodeKind::Terminator)
                        | (NodeKind::Terminator, NodeKind::Leaf)
                        | (NodeKind::Leaf, NodeKind::Terminator) => true,
                        _ => false,
                    };
                    if compactable {
                        return Err(DecodeError::UncompactedInternal { depth: pos.depth() });
                    }

                    pending.push((*left, pos.child(false)));
                    pending.push((*right, pos.child(true)));
                }
                WitnessNode::Leaf(leaf) => {
                    if !pos.contains(&leaf.leaf.key_path) {
                        return Err(DecodeError::LeafOutOfPosition {
                            key_path: leaf.leaf.key_path,
                            depth: pos.depth(),
                        });
                    }
                }
                WitnessNode::Empty | WitnessNode::Hash(_) => {}
            }
        }

        Ok(())
    }
}

pub(crate) fn encode_nodes(nodes: &[ProofNode]) -> Proof {
    let mut buf = Vec::new();
    // UNWRAP: serializing into a vector never fails.
    nodes.serialize(&mut buf).unwrap();
    Proof::from_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::{encode_nodes, DecodeError, ProofNode};
    use crate::{
        hasher::{Blake3Hasher, NodeHasher, ValueHasher},
        proof::generate_proof,
        trie::{InternalData, LeafData, TERMINATOR},
        witness::{WitnessNode, WitnessTree},
    };

    fn decode(nodes: &[ProofNode]) -> Result<WitnessTree<Blake3Hasher>, DecodeError> {
        WitnessTree::decode(encode_nodes(nodes).as_bytes())
    }

    fn key(first_byte: u8) -> [u8; 32] {
        let mut key_path = [0; 32];
        key_path[0] = first_byte;
        key_path
    }

    #[test]
    fn wire_layout() {
        let bytes = encode_nodes(&[
            ProofNode::Empty,
            ProofNode::Hash([7; 32]),
            ProofNode::Internal,
        ])
        .into_bytes();

        let mut expected = vec![3, 0, 0, 0, 0, 1];
        expected.extend_from_slice(&[7; 32]);
        expected.push(4);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn decode_single_leaf() {
        let tree = decode(&[ProofNode::Leaf {
            key_path: key(1),
            value: b"value".to_vec(),
        }])
        .unwrap();

        let expected = Blake3Hasher::hash_leaf(&LeafData {
            key_path: key(1),
            value_hash: Blake3Hasher::hash_value(b"value"),
        });
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn decode_internal_hashes_children_in_order() {
        let tree = decode(&[
            ProofNode::Hash([0x11; 32]),
            ProofNode::Hash([0x22; 32]),
            ProofNode::Internal,
        ])
        .unwrap();

        let expected = Blake3Hasher::hash_internal(&InternalData {
            left: [0x11; 32],
            right: [0x22; 32],
        });
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.recompute_root(), expected);
    }

    #[test]
    fn terminator_hash_is_normalized() {
        let tree = decode(&[ProofNode::Hash(TERMINATOR)]).unwrap();
        assert_eq!(tree.node(tree.root_index()), &WitnessNode::Empty);
    }

    #[test]
    fn malformed_structure() {
        assert_eq!(decode(&[]).unwrap_err(), DecodeError::NoRoot);
        assert_eq!(
            decode(&[ProofNode::Empty, ProofNode::Hash([1; 32])]).unwrap_err(),
            DecodeError::DanglingNodes(2),
        );
        assert_eq!(
            decode(&[ProofNode::Hash([1; 32]), ProofNode::Internal]).unwrap_err(),
            DecodeError::StackUnderflow,
        );
        assert_eq!(
            decode(&[ProofNode::Empty, ProofNode::Empty, ProofNode::Internal]).unwrap_err(),
            DecodeError::UncompactedInternal { depth: 0 },
        );
        assert_eq!(
            decode(&[
                ProofNode::Empty,
                ProofNode::LeafHash {
                    key_path: key(0b10000000),
                    value_hash: [1; 32],
                },
                ProofNode::Internal,
            ])
            .unwrap_err(),
            DecodeError::UncompactedInternal { depth: 0 },
        );
    }

    #[test]
    fn misplaced_leaf() {
        // a leaf for 0b1.. on the left side of the root.
        let err = decode(&[
            ProofNode::LeafHash {
                key_path: key(0b10000000),
                value_hash: [1; 32],
            },
            ProofNode::Hash([1; 32]),
            ProofNode::Internal,
        ])
        .unwrap_err();

        assert_eq!(
            err,
            DecodeError::LeafOutOfPosition {
                key_path: key(0b10000000),
                depth: 1,
            }
        );
    }

    #[test]
    fn too_deep() {
        // 257 nested internal nodes, always taking the left side.
        let mut nodes = vec![ProofNode::Hash([1; 32])];
        for _ in 0..257 {
            nodes.push(ProofNode::Hash([2; 32]));
            nodes.push(ProofNode::Internal);
        }
        assert_eq!(decode(&nodes).unwrap_err(), DecodeError::TooDeep);
    }

    #[test]
    fn unjoined_nodes_are_bounded() {
        // empty nodes that are never joined pile up; stop once no valid tree could hold them.
        let nodes = vec![ProofNode::Empty; 1000];
        assert_eq!(decode(&nodes).unwrap_err(), DecodeError::TooDeep);

        // a spine of maximum depth keeps exactly 257 nodes pending and is fine.
        let mut nodes = vec![ProofNode::Hash([1; 32]); 257];
        nodes.extend(std::iter::repeat(ProofNode::Internal).take(256));
        assert!(decode(&nodes).is_ok());
    }

    #[test]
    fn malformed_bytes() {
        let good = encode_nodes(&[ProofNode::Hash([5; 32])]).into_bytes();

        assert_eq!(
            WitnessTree::<Blake3Hasher>::decode(&good[..2]).unwrap_err(),
            DecodeError::Truncated,
        );
        assert_eq!(
            WitnessTree::<Blake3Hasher>::decode(&good[..good.len() - 1]).unwrap_err(),
            DecodeError::Truncated,
        );

        let mut trailing = good.clone();
        trailing.push(0);
        assert_eq!(
            WitnessTree::<Blake3Hasher>::decode(&trailing).unwrap_err(),
            DecodeError::TrailingBytes(1),
        );

        let mut bad_tag = good.clone();
        bad_tag[4] = 9;
        assert_eq!(
            WitnessTree::<Blake3Hasher>::decode(&bad_tag).unwrap_err(),
            DecodeError::UnknownTag(9),
        );

        assert_eq!(
            WitnessTree::<Blake3Hasher>::decode(&[0xff, 0xff, 0xff, 0xff, 0]).unwrap_err(),
            DecodeError::NodeCountTooLarge {
                count: u32::MAX as usize,
                remaining: 1,
            },
        );
    }

    #[test]
    fn reencoding_preserves_root() {
        let leaves: Vec<_> = (0u8..16)
            .map(|i| (key(i.wrapping_mul(17)), vec![i]))
            .collect::<std::collections::BTreeMap<_, _>>()
            .into_iter()
            .collect();
        let proof = generate_proof::<Blake3Hasher>(&leaves, &[key(17), key(0b01010101)]);

        let tree = WitnessTree::<Blake3Hasher>::decode(proof.as_bytes()).unwrap();
        let reencoded = tree.encode();
        assert_eq!(reencoded, proof);

        let again = WitnessTree::<Blake3Hasher>::decode(reencoded.as_bytes()).unwrap();
        assert_eq!(again.root(), tree.root());
    }
}

//! Generation of proofs from a complete set of leaves.
//!
//! This is the counterpart of decoding, for use by whatever holds the full trie. It produces the
//! smallest proof in which every requested key can be proven and updated: the sub-tries the
//! requested keys descend into are expanded, lone leaves are given with their key path and value
//! hash, and all other sub-tries are replaced by their hashes.

use crate::{
    hasher::TrieHasher,
    proof::{codec::ProofNode, codec::encode_nodes, Proof},
    trie::{self, KeyPath},
    update::build_trie,
};

/// Generate a proof for the given keys out of the full set of leaves of a trie.
///
/// The leaves must be sorted ascending by key path and contain no duplicate keys. The keys to
/// prove may be in any order and may include keys absent from the trie.
pub fn generate_proof<H: TrieHasher>(leaves: &[(KeyPath, Vec<u8>)], keys: &[KeyPath]) -> Proof {
    debug_assert!(leaves.windows(2).all(|w| w[0].0 < w[1].0));

    let mut keys = keys.to_vec();
    keys.sort_unstable();
    keys.dedup();

    let mut nodes = Vec::new();
    prove_sub_trie::<H>(leaves, &keys, 0, &mut nodes);
    encode_nodes(&nodes)
}

// Emit the nodes of the sub-trie at `depth` holding `leaves` in post-order. All leaves and keys
// share their first `depth` bits.
fn prove_sub_trie<H: TrieHasher>(
    leaves: &[(KeyPath, Vec<u8>)],
    keys: &[KeyPath],
    depth: usize,
    nodes: &mut Vec<ProofNode>,
) {
    match leaves {
        [] => nodes.push(ProofNode::Empty),
        // a lone leaf always carries its key path, requested or not.
        [(key_path, value)] => {
            if keys.binary_search(key_path).is_ok() {
                nodes.push(ProofNode::Leaf {
                    key_path: *key_path,
                    value: value.clone(),
                });
            } else {
                nodes.push(ProofNode::LeafHash {
                    key_path: *key_path,
                    value_hash: H::hash_value(value),
                });
            }
        }
        _ if keys.is_empty() => {
            let root = build_trie::<H>(
                depth,
                leaves
                    .iter()
                    .map(|(key_path, value)| (*key_path, H::hash_value(value))),
            );
            nodes.push(ProofNode::Hash(root));
        }
        _ => {
            // at least two distinct leaves: they must diverge before the maximum depth.
            let leaf_split = leaves.partition_point(|(k, _)| !trie::bit_at(k, depth));
            let key_split = keys.partition_point(|k| !trie::bit_at(k, depth));

            prove_sub_trie::<H>(&leaves[..leaf_split], &keys[..key_split], depth + 1, nodes);
            prove_sub_trie::<H>(&leaves[leaf_split..], &keys[key_split..], depth + 1, nodes);
            nodes.push(ProofNode::Internal);
        }
    }
}

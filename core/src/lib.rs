//! Core operations and types of the witness trie: a compact sparse merkle trie whose proofs can be
//! decoded into partial tries, checked for the inclusion and non-inclusion of keys, and updated in
//! place to follow the root of the full trie.
//!
//! This crate defines the schema and the proof operations in a backend-agnostic manner. Building
//! and storing the full trie is left to the caller; [`update::build_trie`] and
//! [`proof::generate_proof`] are provided as the reference for how such a trie hashes and proves.

pub mod hasher;
pub mod proof;
pub mod prove;
pub mod seek;
pub mod trie;
pub mod trie_pos;
pub mod update;
pub mod witness;

pub use hasher::{KeyHasher, NodeHasher, TrieHasher, ValueHasher};
pub use proof::{DecodeError, Proof};
pub use prove::{Exclusion, Membership};
pub use seek::IncompleteWitness;
pub use trie::{KeyPath, LeafData, Node, ValueHash, TERMINATOR};
pub use update::UpdateError;
pub use witness::{RootMismatch, WitnessLeaf, WitnessNode, WitnessTree};

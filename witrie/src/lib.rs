//! Witness trie verifier.
//!
//! Verifies proofs of a compact sparse merkle trie without access to the trie itself: a proof is
//! decoded into a partial trie, from which the root is computed, keys are proven present or
//! absent, and updates are applied to compute the root the full trie would have afterwards.
//!
//! ```no_run
//! use witrie::{Blake3Hasher, Options, Request, Verifier};
//!
//! # fn main() -> Result<(), witrie::Error> {
//! let verifier = Verifier::<Blake3Hasher>::new(Options::new());
//! let request = Request::from_hex("0x...")?
//!     .prove(b"a".to_vec())
//!     .put(b"a".to_vec(), b"new".to_vec());
//! let verification = verifier.verify(&request)?;
//! println!("new root: {:?}", verification.new_root);
//! # Ok(())
//! # }
//! ```

use std::marker::PhantomData;

use tracing::{debug, trace, warn};

pub use error::Error;
pub use options::Options;
pub use witrie_core::{
    hasher, proof, trie, update, DecodeError, Exclusion, IncompleteWitness, KeyPath, LeafData,
    Membership, Node, Proof, RootMismatch, TrieHasher, ValueHash, WitnessTree, TERMINATOR,
};

#[cfg(feature = "blake3-hasher")]
pub use witrie_core::hasher::Blake3Hasher;
#[cfg(feature = "sha2-hasher")]
pub use witrie_core::hasher::Sha2Hasher;

use witrie_core::trie::Hex;

mod error;
mod options;

/// A value stored under a key.
pub type Value = Vec<u8>;

/// A verification request: a proof, the keys to prove and the updates to apply.
#[derive(Debug, Clone)]
pub struct Request {
    /// The encoded proof.
    pub proof: Proof,
    /// The root the proof must match, if known.
    pub expected_root: Option<Node>,
    /// The keys whose membership should be reported.
    pub keys: Vec<Vec<u8>>,
    /// Updates applied in order after proving the keys. `None` deletes.
    pub updates: Vec<(Vec<u8>, Option<Value>)>,
}

impl Request {
    /// Create a request for a proof, with no keys and no updates.
    pub fn new(proof: Proof) -> Self {
        Request {
            proof,
            expected_root: None,
            keys: Vec::new(),
            updates: Vec::new(),
        }
    }

    /// Create a request for a hex-encoded proof.
    pub fn from_hex(proof: &str) -> Result<Self, Error> {
        Ok(Self::new(Proof::from_hex(proof)?))
    }

    /// Require the proof to match the given root.
    pub fn expect_root(mut self, root: Node) -> Self {
        self.expected_root = Some(root);
        self
    }

    /// Ask for the membership of a key.
    pub fn prove(mut self, key: Vec<u8>) -> Self {
        self.keys.push(key);
        self
    }

    /// Put a value under a key.
    pub fn put(mut self, key: Vec<u8>, value: Value) -> Self {
        self.updates.push((key, Some(value)));
        self
    }

    /// Delete a key.
    pub fn delete(mut self, key: Vec<u8>) -> Self {
        self.updates.push((key, None));
        self
    }
}

/// The membership of a key, in owned form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key is present.
    Present {
        /// The value, if the proof carried it. Leaves given only by their value hash have none.
        value: Option<Value>,
        /// The hash of the value, always known.
        value_hash: ValueHash,
    },
    /// The key is provably absent.
    Absent(Exclusion),
}

impl Lookup {
    /// The value of a present key, if the proof carried it.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Lookup::Present { value, .. } => value.as_deref(),
            Lookup::Absent(_) => None,
        }
    }
}

impl From<Membership<'_>> for Lookup {
    fn from(membership: Membership<'_>) -> Self {
        match membership {
            Membership::Included { leaf, value } => Lookup::Present {
                value: value.map(|v| v.to_vec()),
                value_hash: leaf.value_hash,
            },
            Membership::Excluded(exclusion) => Lookup::Absent(exclusion),
        }
    }
}

/// The outcome of proving a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLookup {
    /// The key.
    pub key: Vec<u8>,
    /// The membership of the key, or the reason it cannot be determined.
    pub result: Result<Lookup, IncompleteWitness>,
}

/// The result of a verification request.
#[derive(Debug, Clone)]
pub struct Verification {
    /// The root computed from the proof.
    pub root: Node,
    /// The lookups of the requested keys, in request order.
    pub lookups: Vec<KeyLookup>,
    /// The root after applying the updates, if any were requested.
    pub new_root: Option<Node>,
}

/// Verifies proofs of tries hashed with `H`.
///
/// A verifier holds no state besides its options. Each call decodes its own witness tree, so a
/// verifier may be shared freely.
pub struct Verifier<H> {
    options: Options,
    _marker: PhantomData<H>,
}

impl<H: TrieHasher> Verifier<H> {
    /// Create a new verifier.
    pub fn new(options: Options) -> Self {
        Verifier {
            options,
            _marker: PhantomData,
        }
    }

    /// Decode a proof into a witness tree, within the configured limits.
    pub fn open(&self, proof: &[u8]) -> Result<WitnessTree<H>, Error> {
        if proof.len() > self.options.max_proof_size {
            warn!(
                size = proof.len(),
                limit = self.options.max_proof_size,
                "rejecting oversized proof"
            );
            return Err(Error::ProofTooLarge {
                size: proof.len(),
                limit: self.options.max_proof_size,
            });
        }

        let tree = WitnessTree::<H>::decode(proof)?;
        debug!(
            nodes = tree.allocated_nodes(),
            root = %Hex(&tree.root()),
            "decoded proof"
        );
        Ok(tree)
    }

    /// Run a verification request: decode the proof, check the root, prove the keys and apply
    /// the updates.
    ///
    /// Keys which cannot be proven are reported per key. Updates are all-or-nothing: if any
    /// update cannot be applied the whole request fails with [`Error::Incomplete`].
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(proof_len = request.proof.as_bytes().len(), keys = request.keys.len(), updates = request.updates.len())
    )]
    pub fn verify(&self, request: &Request) -> Result<Verification, Error> {
        self.check_limits(request)?;

        let tree = self.open(request.proof.as_bytes())?;
        if let Some(expected) = request.expected_root {
            tree.verify_root(expected)?;
        }
        let root = tree.root();

        let lookups = request
            .keys
            .iter()
            .map(|key| {
                let result = tree.prove(key).map(Lookup::from);
                trace!(key = %hex::encode(key), ?result, "proved key");
                KeyLookup {
                    key: key.clone(),
                    result,
                }
            })
            .collect();

        let new_root = if request.updates.is_empty() {
            None
        } else {
            let updates = request
                .updates
                .iter()
                .map(|(key, value)| (key.as_slice(), value.clone()));
            let (_, new_root) = tree.apply(updates)?;
            debug!(
                updates = request.updates.len(),
                new_root = %Hex(&new_root),
                "applied updates"
            );
            Some(new_root)
        };

        Ok(Verification {
            root,
            lookups,
            new_root,
        })
    }

    fn check_limits(&self, request: &Request) -> Result<(), Error> {
        if request.keys.len() > self.options.max_keys {
            warn!(
                count = request.keys.len(),
                limit = self.options.max_keys,
                "rejecting request with too many keys"
            );
            return Err(Error::TooManyKeys {
                count: request.keys.len(),
                limit: self.options.max_keys,
            });
        }

        if request.updates.len() > self.options.max_updates {
            warn!(
                count = request.updates.len(),
                limit = self.options.max_updates,
                "rejecting request with too many updates"
            );
            return Err(Error::TooManyUpdates {
                count: request.updates.len(),
                limit: self.options.max_updates,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Lookup, Options, Proof, Request, Verifier};
    use witrie_core::{hasher::Blake3Hasher, Exclusion, WitnessTree, TERMINATOR};

    #[test]
    fn request_builder_keeps_order() {
        let request = Request::new(Proof::from_bytes(vec![]))
            .prove(b"a".to_vec())
            .put(b"a".to_vec(), b"1".to_vec())
            .delete(b"b".to_vec())
            .prove(b"c".to_vec());

        assert_eq!(request.keys, vec![b"a".to_vec(), b"c".to_vec()]);
        assert_eq!(
            request.updates,
            vec![(b"a".to_vec(), Some(b"1".to_vec())), (b"b".to_vec(), None)]
        );
    }

    #[test]
    fn verify_empty_trie() {
        let proof = WitnessTree::<Blake3Hasher>::empty().encode();
        let verifier = Verifier::<Blake3Hasher>::new(Options::new());

        let verification = verifier
            .verify(
                &Request::new(proof)
                    .expect_root(TERMINATOR)
                    .prove(b"anything".to_vec())
                    .put(b"k".to_vec(), b"v".to_vec()),
            )
            .unwrap();

        assert_eq!(verification.root, TERMINATOR);
        assert_eq!(
            verification.lookups[0].result,
            Ok(Lookup::Absent(Exclusion::Terminator))
        );
        assert!(verification.new_root.is_some());
        assert_ne!(verification.new_root, Some(TERMINATOR));
    }
}

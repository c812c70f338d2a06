//! Trie proofs: their wire format, decoding into a [`WitnessTree`], and generation from a full
//! set of leaves.
//!
//! A proof is a post-order serialization of a partial trie. Every node either expands part of the
//! trie (leaves, empty sub-tries, internal nodes) or stands in for an unexpanded sub-trie by its
//! hash. Decoding a proof yields a [`WitnessTree`], against which keys can be proven and updates
//! applied.
//!
//! [`WitnessTree`]: crate::witness::WitnessTree

use core::fmt;

use crate::{hasher::TrieHasher, witness::WitnessTree};

pub use codec::DecodeError;
pub use generate::generate_proof;

mod codec;
mod generate;

/// Encoded proof bytes.
///
/// Proofs are transported as opaque bytes or as hex strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Wrap raw proof bytes. Nothing is validated until the proof is decoded.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Proof(bytes)
    }

    /// Parse a proof from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s).map(Proof)
    }

    /// Encode the proof as a `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decode this proof into a witness tree.
    pub fn decode<H: TrieHasher>(&self) -> Result<WitnessTree<H>, DecodeError> {
        WitnessTree::decode(&self.0)
    }
}

impl AsRef<[u8]> for Proof {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::Proof;

    #[test]
    fn hex_transport() {
        let proof = Proof::from_bytes(vec![1, 0, 0, 0, 0]);
        assert_eq!(proof.to_hex(), "0x0100000000");
        assert_eq!(proof.to_string(), proof.to_hex());
        assert_eq!(Proof::from_hex("0x0100000000").unwrap(), proof);
        assert_eq!(Proof::from_hex("0100000000").unwrap(), proof);
        assert!(Proof::from_hex("0x0g").is_err());
    }
}

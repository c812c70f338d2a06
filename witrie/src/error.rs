use witrie_core::{DecodeError, IncompleteWitness, RootMismatch, UpdateError};

/// Errors of a verification request.
///
/// [`Error::Incomplete`] is distinct from a key being absent: it means the proof does not carry
/// enough of the trie to decide.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The proof exceeds [`crate::Options::max_proof_size`].
    #[error("proof of {size} bytes exceeds the limit of {limit} bytes")]
    ProofTooLarge { size: usize, limit: usize },
    /// The request proves more keys than [`crate::Options::max_keys`] allows.
    #[error("{count} keys requested, but at most {limit} are allowed")]
    TooManyKeys { count: usize, limit: usize },
    /// The request applies more updates than [`crate::Options::max_updates`] allows.
    #[error("{count} updates requested, but at most {limit} are allowed")]
    TooManyUpdates { count: usize, limit: usize },
    /// The proof was not valid hex.
    #[error("invalid proof hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The proof could not be decoded.
    #[error(transparent)]
    Malformed(#[from] DecodeError),
    /// The proof does not match the expected root.
    #[error(transparent)]
    RootMismatch(#[from] RootMismatch),
    /// An update touches a part of the trie the proof does not expand.
    #[error(transparent)]
    Incomplete(#[from] IncompleteWitness),
}

impl From<UpdateError> for Error {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Incomplete(incomplete) => Error::Incomplete(incomplete),
        }
    }
}

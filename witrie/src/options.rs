/// Options when creating a [`crate::Verifier`].
///
/// These bound the work a single verification may cause. Proofs, key lists and update batches
/// usually come from untrusted callers.
#[derive(Debug, Clone)]
pub struct Options {
    /// The maximum size of an encoded proof, in bytes.
    pub(crate) max_proof_size: usize,
    /// The maximum number of keys proven per request.
    pub(crate) max_keys: usize,
    /// The maximum number of updates applied per request.
    pub(crate) max_updates: usize,
}

impl Options {
    /// Create a new `Options` instance with the default values.
    pub fn new() -> Self {
        Self {
            max_proof_size: 16 * 1024 * 1024,
            max_keys: 65_536,
            max_updates: 65_536,
        }
    }

    /// Set the maximum size of an encoded proof, in bytes.
    ///
    /// Default: 16 MiB.
    pub fn max_proof_size(&mut self, max_proof_size: usize) {
        self.max_proof_size = max_proof_size;
    }

    /// Set the maximum number of keys proven per request.
    ///
    /// Default: 65536.
    pub fn max_keys(&mut self, max_keys: usize) {
        self.max_keys = max_keys;
    }

    /// Set the maximum number of updates applied per request.
    ///
    /// Default: 65536.
    pub fn max_updates(&mut self, max_updates: usize) {
        self.max_updates = max_updates;
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

use std::{collections::BTreeMap, marker::PhantomData, sync::Once};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use witrie::{
    proof::generate_proof,
    update::build_trie,
    KeyPath, Node, Options, Proof, TrieHasher, Verifier,
};

/// Install a tracing subscriber for the test binary. The filter is read from `WITRIE_LOG` and
/// defaults to `info`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .with_env_var("WITRIE_LOG")
            .from_env_lossy();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[allow(dead_code)]
pub fn verifier<H: TrieHasher>() -> Verifier<H> {
    init_tracing();
    Verifier::new(Options::new())
}

/// The full trie, held in memory. Used as the reference the witness trees are checked against.
pub struct MemTrie<H> {
    leaves: BTreeMap<KeyPath, Vec<u8>>,
    _marker: PhantomData<H>,
}

#[allow(dead_code)]
impl<H: TrieHasher> MemTrie<H> {
    pub fn new() -> Self {
        MemTrie {
            leaves: BTreeMap::new(),
            _marker: PhantomData,
        }
    }

    pub fn with_entries<K: AsRef<[u8]>, V: AsRef<[u8]>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let mut trie = Self::new();
        for (key, value) in entries {
            trie.insert(key.as_ref(), value.as_ref());
        }
        trie
    }

    pub fn insert(&mut self, key: &[u8], value: &[u8]) {
        self.leaves.insert(H::key_path(key), value.to_vec());
    }

    pub fn remove(&mut self, key: &[u8]) {
        self.leaves.remove(&H::key_path(key));
    }

    pub fn update(&mut self, key: &[u8], value: Option<&[u8]>) {
        match value {
            Some(value) => self.insert(key, value),
            None => self.remove(key),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.leaves.get(&H::key_path(key)).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn root(&self) -> Node {
        build_trie::<H>(
            0,
            self.leaves
                .iter()
                .map(|(key_path, value)| (*key_path, H::hash_value(value))),
        )
    }

    /// A proof in which every one of `keys` can be proven and updated.
    pub fn proof<K: AsRef<[u8]>>(&self, keys: &[K]) -> Proof {
        let leaves: Vec<_> = self
            .leaves
            .iter()
            .map(|(key_path, value)| (*key_path, value.clone()))
            .collect();
        let key_paths: Vec<_> = keys.iter().map(|k| H::key_path(k.as_ref())).collect();
        generate_proof::<H>(&leaves, &key_paths)
    }
}

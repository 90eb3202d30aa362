//! SHA-256 content fingerprints and hash-map diffing for incremental updates.

use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Compute the 64-char lowercase hex SHA-256 of a byte buffer.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Hash a file's bytes. `None` if the file can't be read.
pub fn file_hash(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(content) => Some(content_hash(&content)),
        Err(err) => {
            tracing::debug!("Failed to hash {}: {}", path.display(), err);
            None
        }
    }
}

/// Result of comparing current file hashes against a stored baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashDiff {
    /// Paths present now but not in the baseline.
    pub added: BTreeSet<String>,
    /// Paths present in both with differing hashes.
    pub modified: BTreeSet<String>,
    /// Paths in the baseline that no longer exist.
    pub deleted: BTreeSet<String>,
}

impl HashDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Paths that need to be parsed again (added ∪ modified).
    pub fn to_reparse(&self) -> BTreeSet<String> {
        self.added.union(&self.modified).cloned().collect()
    }

    /// Paths whose stored entries must be purged before writing: everything
    /// about to be written plus everything removed. Added paths are included
    /// so a stale entry missed by the baseline is never duplicated.
    pub fn to_purge(&self) -> BTreeSet<String> {
        self.to_reparse().union(&self.deleted).cloned().collect()
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// Diff `current` against `stored`.
///
/// The three sets are disjoint, and together with the unchanged paths they
/// cover every key of both maps.
pub fn compare(current: &HashMap<String, String>, stored: &HashMap<String, String>) -> HashDiff {
    let mut diff = HashDiff::default();

    for (path, hash) in current {
        match stored.get(path) {
            None => {
                diff.added.insert(path.clone());
            }
            Some(old) if old != hash => {
                diff.modified.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    for path in stored.keys() {
        if !current.contains_key(path) {
            diff.deleted.insert(path.clone());
        }
    }

    diff
}

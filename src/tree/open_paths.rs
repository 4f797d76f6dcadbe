//! Request-scoped open/closed state for directories

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::node::TreeNode;

/// The set of directories a client currently has expanded.
///
/// The server never keeps this between requests: clients send it with each
/// tree request and get the updated set back from a toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpenPaths(BTreeSet<PathBuf>);

impl OpenPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state: only the root is open
    pub fn with_root(root: &Path) -> Self {
        let mut open = Self::new();
        open.insert(root.to_path_buf());
        open
    }

    /// Every directory in `tree` open
    pub fn all_directories(tree: &TreeNode) -> Self {
        tree.walk()
            .filter(|node| node.is_directory)
            .map(|node| node.absolute_path.clone())
            .collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn insert(&mut self, path: PathBuf) -> bool {
        self.0.insert(path)
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.0.remove(path)
    }

    /// Flip `path`; returns whether it is open afterwards
    pub fn toggle(&mut self, path: &Path) -> bool {
        if self.0.remove(path) {
            false
        } else {
            self.0.insert(path.to_path_buf());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }
}

impl FromIterator<PathBuf> for OpenPaths {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

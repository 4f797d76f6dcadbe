//! Tree node and flattened row types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One filesystem entry in a built tree.
///
/// `id` is assigned in pre-order during a single build and is only meaningful
/// inside the response that carries it. `key` is derived from the absolute
/// path and stays the same across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: u32,
    pub key: String,
    pub name: String,
    /// Path relative to the sandbox root, `/`-joined, empty for the root
    pub path: String,
    pub absolute_path: PathBuf,
    pub is_directory: bool,
    pub depth: usize,
    pub size: u64,
    /// Milliseconds since the Unix epoch
    pub modified_time: u64,
    #[serde(default)]
    pub is_open: bool,
    /// Present iff `is_directory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    pub child_count: usize,
}

impl TreeNode {
    /// Direct children, empty for files
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Number of nodes in this subtree, including `self`
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Pre-order iterator over this subtree
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Find a node by exact absolute path
    pub fn find(&self, absolute_path: &Path) -> Option<&TreeNode> {
        if self.absolute_path == absolute_path {
            return Some(self);
        }
        if !absolute_path.starts_with(&self.absolute_path) {
            return None;
        }
        self.children()
            .iter()
            .find_map(|child| child.find(absolute_path))
    }

    pub fn find_mut(&mut self, absolute_path: &Path) -> Option<&mut TreeNode> {
        if self.absolute_path == absolute_path {
            return Some(self);
        }
        if !absolute_path.starts_with(&self.absolute_path) {
            return None;
        }
        self.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| child.find_mut(absolute_path))
    }
}

/// Pre-order traversal, see [`TreeNode::walk`]
pub struct Walk<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Stable identity for an absolute path (xxh3, 16 hex digits)
pub fn node_key(absolute_path: &Path) -> String {
    let hash = xxhash_rust::xxh3::xxh3_64(absolute_path.to_string_lossy().as_bytes());
    format!("{:016x}", hash)
}

/// A tree node projected into one row of a virtualized list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlattenedRow {
    pub id: u32,
    pub key: String,
    pub name: String,
    pub is_directory: bool,
    pub path: String,
    pub absolute_path: PathBuf,
    pub depth: usize,
    pub is_open: bool,
    pub child_count: usize,
    pub is_visible: bool,
}

impl FlattenedRow {
    pub fn new(node: &TreeNode, is_visible: bool) -> Self {
        Self {
            id: node.id,
            key: node.key.clone(),
            name: node.name.clone(),
            is_directory: node.is_directory,
            path: node.path.clone(),
            absolute_path: node.absolute_path.clone(),
            depth: node.depth,
            is_open: node.is_open,
            child_count: node.child_count,
            is_visible,
        }
    }
}

//! Tree builder
//!
//! Walks the sandbox from scratch on every call. Ids come from one counter
//! shared across the whole traversal and are handed out before a node's
//! children are visited, so the root is `0` and ids follow pre-order.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::node::{node_key, TreeNode};
use super::open_paths::OpenPaths;
use crate::core::error::{Error, Result};
use crate::sandbox::join_components;

/// Build the full tree under `root`.
///
/// Fails if the root is missing, not a directory, or cannot be listed.
/// Problems further down are logged and the affected entry is skipped (or
/// left without children) instead of failing the whole scan.
pub fn build(root: &Path, open: &OpenPaths) -> Result<TreeNode> {
    let metadata = fs::metadata(root).map_err(|e| Error::io_at(root, e))?;
    if !metadata.is_dir() {
        return Err(Error::io_at(
            root,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let mut builder = TreeBuilder { open, next_id: 0 };
    let mut node = builder.node(root, Path::new(""), &metadata);
    let children = builder.children(root, Path::new(""))?;
    node.child_count = children.len();
    node.children = Some(children);

    debug!(root = %root.display(), nodes = builder.next_id, "Built file tree");
    Ok(node)
}

struct TreeBuilder<'a> {
    open: &'a OpenPaths,
    next_id: u32,
}

impl TreeBuilder<'_> {
    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Node without children; directories get theirs filled in by the caller
    fn node(&mut self, absolute: &Path, relative: &Path, metadata: &Metadata) -> TreeNode {
        let is_directory = metadata.is_dir();
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| absolute.to_string_lossy().to_string());

        TreeNode {
            id: self.next_id(),
            key: node_key(absolute),
            name,
            path: join_components(relative),
            absolute_path: absolute.to_path_buf(),
            is_directory,
            depth: relative.components().count(),
            size: metadata.len(),
            modified_time: metadata.modified().map(millis_since_epoch).unwrap_or(0),
            is_open: is_directory && self.open.contains(absolute),
            children: if is_directory { Some(Vec::new()) } else { None },
            child_count: 0,
        }
    }

    fn children(&mut self, dir: &Path, relative: &Path) -> Result<Vec<TreeNode>> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io_at(dir, e))?;
        let mut children = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(dir = %dir.display(), "Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let absolute = entry.path();
            let metadata = match fs::metadata(&absolute) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %absolute.display(), "Skipping entry: {}", e);
                    continue;
                }
            };

            let child_relative = relative.join(entry.file_name());
            let mut node = self.node(&absolute, &child_relative, &metadata);

            if node.is_directory && !is_symlink(&entry) {
                let grandchildren = match self.children(&absolute, &child_relative) {
                    Ok(grandchildren) => grandchildren,
                    Err(e) => {
                        warn!("Cannot list {}: {}", absolute.display(), e);
                        Vec::new()
                    }
                };
                node.child_count = grandchildren.len();
                node.children = Some(grandchildren);
            }

            children.push(node);
        }

        Ok(children)
    }
}

fn is_symlink(entry: &fs::DirEntry) -> bool {
    entry.file_type().map(|t| t.is_symlink()).unwrap_or(false)
}

pub(crate) fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

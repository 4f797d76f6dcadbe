//! Mutation coordinator
//!
//! Applies one structural command against the sandbox and answers with a
//! freshly built tree plus its flattened projection. Nothing is cached: the
//! filesystem is the source of truth and the tree is only rebuilt after a
//! mutation has completed.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::{Error, Result};
use crate::sandbox::Sandbox;
use crate::tree::builder::millis_since_epoch;
use crate::tree::{build, flatten, FlattenedRow, OpenPaths, TreeNode};

/// A consistent tree + rows pair from one scan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub file_tree: TreeNode,
    pub flattened_nodes: Vec<FlattenedRow>,
}

impl Snapshot {
    fn of(file_tree: TreeNode) -> Self {
        let flattened_nodes = flatten(&file_tree);
        Self {
            file_tree,
            flattened_nodes,
        }
    }
}

/// Result of a toggle request
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// False when no directory matched; the snapshot is then unchanged
    pub toggled: bool,
    pub message: String,
    pub open_paths: OpenPaths,
    pub snapshot: Snapshot,
}

/// Result of a create or delete
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub message: String,
    pub snapshot: Snapshot,
}

/// Metadata returned alongside file content
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified_time: DateTime<Utc>,
    /// Lowercased, with the leading dot; empty when there is none
    pub extension: String,
}

impl FileInfo {
    fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Self {
        let modified = metadata.modified().ok();
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            size: metadata.len(),
            modified_time: modified.map(DateTime::<Utc>::from).unwrap_or_default(),
            extension: extension_of(path),
        }
    }

    pub fn modified_millis(&self) -> u64 {
        millis_since_epoch(self.modified_time.into())
    }
}

/// UTF-8 file content with metadata
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content: String,
    pub info: FileInfo,
}

/// An opened file for raw previews, streamed by the caller
#[derive(Debug)]
pub struct RawFile {
    pub path: PathBuf,
    pub file: File,
    pub size: u64,
}

/// Coordinates reads and mutations inside one sandbox
#[derive(Debug, Clone)]
pub struct Explorer {
    sandbox: Sandbox,
}

impl Explorer {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Open state of a fresh session: root open, everything else closed
    pub fn default_open_paths(&self) -> OpenPaths {
        OpenPaths::with_root(self.sandbox.root())
    }

    /// Build and flatten under `open`, or the default state
    pub fn snapshot(&self, open: Option<&OpenPaths>) -> Result<Snapshot> {
        let open = self.open_state(open);
        Ok(Snapshot::of(build(self.sandbox.root(), &open)?))
    }

    /// Every directory in the sandbox, for fully expanded views
    pub fn all_directories(&self) -> Result<OpenPaths> {
        let tree = build(self.sandbox.root(), &OpenPaths::new())?;
        Ok(OpenPaths::all_directories(&tree))
    }

    /// Flip the open state of the directory at `path`.
    ///
    /// An unmatched path (or a file) is not an error: the outcome reports
    /// `toggled == false` and carries the untouched snapshot.
    pub fn toggle(&self, path: &str, open: Option<&OpenPaths>) -> Result<ToggleOutcome> {
        let target = self.sandbox.resolve(path)?;
        let mut open_paths = self.open_state(open);
        let mut tree = build(self.sandbox.root(), &open_paths)?;

        let toggled = match tree.find_mut(&target) {
            Some(node) if node.is_directory => {
                node.is_open = !node.is_open;
                if node.is_open {
                    open_paths.insert(target.clone());
                } else {
                    open_paths.remove(&target);
                }
                true
            }
            _ => false,
        };

        let message = if toggled {
            format!("Toggled {}", self.display(&target))
        } else {
            debug!(path = %target.display(), "Toggle target not found");
            format!("Directory not found: {}", self.display(&target))
        };

        Ok(ToggleOutcome {
            toggled,
            message,
            open_paths,
            snapshot: Snapshot::of(tree),
        })
    }

    /// Create a directory, or write a file (overwriting) after creating its
    /// parents.
    pub fn create(
        &self,
        path: &str,
        content: &str,
        is_directory: bool,
        open: Option<&OpenPaths>,
    ) -> Result<MutationOutcome> {
        let target = self.resolve_below_root(path)?;
        self.sandbox.ensure_contained(&target)?;

        if is_directory {
            fs::create_dir_all(&target).map_err(|e| Error::io_at(&target, e))?;
        } else {
            write_with_parents(&target, content.as_bytes())?;
        }
        info!(path = %target.display(), is_directory, "Created entry");

        let message = if is_directory {
            format!("Directory created: {}", path)
        } else {
            format!("File created: {}", path)
        };

        Ok(MutationOutcome {
            message,
            snapshot: self.snapshot(open)?,
        })
    }

    /// Remove a file, or a directory recursively.
    ///
    /// A symlink is removed itself; its target is left alone.
    pub fn delete(&self, path: &str, open: Option<&OpenPaths>) -> Result<MutationOutcome> {
        let target = self.resolve_below_root(path)?;
        if let Some(parent) = target.parent() {
            self.sandbox.ensure_contained(parent)?;
        }
        let metadata = fs::symlink_metadata(&target).map_err(|e| Error::at_entry(&target, e))?;

        let message = if metadata.is_dir() {
            fs::remove_dir_all(&target).map_err(|e| Error::io_at(&target, e))?;
            "Directory deleted"
        } else {
            fs::remove_file(&target).map_err(|e| Error::io_at(&target, e))?;
            "File deleted"
        };
        info!(path = %target.display(), "{}", message);

        Ok(MutationOutcome {
            message: message.to_string(),
            snapshot: self.snapshot(open)?,
        })
    }

    /// Read a file as UTF-8 text
    pub fn read_content(&self, path: &str) -> Result<FileContent> {
        let RawFile { path, mut file, size } = self.open_raw(path)?;
        let mut bytes = Vec::with_capacity(size as usize);
        file.read_to_end(&mut bytes)
            .map_err(|e| Error::at_entry(&path, e))?;
        let metadata = file.metadata().map_err(|e| Error::io_at(&path, e))?;
        let content = String::from_utf8(bytes).map_err(|_| Error::NotUtf8 { path: path.clone() })?;

        Ok(FileContent {
            content,
            info: FileInfo::from_metadata(&path, &metadata),
        })
    }

    /// Open a file for verbatim reading
    pub fn open_raw(&self, path: &str) -> Result<RawFile> {
        let target = self.sandbox.resolve(path)?;
        self.sandbox.ensure_contained(&target)?;
        let file = File::open(&target).map_err(|e| Error::at_entry(&target, e))?;
        let size = file.metadata().map_err(|e| Error::io_at(&target, e))?.len();
        Ok(RawFile {
            path: target,
            file,
            size,
        })
    }

    /// Overwrite a file from an editor save, creating parents as needed
    pub fn write_content(&self, path: &str, content: &str) -> Result<PathBuf> {
        let target = self.resolve_below_root(path)?;
        self.sandbox.ensure_contained(&target)?;
        write_with_parents(&target, content.as_bytes())?;
        debug!(path = %target.display(), bytes = content.len(), "Wrote file");
        Ok(target)
    }

    /// Resolve a client path whose real location must stay in the sandbox
    pub fn resolve_contained(&self, path: &str) -> Result<PathBuf> {
        let target = self.sandbox.resolve(path)?;
        self.sandbox.ensure_contained(&target)?;
        Ok(target)
    }

    /// The client's open set in sandbox terms. Entries are resolved like any
    /// other client path; blank or escaping entries are dropped.
    fn open_state(&self, open: Option<&OpenPaths>) -> OpenPaths {
        let Some(open) = open else {
            return self.default_open_paths();
        };

        open.iter()
            .filter_map(|entry| {
                let raw = entry.to_string_lossy();
                match self.sandbox.resolve(&raw) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        debug!(entry = %raw, "Ignoring open path: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    fn resolve_below_root(&self, path: &str) -> Result<PathBuf> {
        let target = self.sandbox.resolve(path)?;
        if self.sandbox.is_root(&target) {
            return Err(Error::validation("The sandbox root cannot be modified"));
        }
        Ok(target)
    }

    fn display(&self, path: &Path) -> String {
        let relative = self.sandbox.relative(path);
        if relative.is_empty() {
            "/".to_string()
        } else {
            relative
        }
    }
}

fn write_with_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| Error::io_at(path, e))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

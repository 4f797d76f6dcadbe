//! Sandbox root and request path resolution
//!
//! Every path a client sends goes through [`Sandbox::resolve`]. Absolute
//! paths that already point inside the root are taken as they are; anything
//! else is re-rooted under the sandbox after stripping leading separators.
//! Normalization is lexical, so a path may name an entry that does not exist
//! yet (create) without touching the filesystem.

use crate::core::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// The single directory tree the server may read and write
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Open an existing directory as the sandbox root
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| Error::io_at(root, e))?;

        if !root.is_dir() {
            return Err(Error::ConfigError {
                message: format!("Sandbox root is not a directory: {}", root.display()),
            });
        }

        Ok(Self { root })
    }

    /// Create the root (and parents) if needed, then open it
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| Error::io_at(root, e))?;
        let sandbox = Self::open(root)?;
        info!("Sandbox directory created/verified at: {}", sandbox.root.display());
        Ok(sandbox)
    }

    /// Canonical absolute path of the root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-supplied path to an absolute path inside the sandbox.
    ///
    /// Whitespace is significant: `"note.txt "` and `"note.txt"` are different
    /// entries.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        if raw.trim().is_empty() {
            return Err(Error::validation("Path is required"));
        }

        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            if let Some(inside) = normalize_absolute(candidate) {
                if inside.starts_with(&self.root) {
                    return Ok(inside);
                }
            }
        }

        self.resolve_relative(raw)
    }

    /// Resolve a path relative to the root after stripping leading separators
    pub fn resolve_relative(&self, raw: &str) -> Result<PathBuf> {
        let stripped = raw.trim_start_matches(['/', '\\']);
        let mut resolved = PathBuf::new();

        for component in Path::new(stripped).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(Error::OutsideSandbox {
                            path: PathBuf::from(raw),
                        });
                    }
                }
                // drive prefixes survive the strip on windows
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::OutsideSandbox {
                        path: PathBuf::from(raw),
                    });
                }
            }
        }

        if resolved.as_os_str().is_empty() {
            return Ok(self.root.clone());
        }
        Ok(self.root.join(resolved))
    }

    /// Check that `path` really lives under the root once symlinks are followed.
    ///
    /// The deepest existing ancestor is canonicalized and must stay inside the
    /// root. A dangling link on the way is rejected.
    pub fn ensure_contained(&self, path: &Path) -> Result<()> {
        for ancestor in path.ancestors() {
            if ancestor == self.root.as_path() {
                return Ok(());
            }
            match ancestor.canonicalize() {
                Ok(real) if real.starts_with(&self.root) => return Ok(()),
                Ok(_) => break,
                Err(_) if is_symlink(ancestor) => break,
                Err(_) => continue,
            }
        }

        Err(Error::OutsideSandbox {
            path: path.to_path_buf(),
        })
    }

    /// `/`-joined path of `absolute` relative to the root, empty for the root
    pub fn relative(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.root)
            .map(join_components)
            .unwrap_or_default()
    }

    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

/// Join a relative path's components with `/` regardless of platform
pub(crate) fn join_components(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

fn normalize_absolute(path: &Path) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component.as_os_str())
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
        }
    }
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, Sandbox) {
        let temp = TempDir::new().unwrap();
        let sandbox = Sandbox::open(temp.path()).unwrap();
        (temp, sandbox)
    }

    #[test]
    fn test_open_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = Sandbox::open(temp.path().join("missing"));
        assert!(matches!(result, Err(Error::IoAt { .. })));
    }

    #[test]
    fn test_open_file_as_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(Sandbox::open(&file), Err(Error::ConfigError { .. })));
    }

    #[test]
    fn test_create_makes_nested_root() {
        let temp = TempDir::new().unwrap();
        let sandbox = Sandbox::create(temp.path().join("a").join("user")).unwrap();
        assert!(sandbox.root().is_dir());
        assert!(sandbox.root().ends_with("a/user"));
    }

    #[test]
    fn test_relative_strips_leading_separators() {
        let (_temp, sandbox) = sandbox();
        assert_eq!(
            sandbox.resolve("///notes/todo.md").unwrap(),
            sandbox.root().join("notes").join("todo.md")
        );
        assert_eq!(
            sandbox.resolve("notes/./todo.md").unwrap(),
            sandbox.root().join("notes").join("todo.md")
        );
    }

    #[test]
    fn test_parent_dir_inside_root_is_allowed() {
        let (_temp, sandbox) = sandbox();
        assert_eq!(
            sandbox.resolve("a/b/../c.txt").unwrap(),
            sandbox.root().join("a").join("c.txt")
        );
    }

    #[test]
    fn test_escape_is_rejected() {
        let (_temp, sandbox) = sandbox();
        assert!(matches!(
            sandbox.resolve("../etc/passwd"),
            Err(Error::OutsideSandbox { .. })
        ));
        assert!(matches!(
            sandbox.resolve("a/../../x"),
            Err(Error::OutsideSandbox { .. })
        ));
    }

    #[test]
    fn test_absolute_inside_root_is_kept() {
        let (_temp, sandbox) = sandbox();
        let inside = sandbox.root().join("src").join("main.rs");
        assert_eq!(sandbox.resolve(inside.to_str().unwrap()).unwrap(), inside);
    }

    #[test]
    fn test_absolute_outside_root_is_rerooted() {
        let (_temp, sandbox) = sandbox();
        assert_eq!(
            sandbox.resolve("/etc/passwd").unwrap(),
            sandbox.root().join("etc").join("passwd")
        );
    }

    #[test]
    fn test_absolute_sibling_of_root_stays_inside() {
        let (_temp, sandbox) = sandbox();
        let sneaky = format!("{}/../outside.txt", sandbox.root().display());
        let resolved = sandbox.resolve(&sneaky).unwrap();
        assert!(resolved.starts_with(sandbox.root()));
        assert!(resolved.ends_with("outside.txt"));
        assert_ne!(resolved, sandbox.root().parent().unwrap().join("outside.txt"));
    }

    #[test]
    fn test_slash_alone_is_the_root() {
        let (_temp, sandbox) = sandbox();
        assert_eq!(sandbox.resolve("/").unwrap(), sandbox.root());
        assert_eq!(sandbox.resolve("./").unwrap(), sandbox.root());
    }

    #[test]
    fn test_surrounding_whitespace_is_kept() {
        let (_temp, sandbox) = sandbox();
        assert_eq!(
            sandbox.resolve("note.txt ").unwrap(),
            sandbox.root().join("note.txt ")
        );
        let spaced = sandbox.root().join(" dir ");
        assert_eq!(sandbox.resolve(spaced.to_str().unwrap()).unwrap(), spaced);
    }

    #[test]
    fn test_contained_paths_may_not_exist_yet() {
        let (_temp, sandbox) = sandbox();
        std::fs::create_dir(sandbox.root().join("real")).unwrap();
        assert!(sandbox
            .ensure_contained(&sandbox.root().join("real").join("new").join("f.txt"))
            .is_ok());
        assert!(sandbox.ensure_contained(sandbox.root()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_not_contained() {
        let (_temp, sandbox) = sandbox();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), sandbox.root().join("link")).unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", sandbox.root().join("dangling"))
            .unwrap();

        let through_link = sandbox.resolve("link/secret.txt").unwrap();
        assert!(matches!(
            sandbox.ensure_contained(&through_link),
            Err(Error::OutsideSandbox { .. })
        ));
        assert!(matches!(
            sandbox.ensure_contained(&sandbox.root().join("dangling")),
            Err(Error::OutsideSandbox { .. })
        ));
        // the link entry itself sits inside the root
        assert!(sandbox.ensure_contained(sandbox.root()).is_ok());
    }

    #[test]
    fn test_empty_path_is_validation_error() {
        let (_temp, sandbox) = sandbox();
        assert!(matches!(sandbox.resolve("  "), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_relative_of_root_and_child() {
        let (_temp, sandbox) = sandbox();
        assert_eq!(sandbox.relative(sandbox.root()), "");
        assert_eq!(
            sandbox.relative(&sandbox.root().join("x").join("y.txt")),
            "x/y.txt"
        );
        assert!(sandbox.is_root(sandbox.root()));
    }
}

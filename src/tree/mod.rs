//! File tree materialization
//!
//! A tree is rebuilt from the filesystem on every request and projected into
//! flat rows for the client's virtualized list.

pub mod builder;
pub mod flatten;
pub mod node;
pub mod open_paths;

pub use builder::build;
pub use flatten::{flatten, visible_rows};
pub use node::{node_key, FlattenedRow, TreeNode};
pub use open_paths::OpenPaths;

//! Tree command implementation
//!
//! Prints the sandbox the same way the API projects it.

use clap::Args;
use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::error::Result;
use crate::explorer::Explorer;
use crate::sandbox::Sandbox;
use crate::tree::{visible_rows, FlattenedRow};

/// Arguments for the tree command
#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    filedeck tree                   Root level of ./user
    filedeck tree --open-all        Every directory expanded
    filedeck tree --json            {fileTree, flattenedNodes} as served")]
pub struct TreeArgs {
    /// Sandbox root
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Expand every directory
    #[arg(short = 'a', long)]
    pub open_all: bool,

    /// JSON output
    #[arg(long)]
    pub json: bool,
}

/// Run the tree command
pub fn run(args: TreeArgs) -> Result<()> {
    let config = Config::load()?;
    let root = config.sandbox_root(args.root.as_deref())?;
    let explorer = Explorer::new(Sandbox::open(&root)?);

    let snapshot = if args.open_all {
        let open = explorer.all_directories()?;
        explorer.snapshot(Some(&open))?
    } else {
        explorer.snapshot(None)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", explorer.sandbox().root().display());
    for row in visible_rows(&snapshot.flattened_nodes).skip(1) {
        println!("{}", render_row(row));
    }

    Ok(())
}

fn render_row(row: &FlattenedRow) -> String {
    let indent = "  ".repeat(row.depth.saturating_sub(1));
    let suffix = if row.is_directory { "/" } else { "" };
    format!("{}{}{}", indent, row.name, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build, flatten, OpenPaths};
    use tempfile::TempDir;

    #[test]
    fn test_render_rows_indent_by_depth() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("docs").join("a.md"), "").unwrap();

        let open: OpenPaths = [root.clone(), root.join("docs")].into_iter().collect();
        let rows = flatten(&build(&root, &open).unwrap());
        let rendered: Vec<String> = visible_rows(&rows).skip(1).map(render_row).collect();

        assert_eq!(rendered, vec!["docs/", "  a.md"]);
    }
}

//! Visibility projection for virtualized lists
//!
//! Every node becomes a row, visible or not, so row indexes line up with ids
//! no matter which directories are open. Visibility only tells the client
//! which rows to render.

use super::node::{FlattenedRow, TreeNode};

/// Flatten `root` into pre-order rows.
///
/// The root row is always visible; a child is visible when its parent is
/// visible and open.
pub fn flatten(root: &TreeNode) -> Vec<FlattenedRow> {
    let mut rows = Vec::with_capacity(root.node_count());
    flatten_into(root, true, &mut rows);
    rows
}

fn flatten_into(node: &TreeNode, is_visible: bool, rows: &mut Vec<FlattenedRow>) {
    rows.push(FlattenedRow::new(node, is_visible));

    let children_visible = is_visible && node.is_open;
    for child in node.children() {
        flatten_into(child, children_visible, rows);
    }
}

/// Rows the client should render
pub fn visible_rows(rows: &[FlattenedRow]) -> impl Iterator<Item = &FlattenedRow> {
    rows.iter().filter(|row| row.is_visible)
}

//! The renderable description of one screen, produced by the controller
//! after every event.

use crate::controller::Focus;
use crate::diff::ChangeKind;
use crate::pane::{Column, Layout, PaneRow};
use std::ops::Range;

/// One visible row of the file tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub name: String,
    pub is_directory: bool,
    pub expanded: bool,
    pub selected: bool,
    /// `None` for directories
    pub kind: Option<ChangeKind>,
    pub added: usize,
    pub removed: usize,
}

impl TreeRow {
    /// Indented label with an expansion marker for directories
    pub fn label(&self) -> String {
        let indent = "  ".repeat(self.depth);
        if self.is_directory {
            let marker = if self.expanded { '▾' } else { '▸' };
            format!("{indent}{marker} {}", self.name)
        } else {
            format!("{indent}  {}", self.name)
        }
    }
}

/// A search hit to paint on a pane line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub column: Column,
    pub range: Range<usize>,
    /// This is the match `n`/`N` last moved to
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneLine {
    pub row: PaneRow,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub focus: Focus,
    pub layout: Layout,
    /// Columns taken by the tree, separator included; zero when hidden
    pub tree_width: u16,
    /// Heading shown above the pane
    pub title: String,
    pub tree: Vec<TreeRow>,
    pub pane: Vec<PaneLine>,
    /// Bottom line: search prompt, match position or key hints
    pub status: String,
}

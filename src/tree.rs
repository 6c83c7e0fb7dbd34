//! File tree construction and navigation.
//!
//! Nodes live in a flat arena and refer to each other by index. A file leaf
//! refers to its [`FileDiff`] by index into the document.

use crate::diff::FileDiff;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    /// Index of the file in the document
    File(usize),
}

/// A node in the file tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub expanded: bool,
}

impl TreeNode {
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }
}

/// Navigable hierarchy of changed files with one selected node
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    nodes: Vec<TreeNode>,
    roots: Vec<usize>,
    selected: usize,
    offset: usize,
    height: usize,
}

impl FileTree {
    /// Build the hierarchy from a document's files.
    ///
    /// Children are ordered directories first, then by case-insensitive
    /// name. Every directory starts expanded and the first file is selected.
    pub fn build(files: &[FileDiff]) -> Self {
        let mut tree = FileTree::default();

        for (index, file) in files.iter().enumerate() {
            let parts: Vec<&str> = file.path().split('/').filter(|p| !p.is_empty()).collect();
            tree.insert_path(&parts, index);
        }

        tree.sort();
        tree.selected = tree
            .visible()
            .into_iter()
            .find(|&id| !tree.nodes[id].is_directory())
            .unwrap_or(0);
        tree
    }

    fn insert_path(&mut self, parts: &[&str], file: usize) {
        let mut parent: Option<usize> = None;

        for (depth, part) in parts.iter().enumerate() {
            let is_file = depth + 1 == parts.len();
            let siblings = match parent {
                Some(p) => &self.nodes[p].children,
                None => &self.roots,
            };

            let existing = siblings
                .iter()
                .copied()
                .find(|&id| self.nodes[id].is_directory() && !is_file && self.nodes[id].name == *part);

            let id = match existing {
                Some(id) => id,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(TreeNode {
                        name: part.to_string(),
                        kind: if is_file {
                            NodeKind::File(file)
                        } else {
                            NodeKind::Directory
                        },
                        depth,
                        parent,
                        children: Vec::new(),
                        expanded: true,
                    });
                    match parent {
                        Some(p) => self.nodes[p].children.push(id),
                        None => self.roots.push(id),
                    }
                    id
                }
            };
            parent = Some(id);
        }
    }

    fn sort(&mut self) {
        let nodes = &self.nodes;
        let order = |a: &usize, b: &usize| compare(&nodes[*a], &nodes[*b]);

        let mut roots = self.roots.clone();
        roots.sort_by(order);
        let mut children: Vec<Vec<usize>> = nodes.iter().map(|n| n.children.clone()).collect();
        for list in &mut children {
            list.sort_by(order);
        }

        self.roots = roots;
        for (node, list) in self.nodes.iter_mut().zip(children) {
            node.children = list;
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// The selected file's document index, or `None` on a directory
    pub fn selected_file(&self) -> Option<usize> {
        match self.nodes.get(self.selected)?.kind {
            NodeKind::File(index) => Some(index),
            NodeKind::Directory => None,
        }
    }

    /// Visible nodes in traversal order; children of collapsed directories
    /// are skipped
    pub fn visible(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            out.push(id);
            let node = &self.nodes[id];
            if node.expanded {
                stack.extend(node.children.iter().rev());
            }
        }

        out
    }

    /// All file leaves in traversal order, ignoring expansion
    fn file_order(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_directory() {
                stack.extend(node.children.iter().rev());
            } else {
                out.push(id);
            }
        }

        out
    }

    /// Flip a directory's expansion flag. Leaves are unaffected.
    ///
    /// Collapsing a directory that hides the selection moves the selection
    /// to that directory.
    pub fn toggle_expand(&mut self, id: usize) {
        if let Some(node) = self.nodes.get(id) {
            let expanded = node.expanded;
            self.set_expanded(id, !expanded);
        }
    }

    pub fn set_expanded(&mut self, id: usize, expanded: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if !node.is_directory() {
            return;
        }
        node.expanded = expanded;

        if !expanded && self.is_ancestor(id, self.selected) {
            self.selected = id;
        }
        self.scroll_to_selection();
    }

    fn is_ancestor(&self, ancestor: usize, mut id: usize) -> bool {
        while let Some(parent) = self.nodes.get(id).and_then(|n| n.parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Move the selection by `delta` visible rows, stopping at either end.
    /// Returns whether the selection changed.
    pub fn move_selection(&mut self, delta: isize) -> bool {
        let visible = self.visible();
        let Some(pos) = visible.iter().position(|&id| id == self.selected) else {
            return false;
        };

        let target = pos.saturating_add_signed(delta).min(visible.len() - 1);
        self.select(visible[target])
    }

    /// Select the `row`-th row currently shown in the viewport
    pub fn select_visible(&mut self, row: usize) -> bool {
        match self.visible().get(self.offset + row) {
            Some(&id) => self.select(id),
            None => false,
        }
    }

    /// Select the leaf for a document file, expanding its ancestors
    pub fn select_file(&mut self, file: usize) -> bool {
        let Some(id) = self
            .nodes
            .iter()
            .position(|n| n.kind == NodeKind::File(file))
        else {
            return false;
        };
        self.reveal(id);
        self.select(id)
    }

    /// Jump `delta` files forward or back from the selection, saturating.
    ///
    /// From a directory, moving forward lands on its first file.
    pub fn next_file(&mut self, delta: isize) -> bool {
        let files = self.file_order();
        if files.is_empty() {
            return false;
        }

        let target = match files.iter().position(|&id| id == self.selected) {
            Some(pos) => pos.saturating_add_signed(delta).min(files.len() - 1),
            None => {
                // Directory selected: step from the first file after it
                let visible = self.visible();
                let after = visible
                    .iter()
                    .skip_while(|&&id| id != self.selected)
                    .find_map(|id| files.iter().position(|f| f == id));
                match after {
                    Some(pos) if delta > 0 => pos,
                    Some(pos) => pos.saturating_sub(1),
                    None => files.len() - 1,
                }
            }
        };

        let id = files[target];
        self.reveal(id);
        self.select(id)
    }

    fn reveal(&mut self, id: usize) {
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            self.nodes[parent].expanded = true;
            current = self.nodes[parent].parent;
        }
    }

    fn select(&mut self, id: usize) -> bool {
        let changed = self.selected != id;
        self.selected = id;
        self.scroll_to_selection();
        changed
    }

    /// Number of rows available for the tree; keeps the selection in view
    pub fn set_viewport_height(&mut self, height: usize) {
        self.height = height;
        self.scroll_to_selection();
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn scroll_to_selection(&mut self) {
        let visible = self.visible();
        let pos = visible.iter().position(|&id| id == self.selected).unwrap_or(0);
        let max_offset = visible.len().saturating_sub(self.height);

        if pos < self.offset {
            self.offset = pos;
        } else if self.height > 0 && pos >= self.offset + self.height {
            self.offset = pos + 1 - self.height;
        }
        self.offset = self.offset.min(max_offset);
    }

    /// Node ids inside the viewport
    pub fn rows(&self) -> Vec<usize> {
        self.visible()
            .into_iter()
            .skip(self.offset)
            .take(self.height)
            .collect()
    }
}

/// Directories before files, then case-insensitive name, then exact name
fn compare(a: &TreeNode, b: &TreeNode) -> Ordering {
    b.is_directory()
        .cmp(&a.is_directory())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_paths() -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set("[a-cA-C]{1,2}(/[a-cA-C]{1,2}){0,2}", 1..15)
            .prop_map(|set| set.into_iter().collect())
    }

    fn build(paths: &[String]) -> FileTree {
        let files: Vec<FileDiff> = paths.iter().map(|p| FileDiff::new(p, p)).collect();
        FileTree::build(&files)
    }

    proptest! {
        /// Building twice, or from shuffled input, yields the same traversal
        #[test]
        fn build_is_deterministic(paths in arb_paths(), seed in any::<u64>()) {
            let first = build(&paths);
            let mut shuffled = paths.clone();
            shuffled.rotate_left((seed as usize) % paths.len());
            let second = build(&shuffled);

            let names = |t: &FileTree| -> Vec<(usize, String)> {
                t.visible().iter().map(|&id| (t.nodes[id].depth, t.nodes[id].name.clone())).collect()
            };
            prop_assert_eq!(names(&first), names(&second));
            prop_assert_eq!(names(&first), names(&build(&paths)));
        }

        /// Selection never lands under a collapsed directory
        #[test]
        fn selection_stays_visible(
            paths in arb_paths(),
            ops in prop::collection::vec((any::<bool>(), -3isize..=3), 0..30),
        ) {
            let mut tree = build(&paths);
            for (toggle, delta) in ops {
                if toggle {
                    let visible = tree.visible();
                    let id = visible[(delta.unsigned_abs()) % visible.len()];
                    tree.toggle_expand(id);
                } else {
                    tree.move_selection(delta);
                }
                prop_assert!(tree.visible().contains(&tree.selected()));
            }
        }
    }
}

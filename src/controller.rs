//! The view controller: focus state machine and the only mutator of the
//! tree and pane models.
//!
//! The tree and the pane never refer to each other. Every event goes through
//! [`ViewController::handle`], which updates the focused model and then
//! reconciles the other one (a selection change that lands on a file loads
//! that file into the pane).

use crate::config::{Config, KeyBindings};
use crate::diff::DiffDocument;
use crate::event::{Event, Key, MouseAction};
use crate::frame::{Frame, Highlight, PaneLine, TreeRow};
use crate::keymap::{Action, KeyMap};
use crate::pane::{DiffPane, Layout};
use crate::tree::{FileTree, NodeKind};
use tracing::debug;

/// Rows below the tree and pane reserved for the status line
pub const FOOTER_ROWS: u16 = 1;
/// Rows above the pane content reserved for the file title
pub const TITLE_ROWS: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Pane,
}

/// What the shell should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct ViewController {
    document: DiffDocument,
    tree: FileTree,
    pane: DiffPane,
    keymap: KeyMap,
    focus: Focus,
    layout: Layout,
    tree_hidden: bool,
    /// Search text being typed, when the prompt is open
    prompt: Option<String>,
    preferred_tree_width: u16,
    max_line_len: usize,
    scroll_step: usize,
    /// Status line text when no prompt or search is active
    hints: String,
    width: u16,
    height: u16,
}

impl ViewController {
    pub fn new(document: DiffDocument, layout: Layout, config: &Config) -> Self {
        let tree = FileTree::build(&document.files);
        let mut controller = Self {
            document,
            tree,
            pane: DiffPane::new(layout),
            keymap: KeyMap::new(&config.keys),
            focus: Focus::Tree,
            layout,
            tree_hidden: false,
            prompt: None,
            preferred_tree_width: config.tree_width,
            max_line_len: config.max_intraline_len,
            scroll_step: config.scroll_step.max(1),
            hints: key_hints(&config.keys),
            width: 0,
            height: 0,
        };
        controller.sync_pane();
        controller
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn document(&self) -> &DiffDocument {
        &self.document
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn pane(&self) -> &DiffPane {
        &self.pane
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// Apply one event. Events must be delivered in arrival order.
    pub fn handle(&mut self, event: Event) -> Flow {
        match event {
            Event::Loaded => self.sync_pane(),
            Event::Resize { width, height } => self.resize(width, height),
            Event::Mouse {
                action,
                column,
                row,
            } => self.mouse(action, column, row),
            Event::Key(key) => {
                if self.prompt.is_some() {
                    self.prompt_key(key);
                } else if let Some(action) = self.keymap.action(key) {
                    return self.act(action);
                }
            }
        }
        Flow::Continue
    }

    fn act(&mut self, action: Action) -> Flow {
        match action {
            Action::Quit => return Flow::Quit,
            Action::SwitchFocus => self.switch_focus(),
            Action::ToggleLayout => {
                self.layout = self.layout.toggled();
                self.reload();
            }
            Action::ToggleTree => {
                self.tree_hidden = !self.tree_hidden;
                if self.tree_hidden {
                    self.focus = Focus::Pane;
                }
                self.resize(self.width, self.height);
            }
            Action::NextFile => self.step_file(1),
            Action::PrevFile => self.step_file(-1),
            Action::Search => self.prompt = Some(String::new()),
            Action::NextMatch => {
                self.pane.next_match();
            }
            Action::PrevMatch => {
                self.pane.prev_match();
            }
            _ => match self.focus {
                Focus::Tree => self.tree_action(action),
                Focus::Pane => self.pane_action(action),
            },
        }
        Flow::Continue
    }

    fn switch_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Tree => Focus::Pane,
            Focus::Pane if self.tree_hidden => Focus::Pane,
            Focus::Pane => Focus::Tree,
        };
        debug!(focus = ?self.focus, "switched focus");
    }

    fn tree_action(&mut self, action: Action) {
        let page = self.tree_rows().max(1) as isize;
        let selected = self.tree.selected();

        let changed = match action {
            Action::Up => self.tree.move_selection(-1),
            Action::Down => self.tree.move_selection(1),
            Action::PageUp => self.tree.move_selection(-page),
            Action::PageDown => self.tree.move_selection(page),
            Action::Top => self.tree.move_selection(isize::MIN),
            Action::Bottom => self.tree.move_selection(isize::MAX),
            Action::Left => {
                let (open_directory, parent) = match self.tree.node(selected) {
                    Some(n) => (n.is_directory() && n.expanded, n.parent),
                    None => (false, None),
                };
                // Collapse the directory itself, otherwise the one holding it
                match (open_directory, parent) {
                    (true, _) => self.tree.set_expanded(selected, false),
                    (false, Some(parent)) => self.tree.set_expanded(parent, false),
                    (false, None) => {}
                }
                false
            }
            Action::Right => {
                self.tree.set_expanded(selected, true);
                false
            }
            Action::Select => {
                match self.tree.node(selected).map(|n| n.kind) {
                    Some(NodeKind::Directory) => self.tree.toggle_expand(selected),
                    Some(NodeKind::File(_)) => self.focus = Focus::Pane,
                    None => {}
                }
                false
            }
            _ => false,
        };

        if changed {
            self.sync_pane();
        }
    }

    fn pane_action(&mut self, action: Action) {
        let page = self.pane_rows().max(1) as isize;
        match action {
            Action::Up => self.pane.scroll_by(-1),
            Action::Down => self.pane.scroll_by(1),
            Action::PageUp => self.pane.scroll_by(-page),
            Action::PageDown => self.pane.scroll_by(page),
            Action::Top => self.pane.scroll_to_top(),
            Action::Bottom => self.pane.scroll_to_bottom(),
            _ => {}
        }
    }

    fn step_file(&mut self, delta: isize) {
        if self.tree.next_file(delta) {
            self.sync_pane();
        }
    }

    fn prompt_key(&mut self, key: Key) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };

        match key {
            Key::Enter => {
                let term = std::mem::take(prompt);
                self.prompt = None;
                self.pane.search(&term);
                self.pane.next_match();
            }
            Key::Esc | Key::Ctrl('c') => self.prompt = None,
            Key::Backspace => {
                prompt.pop();
            }
            Key::Char(c) => prompt.push(c),
            _ => {}
        }
    }

    fn mouse(&mut self, action: MouseAction, column: u16, row: u16) {
        let in_tree = column < self.tree_width();

        match action {
            MouseAction::ScrollUp | MouseAction::ScrollDown => {
                let delta: isize = if action == MouseAction::ScrollUp { -1 } else { 1 };
                if in_tree {
                    if self.tree.move_selection(delta) {
                        self.sync_pane();
                    }
                } else {
                    self.pane.scroll_by(delta * self.scroll_step as isize);
                }
            }
            MouseAction::Click if in_tree => {
                self.focus = Focus::Tree;
                if row < self.tree_rows() && self.tree.select_visible(row as usize) {
                    self.sync_pane();
                }
            }
            MouseAction::Click => self.focus = Focus::Pane,
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.tree.set_viewport_height(self.tree_rows() as usize);
        self.pane.set_viewport_height(self.pane_rows() as usize);
        debug!(width, height, "resized");
    }

    /// Load the selected file into the pane if the selection is a file
    fn sync_pane(&mut self) {
        if let Some(index) = self.tree.selected_file() {
            self.pane
                .load_file(&self.document, index, self.layout, self.max_line_len);
        }
    }

    /// Re-render the displayed file, e.g. after a layout change
    fn reload(&mut self) {
        if let Some(index) = self.pane.file().or(self.tree.selected_file()) {
            self.pane
                .load_file(&self.document, index, self.layout, self.max_line_len);
        }
    }

    fn tree_rows(&self) -> u16 {
        self.height.saturating_sub(FOOTER_ROWS)
    }

    fn pane_rows(&self) -> u16 {
        self.height.saturating_sub(FOOTER_ROWS + TITLE_ROWS)
    }

    fn tree_width(&self) -> u16 {
        if self.tree_hidden {
            0
        } else if self.width == 0 {
            self.preferred_tree_width
        } else {
            self.preferred_tree_width.min(self.width / 2)
        }
    }

    /// Describe the current screen
    pub fn frame(&self) -> Frame {
        let tree = if self.tree_hidden {
            Vec::new()
        } else {
            self.tree
                .rows()
                .into_iter()
                .filter_map(|id| self.tree_row(id))
                .collect()
        };

        let pane = self
            .pane
            .visible()
            .map(|(index, row)| PaneLine {
                row: row.clone(),
                highlights: self.highlights(index),
            })
            .collect();

        Frame {
            focus: self.focus,
            layout: self.layout,
            tree_width: self.tree_width(),
            title: self.title(),
            tree,
            pane,
            status: self.status(),
        }
    }

    fn tree_row(&self, id: usize) -> Option<TreeRow> {
        let node = self.tree.node(id)?;
        let file = match node.kind {
            NodeKind::File(index) => self.document.file(index),
            NodeKind::Directory => None,
        };
        let (added, removed) = file.map(|f| f.stats()).unwrap_or_default();

        Some(TreeRow {
            depth: node.depth,
            name: node.name.clone(),
            is_directory: node.is_directory(),
            expanded: node.expanded,
            selected: id == self.tree.selected(),
            kind: file.map(|f| f.kind),
            added,
            removed,
        })
    }

    fn highlights(&self, row: usize) -> Vec<Highlight> {
        let current = self.pane.current_match();
        self.pane
            .matches()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.row == row)
            .map(|(i, m)| Highlight {
                column: m.column,
                range: m.range.clone(),
                current: current == Some(i),
            })
            .collect()
    }

    fn title(&self) -> String {
        let Some(file) = self.pane.file().and_then(|i| self.document.file(i)) else {
            return String::new();
        };

        let (added, removed) = file.stats();
        let path = if file.old_path != file.new_path && !file.old_path.is_empty() {
            format!("{} → {}", file.old_path, file.path())
        } else {
            file.path().to_string()
        };
        format!("{} ({}) +{} -{}", path, file.kind.as_str(), added, removed)
    }

    fn status(&self) -> String {
        if let Some(prompt) = &self.prompt {
            return format!("/{}", prompt);
        }

        match self.pane.term() {
            Some(term) if self.pane.matches().is_empty() => format!("no matches for '{}'", term),
            Some(term) => format!(
                "match {}/{} for '{}'",
                self.pane.current_match().map_or(0, |i| i + 1),
                self.pane.matches().len(),
                term
            ),
            None => self.hints.clone(),
        }
    }
}

/// Hints naming the first key bound to each common action
fn key_hints(keys: &KeyBindings) -> String {
    [
        (&keys.switch_focus, "switch pane"),
        (&keys.toggle_layout, "toggle layout"),
        (&keys.toggle_tree, "toggle tree"),
        (&keys.search, "search"),
        (&keys.quit, "quit"),
    ]
    .into_iter()
    .filter_map(|(names, label)| names.first().map(|key| format!("{key} {label}")))
    .collect::<Vec<_>>()
    .join(" • ")
}

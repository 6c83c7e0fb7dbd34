//! The diff pane: rendered rows of one file, scroll position and search.

use crate::align::align;
use crate::diff::{DiffDocument, FileDiff, Hunk, LineKind};
use std::ops::Range;
use tracing::debug;

pub const BINARY_PLACEHOLDER: &str = "binary file, no preview";
pub const EMPTY_PLACEHOLDER: &str = "no content changes";
pub const TRUNCATED_NOTICE: &str = "hunk truncated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    Unified,
    #[default]
    SideBySide,
}

impl Layout {
    pub fn toggled(self) -> Self {
        match self {
            Layout::Unified => Layout::SideBySide,
            Layout::SideBySide => Layout::Unified,
        }
    }
}

/// How a rendered line should be colored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Context,
    Added,
    Removed,
}

impl From<LineKind> for Intent {
    fn from(kind: LineKind) -> Self {
        match kind {
            LineKind::Context => Intent::Context,
            LineKind::Added => Intent::Added,
            LineKind::Removed => Intent::Removed,
        }
    }
}

impl Intent {
    pub fn marker(self) -> char {
        match self {
            Intent::Context => ' ',
            Intent::Added => '+',
            Intent::Removed => '-',
        }
    }
}

/// One rendered diff line (a whole unified row, or one column of a
/// side-by-side row)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    pub intent: Intent,
    pub old_number: Option<u32>,
    pub new_number: Option<u32>,
    pub text: String,
    /// Intraline change spans (byte ranges into `text`)
    pub spans: Vec<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneRow {
    /// A hunk header line
    Header(String),
    /// Placeholder or marker text that is not part of the diff
    Notice(String),
    /// A unified line
    Line(Side),
    /// A side-by-side row; `None` is padding
    Pair {
        left: Option<Side>,
        right: Option<Side>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Left,
    Right,
}

impl PaneRow {
    /// Searchable text of the row by column
    pub fn texts(&self) -> Vec<(Column, &str)> {
        match self {
            PaneRow::Header(text) | PaneRow::Notice(text) => vec![(Column::Left, text.as_str())],
            PaneRow::Line(side) => vec![(Column::Left, side.text.as_str())],
            PaneRow::Pair { left, right } => {
                let mut out = Vec::with_capacity(2);
                if let Some(side) = left {
                    out.push((Column::Left, side.text.as_str()));
                }
                if let Some(side) = right {
                    out.push((Column::Right, side.text.as_str()));
                }
                out
            }
        }
    }
}

/// A search hit within the rendered rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub row: usize,
    pub column: Column,
    pub range: Range<usize>,
}

/// Displayed content of the selected file
#[derive(Debug, Clone, Default)]
pub struct DiffPane {
    file: Option<usize>,
    layout: Layout,
    rows: Vec<PaneRow>,
    offset: usize,
    height: usize,
    term: Option<String>,
    matches: Vec<Match>,
    current: Option<usize>,
}

impl DiffPane {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Replace the content with `document.files[index]` rendered in `layout`.
    ///
    /// Scroll resets to the top; an active search is re-run on the new rows.
    pub fn load_file(
        &mut self,
        document: &DiffDocument,
        index: usize,
        layout: Layout,
        max_line_len: usize,
    ) {
        self.rows = match document.file(index) {
            Some(file) => render_file(file, layout, max_line_len),
            None => vec![PaneRow::Notice(EMPTY_PLACEHOLDER.to_string())],
        };
        self.file = Some(index);
        self.layout = layout;
        self.offset = 0;

        if let Some(term) = self.term.take() {
            self.search(&term);
        }
        debug!(file = index, ?layout, rows = self.rows.len(), "loaded file into pane");
    }

    pub fn file(&self) -> Option<usize> {
        self.file
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn rows(&self) -> &[PaneRow] {
        &self.rows
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn viewport_height(&self) -> usize {
        self.height
    }

    fn max_offset(&self) -> usize {
        self.rows.len().saturating_sub(self.height)
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.offset = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Rows inside the viewport with their absolute index
    pub fn visible(&self) -> impl Iterator<Item = (usize, &PaneRow)> {
        self.rows
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.height)
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn current_match(&self) -> Option<usize> {
        self.current
    }

    /// Highlight every case-insensitive occurrence of `term`. An empty term
    /// clears the search.
    pub fn search(&mut self, term: &str) {
        self.matches.clear();
        self.current = None;

        if term.is_empty() {
            self.term = None;
            return;
        }

        for (row, content) in self.rows.iter().enumerate() {
            for (column, text) in content.texts() {
                self.matches.extend(
                    find_all(text, term)
                        .into_iter()
                        .map(|range| Match { row, column, range }),
                );
            }
        }
        self.term = Some(term.to_string());
        debug!(term, matches = self.matches.len(), "searched pane");
    }

    /// Advance to the next match, wrapping at the end, and scroll it into
    /// view. Returns the new current match index.
    pub fn next_match(&mut self) -> Option<usize> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }

        let next = match self.current {
            Some(i) => (i + 1) % len,
            None => self
                .matches
                .iter()
                .position(|m| m.row >= self.offset)
                .unwrap_or(0),
        };
        self.focus_match(next)
    }

    /// Step back to the previous match, wrapping at the start
    pub fn prev_match(&mut self) -> Option<usize> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }

        let prev = match self.current {
            Some(i) => (i + len - 1) % len,
            None => {
                let bottom = self.offset + self.height.max(1);
                self.matches
                    .iter()
                    .rposition(|m| m.row < bottom)
                    .unwrap_or(len - 1)
            }
        };
        self.focus_match(prev)
    }

    fn focus_match(&mut self, index: usize) -> Option<usize> {
        let row = self.matches.get(index)?.row;
        self.current = Some(index);
        if row < self.offset || row >= self.offset + self.height {
            self.offset = row.min(self.max_offset());
        }
        Some(index)
    }
}

fn render_file(file: &FileDiff, layout: Layout, max_line_len: usize) -> Vec<PaneRow> {
    if let Some(error) = &file.error {
        return vec![PaneRow::Notice(format!("unparsable diff: {}", error))];
    }
    if file.is_binary() {
        return vec![PaneRow::Notice(BINARY_PLACEHOLDER.to_string())];
    }
    if file.hunks.is_empty() {
        return vec![PaneRow::Notice(EMPTY_PLACEHOLDER.to_string())];
    }

    let mut rows = Vec::new();
    for hunk in &file.hunks {
        rows.push(PaneRow::Header(hunk.header.clone()));
        match layout {
            Layout::Unified => render_unified(hunk, max_line_len, &mut rows),
            Layout::SideBySide => render_split(hunk, max_line_len, &mut rows),
        }
        if hunk.truncated {
            rows.push(PaneRow::Notice(TRUNCATED_NOTICE.to_string()));
        }
    }
    rows
}

fn render_unified(hunk: &Hunk, max_line_len: usize, rows: &mut Vec<PaneRow>) {
    let numbers = line_numbers(hunk);
    let mut spans: Vec<Vec<Range<usize>>> = vec![Vec::new(); hunk.lines.len()];
    for row in align(hunk, max_line_len) {
        for cell in row.left.into_iter().chain(row.right) {
            if !cell.spans.is_empty() {
                spans[cell.line] = cell.spans;
            }
        }
    }

    for ((line, (old, new)), spans) in hunk.lines.iter().zip(numbers).zip(spans) {
        rows.push(PaneRow::Line(Side {
            intent: line.kind.into(),
            old_number: old,
            new_number: new,
            text: line.text.clone(),
            spans,
        }));
    }
}

fn render_split(hunk: &Hunk, max_line_len: usize, rows: &mut Vec<PaneRow>) {
    let numbers = line_numbers(hunk);
    let side = |cell: crate::align::Cell, old_side: bool| {
        let line = &hunk.lines[cell.line];
        let (old, new) = numbers[cell.line];
        Side {
            intent: line.kind.into(),
            old_number: if old_side { old } else { None },
            new_number: if old_side { None } else { new },
            text: line.text.clone(),
            spans: cell.spans,
        }
    };

    for row in align(hunk, max_line_len) {
        rows.push(PaneRow::Pair {
            left: row.left.map(|cell| side(cell, true)),
            right: row.right.map(|cell| side(cell, false)),
        });
    }
}

/// Old and new line numbers of every line in the hunk
fn line_numbers(hunk: &Hunk) -> Vec<(Option<u32>, Option<u32>)> {
    let mut old = hunk.old.start;
    let mut new = hunk.new.start;

    hunk.lines
        .iter()
        .map(|line| match line.kind {
            LineKind::Context => {
                let numbers = (Some(old), Some(new));
                old = old.saturating_add(1);
                new = new.saturating_add(1);
                numbers
            }
            LineKind::Removed => {
                let number = old;
                old = old.saturating_add(1);
                (Some(number), None)
            }
            LineKind::Added => {
                let number = new;
                new = new.saturating_add(1);
                (None, Some(number))
            }
        })
        .collect()
}

/// Non-overlapping case-insensitive occurrences of `needle`
fn find_all(haystack: &str, needle: &str) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;

    while start < haystack.len() {
        match match_len(&haystack[start..], needle) {
            Some(len) if len > 0 => {
                out.push(start..start + len);
                start += len;
            }
            _ => {
                start += haystack[start..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    out
}

/// Byte length of the prefix of `text` equal to `needle` ignoring case
fn match_len(text: &str, needle: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    let mut end = 0;

    for n in needle.chars() {
        let (i, c) = chars.next()?;
        if c != n && !c.to_lowercase().eq(n.to_lowercase()) {
            return None;
        }
        end = i + c.len_utf8();
    }

    Some(end)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::align::DEFAULT_MAX_LINE_LEN;
    use crate::parse::parse_document;
    use similar_asserts::assert_eq;

    const DIFF: &str = r#"diff --git a/src/app.rs b/src/app.rs
--- a/src/app.rs
+++ b/src/app.rs
@@ -10,4 +10,4 @@ impl App {
     fn new() -> Self {
-        let width = 10;
+        let width = 20;
         Self { width }
     }
@@ -40,2 +40,3 @@
 fn helper() {}
+fn added() {}
 fn other() {}
diff --git a/logo.png b/logo.png
Binary files a/logo.png and b/logo.png differ
"#;

    /// `bad` overflows its hunk on line 5; `ok` is well formed
    const MALFORMED: &str = "diff --git a/bad b/bad
@@ -1 +1 @@
-a
+b
+c
diff --git a/ok b/ok
@@ -1 +1 @@
-x
+y
";

    fn loaded(layout: Layout) -> DiffPane {
        let doc = parse_document(DIFF).unwrap();
        let mut pane = DiffPane::new(layout);
        pane.load_file(&doc, 0, layout, DEFAULT_MAX_LINE_LEN);
        pane
    }

    fn unified_text(pane: &DiffPane) -> Vec<String> {
        pane.rows()
            .iter()
            .map(|row| match row {
                PaneRow::Header(text) | PaneRow::Notice(text) => text.clone(),
                PaneRow::Line(side) => format!("{}{}", side.intent.marker(), side.text),
                PaneRow::Pair { .. } => "<pair>".to_string(),
            })
            .collect()
    }

    #[test]
    fn unified_rows_reproduce_hunks() {
        let doc = parse_document(DIFF).unwrap();
        let pane = loaded(Layout::Unified);
        assert_eq!(unified_text(&pane), doc.files[0].unified_lines());
    }

    #[test]
    fn unified_lines_carry_numbers_and_spans() {
        let pane = loaded(Layout::Unified);
        let PaneRow::Line(removed) = &pane.rows()[2] else {
            panic!("expected a line row");
        };

        assert_eq!(removed.intent, Intent::Removed);
        assert_eq!(removed.old_number, Some(11));
        assert_eq!(removed.new_number, None);
        assert_eq!(removed.spans, vec![20..21]);
    }

    #[test]
    fn side_by_side_pairs_changes() {
        let pane = loaded(Layout::SideBySide);
        let rows = pane.rows();

        assert_eq!(rows.len(), 2 + 4 + 3);
        let PaneRow::Pair { left, right } = &rows[2] else {
            panic!("expected a pair row");
        };
        assert_eq!(left.as_ref().unwrap().old_number, Some(11));
        assert_eq!(right.as_ref().unwrap().new_number, Some(11));

        let PaneRow::Pair { left, right } = &rows[7] else {
            panic!("expected a pair row");
        };
        assert_eq!(left, &None);
        assert_eq!(right.as_ref().unwrap().text, "fn added() {}");
    }

    #[test]
    fn binary_file_shows_placeholder() {
        let doc = parse_document(DIFF).unwrap();
        let mut pane = DiffPane::new(Layout::SideBySide);
        pane.load_file(&doc, 1, Layout::SideBySide, DEFAULT_MAX_LINE_LEN);

        assert_eq!(
            pane.rows().to_vec(),
            vec![PaneRow::Notice(BINARY_PLACEHOLDER.to_string())]
        );
    }

    #[test]
    fn scroll_is_clamped() {
        let mut pane = loaded(Layout::Unified);
        pane.set_viewport_height(4);

        pane.scroll_by(-3);
        assert_eq!(pane.offset(), 0);
        pane.scroll_by(100);
        assert_eq!(pane.offset(), pane.rows().len() - 4);

        pane.set_viewport_height(100);
        assert_eq!(pane.offset(), 0);
    }

    #[test]
    fn load_resets_scroll() {
        let doc = parse_document(DIFF).unwrap();
        let mut pane = loaded(Layout::Unified);
        pane.set_viewport_height(2);
        pane.scroll_by(3);
        assert_eq!(pane.offset(), 3);

        pane.load_file(&doc, 0, Layout::SideBySide, DEFAULT_MAX_LINE_LEN);
        assert_eq!(pane.offset(), 0);
        assert_eq!(pane.layout(), Layout::SideBySide);
    }

    #[test]
    fn search_is_case_insensitive_and_covers_both_columns() {
        let mut pane = loaded(Layout::SideBySide);
        pane.search("WIDTH");

        let hits: Vec<(usize, Column)> = pane.matches().iter().map(|m| (m.row, m.column)).collect();
        assert_eq!(
            hits,
            vec![
                (2, Column::Left),
                (2, Column::Right),
                (3, Column::Left),
                (3, Column::Right),
            ]
        );
    }

    #[test]
    fn matches_wrap_in_both_directions() {
        let mut pane = loaded(Layout::Unified);
        pane.set_viewport_height(2);
        pane.search("fn");
        let count = pane.matches().len();
        assert_eq!(count, 4);

        assert_eq!(pane.next_match(), Some(0));
        assert_eq!(pane.prev_match(), Some(count - 1));
        let row = pane.matches()[count - 1].row;
        assert!(pane.offset() <= row && row < pane.offset() + 2);
        assert_eq!(pane.next_match(), Some(0));
        assert_eq!(pane.offset(), 1);
    }

    #[test]
    fn search_survives_reload() {
        let doc = parse_document(DIFF).unwrap();
        let mut pane = loaded(Layout::Unified);
        pane.search("helper");
        assert_eq!(pane.matches().len(), 1);

        pane.load_file(&doc, 0, Layout::SideBySide, DEFAULT_MAX_LINE_LEN);
        assert_eq!(pane.term(), Some("helper"));
        assert_eq!(pane.matches().len(), 2);

        pane.search("");
        assert!(pane.matches().is_empty());
        assert_eq!(pane.term(), None);
    }

    #[test]
    fn line_numbers_saturate_at_the_top_of_the_range() {
        let doc = parse_document(
            "diff --git a/f b/f\n@@ -4294967295,2 +4294967295,2 @@\n a\n b\n",
        )
        .unwrap();
        let mut pane = DiffPane::new(Layout::Unified);
        pane.load_file(&doc, 0, Layout::Unified, DEFAULT_MAX_LINE_LEN);

        let numbers: Vec<(Option<u32>, Option<u32>)> = pane
            .rows()
            .iter()
            .filter_map(|row| match row {
                PaneRow::Line(side) => Some((side.old_number, side.new_number)),
                _ => None,
            })
            .collect();
        assert_eq!(
            numbers,
            vec![
                (Some(u32::MAX), Some(u32::MAX)),
                (Some(u32::MAX), Some(u32::MAX)),
            ]
        );
    }

    #[test]
    fn unparsable_file_renders_error_notice() {
        let doc = parse_document(MALFORMED).unwrap();
        let mut pane = DiffPane::new(Layout::SideBySide);
        pane.load_file(&doc, 0, Layout::SideBySide, DEFAULT_MAX_LINE_LEN);

        assert_eq!(
            pane.rows().to_vec(),
            vec![PaneRow::Notice(
                "unparsable diff: line 5: diff line outside of any hunk".to_string()
            )]
        );
    }

    #[test]
    fn truncated_hunk_is_followed_by_notice() {
        let doc = parse_document("diff --git a/f b/f\n@@ -1,3 +1,3 @@\n a\n-b\n+c\n").unwrap();
        let mut pane = DiffPane::new(Layout::Unified);
        pane.load_file(&doc, 0, Layout::Unified, DEFAULT_MAX_LINE_LEN);

        assert_eq!(
            unified_text(&pane),
            vec!["@@ -1,3 +1,3 @@", " a", "-b", "+c", TRUNCATED_NOTICE]
        );
        assert_eq!(
            pane.rows().last(),
            Some(&PaneRow::Notice(TRUNCATED_NOTICE.to_string()))
        );
    }

    #[test]
    fn find_all_handles_unicode() {
        assert_eq!(find_all("ÄbcäBC", "äb"), vec![0..3, 4..7]);
        assert_eq!(find_all("aaaa", "aa"), vec![0..2, 2..4]);
        assert!(find_all("abc", "abcd").is_empty());
    }
}

//! Side-by-side alignment of a unified hunk.
//!
//! Context lines sit on both sides of the same row. A run of removed lines
//! next to a run of added lines is paired positionally; whatever is left of
//! the longer run gets rows of its own with the other side padded. Paired
//! lines carry intraline spans marking the characters that differ.

use crate::diff::{Hunk, LineKind};
use similar::{Algorithm, DiffTag, capture_diff_slices};
use std::ops::Range;

/// Lines longer than this (in characters) are highlighted as a whole
pub const DEFAULT_MAX_LINE_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Context,
    /// A removed line paired with an added line
    Changed,
    Added,
    Removed,
}

/// One side of an aligned row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Index of the line within [`Hunk::lines`]
    pub line: usize,
    /// Byte ranges of the text that differs from the paired line
    pub spans: Vec<Range<usize>>,
}

impl Cell {
    fn plain(line: usize) -> Self {
        Self {
            line,
            spans: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRow {
    pub kind: RowKind,
    /// Old side, `None` for padding
    pub left: Option<Cell>,
    /// New side, `None` for padding
    pub right: Option<Cell>,
}

/// Align every line of `hunk` into side-by-side rows.
///
/// `max_line_len` bounds the intraline comparison; see
/// [`DEFAULT_MAX_LINE_LEN`].
pub fn align(hunk: &Hunk, max_line_len: usize) -> Vec<AlignedRow> {
    let lines = &hunk.lines;
    let mut rows = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let kind = lines[i].kind;
        if kind == LineKind::Context {
            rows.push(AlignedRow {
                kind: RowKind::Context,
                left: Some(Cell::plain(i)),
                right: Some(Cell::plain(i)),
            });
            i += 1;
            continue;
        }

        let first_end = run_end(hunk, i, kind);
        let opposite = if kind == LineKind::Removed {
            LineKind::Added
        } else {
            LineKind::Removed
        };
        let second_end = run_end(hunk, first_end, opposite);

        let (removed, added) = if kind == LineKind::Removed {
            (i..first_end, first_end..second_end)
        } else {
            (first_end..second_end, i..first_end)
        };

        pair_runs(hunk, removed, added, max_line_len, &mut rows);
        i = second_end;
    }

    rows
}

/// End of the run of `kind` lines starting at `start`
fn run_end(hunk: &Hunk, start: usize, kind: LineKind) -> usize {
    hunk.lines[start..]
        .iter()
        .position(|l| l.kind != kind)
        .map_or(hunk.lines.len(), |n| start + n)
}

fn pair_runs(
    hunk: &Hunk,
    removed: Range<usize>,
    added: Range<usize>,
    max_line_len: usize,
    rows: &mut Vec<AlignedRow>,
) {
    let paired = removed.len().min(added.len());

    for (old, new) in removed.clone().zip(added.clone()) {
        let (old_spans, new_spans) =
            intraline_spans(&hunk.lines[old].text, &hunk.lines[new].text, max_line_len);
        rows.push(AlignedRow {
            kind: RowKind::Changed,
            left: Some(Cell {
                line: old,
                spans: old_spans,
            }),
            right: Some(Cell {
                line: new,
                spans: new_spans,
            }),
        });
    }

    for old in removed.skip(paired) {
        rows.push(AlignedRow {
            kind: RowKind::Removed,
            left: Some(Cell::plain(old)),
            right: None,
        });
    }

    for new in added.skip(paired) {
        rows.push(AlignedRow {
            kind: RowKind::Added,
            left: None,
            right: Some(Cell::plain(new)),
        });
    }
}

/// Byte ranges in `old` and `new` that differ, from a character-level
/// shortest edit script. Lines over `max_len` characters are marked whole.
pub fn intraline_spans(
    old: &str,
    new: &str,
    max_len: usize,
) -> (Vec<Range<usize>>, Vec<Range<usize>>) {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    if old_chars.len() > max_len || new_chars.len() > max_len {
        return (whole(old), whole(new));
    }

    let old_offsets = char_offsets(old);
    let new_offsets = char_offsets(new);
    let mut old_spans = Vec::new();
    let mut new_spans = Vec::new();

    for op in capture_diff_slices(Algorithm::Myers, &old_chars, &new_chars) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            continue;
        }
        push_span(&mut old_spans, &old_offsets, old_range);
        push_span(&mut new_spans, &new_offsets, new_range);
    }

    (old_spans, new_spans)
}

fn whole(text: &str) -> Vec<Range<usize>> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![0..text.len()]
    }
}

/// Byte offset of every character, plus the end of the string
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Convert a character range to bytes and merge it with an adjacent span
fn push_span(spans: &mut Vec<Range<usize>>, offsets: &[usize], chars: Range<usize>) {
    if chars.is_empty() {
        return;
    }
    let bytes = offsets[chars.start]..offsets[chars.end];

    match spans.last_mut() {
        Some(last) if last.end == bytes.start => last.end = bytes.end,
        _ => spans.push(bytes),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::diff::DiffLine;
    use proptest::prelude::*;

    fn arb_kind() -> impl Strategy<Value = LineKind> {
        prop::sample::select(vec![LineKind::Context, LineKind::Added, LineKind::Removed])
    }

    fn arb_hunk() -> impl Strategy<Value = Hunk> {
        prop::collection::vec((arb_kind(), "[a-z ]{0,12}"), 0..40).prop_map(|lines| Hunk {
            header: "@@ -1 +1 @@".to_string(),
            old: crate::diff::LineRange { start: 1, count: 0 },
            new: crate::diff::LineRange { start: 1, count: 0 },
            heading: None,
            lines: lines
                .into_iter()
                .map(|(kind, text)| DiffLine::new(kind, text))
                .collect(),
            truncated: false,
        })
    }

    proptest! {
        /// Every line lands in exactly one row, on the side matching its kind
        #[test]
        fn every_line_appears_once(hunk in arb_hunk()) {
            let rows = align(&hunk, DEFAULT_MAX_LINE_LEN);
            let mut seen = vec![0usize; hunk.lines.len()];

            for row in &rows {
                match row.kind {
                    RowKind::Context => {
                        let line = row.left.as_ref().unwrap().line;
                        prop_assert_eq!(Some(line), row.right.as_ref().map(|c| c.line));
                        seen[line] += 1;
                    }
                    _ => {
                        prop_assert!(row.left.is_some() || row.right.is_some());
                        if let Some(cell) = &row.left {
                            prop_assert_eq!(hunk.lines[cell.line].kind, LineKind::Removed);
                            seen[cell.line] += 1;
                        }
                        if let Some(cell) = &row.right {
                            prop_assert_eq!(hunk.lines[cell.line].kind, LineKind::Added);
                            seen[cell.line] += 1;
                        }
                    }
                }
            }

            prop_assert!(seen.iter().all(|&n| n == 1), "coverage: {:?}", seen);

            let old = hunk.lines.iter().filter(|l| l.kind != LineKind::Added).count();
            let new = hunk.lines.iter().filter(|l| l.kind != LineKind::Removed).count();
            prop_assert!(rows.len() >= old.max(new));
        }

        /// Spans always fall on character boundaries inside the line
        #[test]
        fn spans_are_valid_ranges(old in "\\PC{0,30}", new in "\\PC{0,30}") {
            let (old_spans, new_spans) = intraline_spans(&old, &new, DEFAULT_MAX_LINE_LEN);
            for span in &old_spans {
                prop_assert!(old.get(span.clone()).is_some());
            }
            for span in &new_spans {
                prop_assert!(new.get(span.clone()).is_some());
            }
        }
    }
}

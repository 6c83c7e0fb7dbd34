use super::hunk::{Hunk, LineKind};
use crate::parse::ParseError;
use std::fmt;

/// What happened to a file between the old and new version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Renamed,
    Binary,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
            ChangeKind::Renamed => "renamed",
            ChangeKind::Binary => "binary",
        }
    }

    /// Single-character status shown next to tree entries
    pub fn symbol(&self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Deleted => 'D',
            ChangeKind::Modified => 'M',
            ChangeKind::Renamed => 'R',
            ChangeKind::Binary => 'B',
        }
    }
}

/// A complete diff for a single file.
///
/// Holds the raw extended header so the file can be written back verbatim,
/// and every hunk in input order. A binary file never has hunks.
#[derive(Debug)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    pub kind: ChangeKind,
    /// Header lines (`diff --git`, `index`, `---`, `+++`, ...) as they appeared
    pub header: Vec<String>,
    pub hunks: Vec<Hunk>,
    /// Set when part of this file could not be parsed; the file is shown as
    /// an inert placeholder
    pub error: Option<ParseError>,
}

impl FileDiff {
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            kind: ChangeKind::Modified,
            header: Vec::new(),
            hunks: Vec::new(),
            error: None,
        }
    }

    /// Path used for display and for placing the file in the tree
    pub fn path(&self) -> &str {
        if self.kind == ChangeKind::Deleted || self.new_path.is_empty() {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    pub fn is_binary(&self) -> bool {
        self.kind == ChangeKind::Binary
    }

    /// Counts of (added, removed) lines across all hunks
    pub fn stats(&self) -> (usize, usize) {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .fold((0, 0), |(added, removed), line| match line.kind {
                LineKind::Added => (added + 1, removed),
                LineKind::Removed => (added, removed + 1),
                LineKind::Context => (added, removed),
            })
    }

    /// The hunks flattened back into unified diff lines, headers included
    pub fn unified_lines(&self) -> Vec<String> {
        self.hunks
            .iter()
            .flat_map(|hunk| hunk.to_string().lines().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.header {
            writeln!(f, "{}", line)?;
        }

        for hunk in &self.hunks {
            write!(f, "{}", hunk)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::hunk::DiffLine;
    use similar_asserts::assert_eq;

    fn sample() -> FileDiff {
        let mut file = FileDiff::new("src/lib.rs", "src/lib.rs");
        file.header = vec![
            "diff --git a/src/lib.rs b/src/lib.rs".to_string(),
            "--- a/src/lib.rs".to_string(),
            "+++ b/src/lib.rs".to_string(),
        ];
        let mut hunk = Hunk::from_header("@@ -1,2 +1,2 @@").unwrap();
        hunk.lines = vec![
            DiffLine::new(LineKind::Removed, "old"),
            DiffLine::new(LineKind::Added, "new"),
            DiffLine::new(LineKind::Context, "same"),
        ];
        file.hunks.push(hunk);
        file
    }

    #[test]
    fn stats_count_added_and_removed() {
        assert_eq!(sample().stats(), (1, 1));
    }

    #[test]
    fn deleted_file_uses_old_path() {
        let mut file = FileDiff::new("gone.txt", "");
        file.kind = ChangeKind::Deleted;
        assert_eq!(file.path(), "gone.txt");
    }

    #[test]
    fn unified_lines_flatten_hunks() {
        assert_eq!(
            sample().unified_lines(),
            vec!["@@ -1,2 +1,2 @@", "-old", "+new", " same"]
        );
    }

    #[test]
    fn display_includes_header() {
        insta::assert_snapshot!(sample().to_string(), @r"
        diff --git a/src/lib.rs b/src/lib.rs
        --- a/src/lib.rs
        +++ b/src/lib.rs
        @@ -1,2 +1,2 @@
        -old
        +new
         same
        ");
    }
}

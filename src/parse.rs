//! Parsing of raw diff text into a [`DiffDocument`].
//!
//! The parser is a single line-oriented pass. A file starts at a
//! `diff --git` line (or, for plain `diff -u` output, at a `---` line
//! immediately followed by `+++`), a hunk starts at an `@@` range header, and
//! every other line inside a hunk is classified by its leading marker.
//!
//! # Tolerance
//!
//! - A hunk cut short is kept and flagged `truncated`, whether the next
//!   `@@` header, the next file or the end of input cut it off.
//! - A `commit <sha>` line (from `git log -p` or `git show`) ends the current
//!   file; the commit header and message up to the next file are ignored.
//! - A malformed hunk header, or a body line that does not fit the ranges the
//!   header declared, marks only that file as unparsable; the rest of the
//!   file is skipped and parsing resumes at the next file.
//! - Only an input with no files at all is an error.
//!
//! # Examples
//!
//! ```
//! use diffnav::parse::parse_document;
//! use diffnav::diff::LineKind;
//!
//! let doc = parse_document(
//!     "diff --git a/f.txt b/f.txt\n@@ -1,2 +1,2 @@\n-old line\n+new line\n context\n",
//! )
//! .unwrap();
//! assert_eq!(doc.files.len(), 1);
//! assert_eq!(doc.files[0].hunks[0].lines[0].kind, LineKind::Removed);
//! ```

use crate::diff::{ChangeKind, DiffDocument, DiffLine, FileDiff, Hunk, LineKind};
use error_set::error_set;
use tracing::debug;

error_set! {
    /// Errors from parsing diff text
    ParseError := {
        /// A header or body line could not be understood
        #[display("line {line_number}: {reason}")]
        Malformed { reason: String, line_number: usize },
        /// The input did not contain a single file diff
        #[display("No file diffs found in input")]
        Empty,
    }
}

/// Parse a complete diff into a document.
///
/// # Errors
///
/// Returns [`ParseError::Empty`] if no file could be found in `text`.
/// Localized problems never fail the parse; they are recorded on the
/// affected [`FileDiff`] instead.
pub fn parse_document(text: &str) -> Result<DiffDocument, ParseError> {
    let mut parser = DocumentParser::default();
    let mut lines = text.lines().enumerate().peekable();

    while let Some((index, line)) = lines.next() {
        let next = lines.peek().map(|(_, l)| *l);
        parser.feed(index + 1, line, next);
    }

    let files = parser.finish();
    if files.is_empty() {
        return Err(ParseError::Empty);
    }

    debug!(files = files.len(), "parsed diff");
    Ok(DiffDocument { files })
}

/// Where the parser is within the current file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No file has started yet
    #[default]
    Preamble,
    /// Extended header lines, or between hunks
    Header,
    /// Inside a hunk body
    Body,
    /// Binary payload, ignored until the next file
    Binary,
    /// The file is unparsable, ignored until the next file
    Skip,
}

#[derive(Default)]
struct DocumentParser {
    files: Vec<FileDiff>,
    file: Option<FileDiff>,
    hunk: Option<Hunk>,
    state: State,
    /// The current file was opened by a `diff --git` line
    git_header: bool,
}

impl DocumentParser {
    fn feed(&mut self, number: usize, line: &str, next: Option<&str>) {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            let (old, new) = git_paths(rest);
            self.start_file(FileDiff::new(old, new), true);
            self.push_header(line);
            return;
        }

        if self.state == State::Body && self.feed_body(number, line) {
            return;
        }

        if is_commit_line(line) {
            self.close_file();
            self.git_header = false;
            self.state = State::Preamble;
            return;
        }

        if self.is_plain_file_start(line, next) {
            let old = strip_path(&line[4..], "a/");
            self.start_file(FileDiff::new(old, ""), false);
            self.push_header(line);
            self.mark_dev_null(line);
            return;
        }

        match self.state {
            State::Preamble | State::Binary | State::Skip => {}
            State::Header | State::Body => self.feed_header(number, line),
        }
    }

    /// Handle a line while a hunk is open. Returns `false` when the hunk has
    /// ended and the line still needs to be handled as a header line.
    fn feed_body(&mut self, number: usize, line: &str) -> bool {
        let Some(hunk) = self.hunk.as_mut() else {
            return false;
        };

        if line.starts_with('\\') {
            if let Some(last) = hunk.lines.last_mut() {
                last.missing_newline = true;
            }
            return true;
        }

        if hunk.is_complete() || line.starts_with("@@") {
            self.close_hunk();
            self.state = State::Header;
            return false;
        }

        let kind = match line.chars().next() {
            None => LineKind::Context,
            Some(c) => match LineKind::from_marker(c) {
                Some(kind) => kind,
                None => {
                    self.close_hunk();
                    self.state = State::Header;
                    return false;
                }
            },
        };

        if !hunk.accepts(kind) {
            let reason = format!(
                "{} line does not fit hunk header '{}'",
                kind_name(kind),
                hunk.header
            );
            self.fail(number, reason);
            return true;
        }

        let text = line.get(1..).unwrap_or_default();
        hunk.lines.push(DiffLine::new(kind, text));
        true
    }

    fn feed_header(&mut self, number: usize, line: &str) {
        let has_hunks = self.file.as_ref().is_some_and(|f| !f.hunks.is_empty());

        if line.starts_with("@@") {
            match Hunk::from_header(line) {
                Some(hunk) => {
                    self.hunk = Some(hunk);
                    self.state = State::Body;
                }
                None => self.fail(number, format!("invalid hunk header '{}'", line)),
            }
            return;
        }

        if has_hunks {
            if line.starts_with(['+', '-', ' ']) {
                self.fail(number, "diff line outside of any hunk".to_string());
            }
            return;
        }

        let Some(file) = self.file.as_mut() else {
            return;
        };

        if let Some(path) = line.strip_prefix("--- ") {
            if !is_dev_null(path) {
                file.old_path = strip_path(path, "a/");
            }
            self.mark_dev_null(line);
        } else if let Some(path) = line.strip_prefix("+++ ") {
            if !is_dev_null(path) {
                file.new_path = strip_path(path, "b/");
            }
            self.mark_dev_null(line);
        } else if line.starts_with("new file mode") {
            file.kind = ChangeKind::Added;
        } else if line.starts_with("deleted file mode") {
            file.kind = ChangeKind::Deleted;
        } else if let Some(path) = line
            .strip_prefix("rename from ")
            .or_else(|| line.strip_prefix("copy from "))
        {
            file.old_path = path.to_string();
            file.kind = ChangeKind::Renamed;
        } else if let Some(path) = line
            .strip_prefix("rename to ")
            .or_else(|| line.strip_prefix("copy to "))
        {
            file.new_path = path.to_string();
            file.kind = ChangeKind::Renamed;
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            file.kind = ChangeKind::Binary;
            self.state = State::Binary;
        }

        self.push_header(line);
    }

    /// A `---` line directly followed by `+++` opens a new file, unless it is
    /// the path header of a git file that has no hunks yet
    fn is_plain_file_start(&self, line: &str, next: Option<&str>) -> bool {
        if !line.starts_with("--- ") || !next.is_some_and(|n| n.starts_with("+++ ")) {
            return false;
        }

        match &self.file {
            None => true,
            Some(file) => {
                !self.git_header
                    || !file.hunks.is_empty()
                    || matches!(self.state, State::Binary | State::Skip)
            }
        }
    }

    fn mark_dev_null(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if file.kind == ChangeKind::Binary {
            return;
        }
        if line.strip_prefix("--- ").is_some_and(is_dev_null) {
            file.kind = ChangeKind::Added;
        } else if line.strip_prefix("+++ ").is_some_and(is_dev_null) {
            file.kind = ChangeKind::Deleted;
        }
    }

    fn push_header(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut() {
            file.header.push(line.to_string());
        }
    }

    fn start_file(&mut self, file: FileDiff, git_header: bool) {
        self.close_file();
        self.file = Some(file);
        self.git_header = git_header;
        self.state = State::Header;
    }

    fn close_hunk(&mut self) {
        let Some(mut hunk) = self.hunk.take() else {
            return;
        };

        if !hunk.is_complete() {
            debug!(header = %hunk.header, "hunk ended early, keeping it as truncated");
            hunk.truncated = true;
        }

        if let Some(file) = self.file.as_mut() {
            file.hunks.push(hunk);
        }
    }

    fn close_file(&mut self) {
        self.close_hunk();
        if let Some(file) = self.file.take() {
            self.files.push(file);
        }
    }

    /// Mark the current file unparsable and skip the rest of it
    fn fail(&mut self, line_number: usize, reason: String) {
        debug!(line_number, %reason, "file is unparsable");
        self.hunk = None;
        self.state = State::Skip;
        if let Some(file) = self.file.as_mut() {
            file.error = Some(ParseError::Malformed {
                reason,
                line_number,
            });
        }
    }

    fn finish(mut self) -> Vec<FileDiff> {
        self.close_file();
        self.files
    }
}

fn kind_name(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Context => "context",
        LineKind::Added => "added",
        LineKind::Removed => "removed",
    }
}

/// `commit <sha>` as printed by `git log` and `git show`
fn is_commit_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("commit ") else {
        return false;
    };
    let sha = rest.split(' ').next().unwrap_or_default();
    sha.len() >= 7 && sha.chars().all(|c| c.is_ascii_hexdigit())
}

/// Split `a/old b/new` from a `diff --git` line
fn git_paths(rest: &str) -> (String, String) {
    let rest = rest.trim_matches('"');
    let Some(rest) = rest.strip_prefix("a/") else {
        return (rest.to_string(), rest.to_string());
    };

    // Prefer the split that yields identical halves so paths containing
    // " b/" survive when the file was not renamed
    let len = rest.len();
    if len >= 3 && (len - 3) % 2 == 0 {
        let half = (len - 3) / 2;
        if rest.get(half..half + 3) == Some(" b/") && rest[..half] == rest[half + 3..] {
            return (rest[..half].to_string(), rest[half + 3..].to_string());
        }
    }

    match rest.split_once(" b/") {
        Some((old, new)) => (old.to_string(), new.trim_matches('"').to_string()),
        None => (rest.to_string(), rest.to_string()),
    }
}

/// Drop the `a/` or `b/` prefix and any tab-separated timestamp
fn strip_path(path: &str, prefix: &str) -> String {
    let path = path.split('\t').next().unwrap_or(path).trim_matches('"');
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

fn is_dev_null(path: &str) -> bool {
    path.split('\t').next() == Some("/dev/null")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::LineRange;
    use similar_asserts::assert_eq;

    fn kinds(hunk: &Hunk) -> Vec<LineKind> {
        hunk.lines.iter().map(|l| l.kind).collect()
    }

    #[test]
    fn parse_minimal_git_diff() {
        let doc = parse_document(
            "diff --git a/f.txt b/f.txt\n@@ -1,2 +1,2 @@\n-old line\n+new line\n context\n",
        )
        .unwrap();

        assert_eq!(doc.files.len(), 1);
        let file = &doc.files[0];
        assert_eq!(file.path(), "f.txt");
        assert_eq!(file.kind, ChangeKind::Modified);
        assert_eq!(file.hunks.len(), 1);
        assert_eq!(
            kinds(&file.hunks[0]),
            vec![LineKind::Removed, LineKind::Added, LineKind::Context]
        );
        assert_eq!(file.hunks[0].lines[2].text, "context");
        assert!(!file.hunks[0].truncated);
    }

    #[test]
    fn parse_multiple_files_and_hunks() {
        let text = r#"diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
@@ -140,0 +142 @@ outputs
+        ./flake-modules/home-manager.nix
diff --git a/zsh.nix b/zsh.nix
index 6f2e06d..110fff0 100644
--- a/zsh.nix
+++ b/zsh.nix
@@ -15 +14,0 @@ line 14
-      enableAutosuggestions = true;
"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files.len(), 2);
        assert_eq!(doc.files[0].hunks.len(), 2);
        assert_eq!(doc.files[0].hunks[1].heading.as_deref(), Some("outputs"));
        assert_eq!(doc.files[1].path(), "zsh.nix");
        assert_eq!(doc.files[1].hunks[0].old, LineRange { start: 15, count: 1 });
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn parse_new_and_deleted_files() {
        let text = r#"diff --git a/new.txt b/new.txt
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new.txt
@@ -0,0 +1 @@
+hello
diff --git a/old.txt b/old.txt
deleted file mode 100644
index e69de29..0000000
--- a/old.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files[0].kind, ChangeKind::Added);
        assert_eq!(doc.files[0].path(), "new.txt");
        assert_eq!(doc.files[1].kind, ChangeKind::Deleted);
        assert_eq!(doc.files[1].path(), "old.txt");
    }

    #[test]
    fn parse_rename_without_content() {
        let text = r#"diff --git a/src/old name.rs b/src/new name.rs
similarity index 100%
rename from src/old name.rs
rename to src/new name.rs
"#;
        let doc = parse_document(text).unwrap();
        let file = &doc.files[0];

        assert_eq!(file.kind, ChangeKind::Renamed);
        assert_eq!(file.old_path, "src/old name.rs");
        assert_eq!(file.new_path, "src/new name.rs");
        assert!(file.hunks.is_empty());
    }

    #[test]
    fn parse_binary_file_has_no_hunks() {
        let text = r#"diff --git a/logo.png b/logo.png
index 1111111..2222222 100644
Binary files a/logo.png and b/logo.png differ
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-a
+b
"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files.len(), 2);
        assert!(doc.files[0].is_binary());
        assert!(doc.files[0].hunks.is_empty());
        assert_eq!(doc.files[1].hunks.len(), 1);
    }

    #[test]
    fn parse_git_binary_patch_skips_payload() {
        let text = r#"diff --git a/a.bin b/a.bin
GIT binary patch
literal 4
LcmZ?wWMlvU00aO5

literal 0
HcmV?d00001

"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files.len(), 1);
        assert!(doc.files[0].is_binary());
        assert!(doc.files[0].error.is_none());
    }

    #[test]
    fn parse_plain_unified_diff() {
        let text = "--- a.txt\t2024-01-01 00:00:00\n+++ a.txt\t2024-01-02 00:00:00\n@@ -1 +1 @@\n-x\n+y\n--- b.txt\n+++ b.txt\n@@ -1 +1 @@\n-p\n+q\n";
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files.len(), 2);
        assert_eq!(doc.files[0].path(), "a.txt");
        assert_eq!(doc.files[1].path(), "b.txt");
    }

    #[test]
    fn trailing_incomplete_hunk_is_truncated() {
        let text = "diff --git a/f b/f\n@@ -1,3 +1,3 @@\n a\n-b\n";
        let doc = parse_document(text).unwrap();
        let hunk = &doc.files[0].hunks[0];

        assert!(hunk.truncated);
        assert_eq!(hunk.lines.len(), 2);
        assert!(doc.files[0].error.is_none());
    }

    #[test]
    fn hunk_cut_off_by_next_header_is_truncated() {
        let text = "diff --git a/f b/f\n@@ -1,3 +1,3 @@\n a\n@@ -10 +10 @@\n-x\n+y\n";
        let doc = parse_document(text).unwrap();
        let file = &doc.files[0];

        assert!(file.error.is_none());
        assert_eq!(file.hunks.len(), 2);
        assert!(file.hunks[0].truncated);
        assert!(!file.hunks[1].truncated);
    }

    #[test]
    fn overflowing_hunk_marks_only_that_file() {
        let text = r#"diff --git a/bad b/bad
@@ -1 +1 @@
-a
+b
+c
diff --git a/good b/good
@@ -1 +1 @@
-a
+b
"#;
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files.len(), 2);
        assert!(matches!(
            doc.files[0].error,
            Some(ParseError::Malformed { line_number: 5, .. })
        ));
        assert!(doc.files[1].error.is_none());
        assert_eq!(doc.files[1].hunks.len(), 1);
    }

    #[test]
    fn malformed_hunk_header_is_localized() {
        let text = "diff --git a/f b/f\n@@ -x +1 @@\n+a\n";
        let doc = parse_document(text).unwrap();

        assert!(matches!(
            &doc.files[0].error,
            Some(ParseError::Malformed { line_number: 2, reason }) if reason.contains("invalid hunk header")
        ));
    }

    #[test]
    fn no_newline_marker_attaches_to_previous_line() {
        let text = "diff --git a/f b/f\n@@ -1 +1 @@\n-a\n\\ No newline at end of file\n+a\n";
        let doc = parse_document(text).unwrap();
        let lines = &doc.files[0].hunks[0].lines;

        assert!(lines[0].missing_newline);
        assert!(!lines[1].missing_newline);
        assert_eq!(doc.to_string(), text);
    }

    #[test]
    fn preamble_is_ignored() {
        let text = "commit 0123abc\nAuthor: Someone\n\n    message\n\ndiff --git a/f b/f\n@@ -1 +1 @@\n-a\n+b\n";
        let doc = parse_document(text).unwrap();

        assert_eq!(doc.files.len(), 1);
        assert_eq!(doc.files[0].path(), "f");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_document(""), Err(ParseError::Empty)));
        assert!(matches!(
            parse_document("just some text\n"),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn commit_headers_between_files_are_ignored() {
        let log = "\
commit 1111111111111111111111111111111111111111
Author: Test User <test@example.com>
Date:   Fri Feb 13 23:31:30 2009 +0000

    second commit message

diff --git a/f b/f
index 1111111..2222222 100644
--- a/f
+++ b/f
@@ -1 +1 @@
-a
+b

commit 2222222222222222222222222222222222222222 (tag: v1)
Author: Test User <test@example.com>
Date:   Fri Feb 13 23:31:00 2009 +0000

    first commit message
     indented further

diff --git a/g b/g
new file mode 100644
--- /dev/null
+++ b/g
@@ -0,0 +1 @@
+g
";
        let doc = parse_document(log).unwrap();
        let summary: Vec<(&str, ChangeKind, usize, bool)> = doc
            .files
            .iter()
            .map(|f| (f.path(), f.kind, f.hunks.len(), f.error.is_some()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("f", ChangeKind::Modified, 1, false),
                ("g", ChangeKind::Added, 1, false),
            ]
        );
        assert_eq!(kinds(&doc.files[0].hunks[0]), vec![LineKind::Removed, LineKind::Added]);
        assert!(!doc.files[0].hunks[0].truncated);
    }

    #[test]
    fn commit_line_requires_a_sha() {
        assert!(is_commit_line("commit 0123abc"));
        assert!(is_commit_line("commit 0123abcdef (HEAD -> main)"));
        assert!(!is_commit_line("commit message"));
        assert!(!is_commit_line("commit 12"));
    }

    #[test]
    fn git_paths_with_spaces() {
        assert_eq!(
            git_paths("a/x b/y.txt b/x b/y.txt"),
            ("x b/y.txt".to_string(), "x b/y.txt".to_string())
        );
        assert_eq!(
            git_paths("a/old.rs b/new.rs"),
            ("old.rs".to_string(), "new.rs".to_string())
        );
    }
}

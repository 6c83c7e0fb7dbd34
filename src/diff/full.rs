use super::file::FileDiff;

/// A complete diff containing changes for multiple files.
///
/// Built once by [`crate::parse::parse_document`] and read-only afterwards;
/// everything else refers to its files by index.
#[derive(Debug)]
pub struct DiffDocument {
    pub files: Vec<FileDiff>,
}

impl DiffDocument {
    pub fn file(&self, index: usize) -> Option<&FileDiff> {
        self.files.get(index)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl std::fmt::Display for DiffDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for file_diff in &self.files {
            write!(f, "{}", file_diff)?;
        }
        Ok(())
    }
}

pub mod file;
pub mod full;
pub mod hunk;

pub use file::{ChangeKind, FileDiff};
pub use full::DiffDocument;
pub use hunk::{DiffLine, Hunk, LineKind, LineRange};

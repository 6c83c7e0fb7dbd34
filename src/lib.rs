//! diffnav: an interactive pager for unified diffs with a file tree.
//!
//! The core is pure: [`parse::parse_document`] turns diff text into a
//! [`DiffDocument`], and a [`ViewController`] turns [`Event`]s into
//! [`Frame`]s. The [`tui`] module is the terminal front end.

use error_set::error_set;

pub mod align;
pub mod config;
pub mod controller;
pub mod diff;
pub mod event;
pub mod frame;
pub mod input;
pub mod keymap;
pub mod pane;
pub mod parse;
pub mod tree;
pub mod tui;

pub use config::Config;
pub use controller::{Flow, Focus, ViewController};
pub use diff::{DiffDocument, FileDiff};
pub use event::{Event, Key, MouseAction};
pub use frame::Frame;
pub use pane::Layout;
pub use parse::ParseError;

error_set! {
    /// Top-level error for diffnav
    DiffNavError := {
        ParseError(ParseError),
        #[display("Failed to read input: {message}")]
        InputError { message: String },
        #[display("Terminal error: {message}")]
        TerminalError { message: String },
    }
}

/// Parse `text` and set up a controller for it.
///
/// `unified` forces the unified layout; otherwise the configured layout is
/// used.
///
/// # Examples
/// ```
/// # use diffnav::{Config, Layout, open};
/// let diff = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-old\n+new\n";
/// let controller = open(diff, true, &Config::default()).unwrap();
/// assert_eq!(controller.layout(), Layout::Unified);
/// assert_eq!(controller.document().len(), 1);
/// ```
pub fn open(text: &str, unified: bool, config: &Config) -> Result<ViewController, DiffNavError> {
    let document = parse::parse_document(text)?;
    let layout = if unified || !config.side_by_side {
        Layout::Unified
    } else {
        Layout::SideBySide
    };
    Ok(ViewController::new(document, layout, config))
}

//! Configuration for diffnav.
//!
//! Settings are read from `~/.config/diffnav/config.toml`. The file is
//! optional and never written; missing fields take their defaults.

use crate::align::DEFAULT_MAX_LINE_LEN;
use crate::keymap::Action;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Start in side-by-side layout (`--unified` overrides)
    pub side_by_side: bool,
    /// Columns given to the file tree
    pub tree_width: u16,
    /// Longest line (in characters) that gets intraline highlighting
    pub max_intraline_len: usize,
    /// Rows scrolled per mouse wheel step
    pub scroll_step: usize,
    pub keys: KeyBindings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            side_by_side: true,
            tree_width: 40,
            max_intraline_len: DEFAULT_MAX_LINE_LEN,
            scroll_step: 3,
            keys: KeyBindings::default(),
        }
    }
}

/// Key names bound to each action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyBindings {
    pub switch_focus: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub page_up: Vec<String>,
    pub page_down: Vec<String>,
    pub top: Vec<String>,
    pub bottom: Vec<String>,
    pub select: Vec<String>,
    pub toggle_layout: Vec<String>,
    pub toggle_tree: Vec<String>,
    pub next_file: Vec<String>,
    pub prev_file: Vec<String>,
    pub search: Vec<String>,
    pub next_match: Vec<String>,
    pub prev_match: Vec<String>,
    pub quit: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            switch_focus: keys(&["tab"]),
            up: keys(&["k", "up"]),
            down: keys(&["j", "down"]),
            left: keys(&["h", "left"]),
            right: keys(&["l", "right"]),
            page_up: keys(&["ctrl+u", "pgup"]),
            page_down: keys(&["ctrl+d", "pgdown"]),
            top: keys(&["g", "home"]),
            bottom: keys(&["G", "end"]),
            select: keys(&["enter"]),
            toggle_layout: keys(&["s"]),
            toggle_tree: keys(&["e"]),
            next_file: keys(&["ctrl+n"]),
            prev_file: keys(&["ctrl+p"]),
            search: keys(&["/"]),
            next_match: keys(&["n"]),
            prev_match: keys(&["N"]),
            quit: keys(&["q", "ctrl+c"]),
        }
    }
}

impl KeyBindings {
    /// Every action with its configured key names
    pub fn entries(&self) -> [(Action, &[String]); 18] {
        [
            (Action::SwitchFocus, self.switch_focus.as_slice()),
            (Action::Up, self.up.as_slice()),
            (Action::Down, self.down.as_slice()),
            (Action::Left, self.left.as_slice()),
            (Action::Right, self.right.as_slice()),
            (Action::PageUp, self.page_up.as_slice()),
            (Action::PageDown, self.page_down.as_slice()),
            (Action::Top, self.top.as_slice()),
            (Action::Bottom, self.bottom.as_slice()),
            (Action::Select, self.select.as_slice()),
            (Action::ToggleLayout, self.toggle_layout.as_slice()),
            (Action::ToggleTree, self.toggle_tree.as_slice()),
            (Action::NextFile, self.next_file.as_slice()),
            (Action::PrevFile, self.prev_file.as_slice()),
            (Action::Search, self.search.as_slice()),
            (Action::NextMatch, self.next_match.as_slice()),
            (Action::PrevMatch, self.prev_match.as_slice()),
            (Action::Quit, self.quit.as_slice()),
        ]
    }
}

/// Returns the path to the config file: `~/.config/diffnav/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("diffnav").join("config.toml"))
}

/// Load configuration from disk. Returns default if file is missing or invalid.
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => Config::default(),
    }
}

pub fn load_from(path: &Path) -> Config {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            debug!(path = %path.display(), %err, "no config file, using defaults");
            return Config::default();
        }
    };

    toml::from_str(&contents).unwrap_or_else(|err| {
        warn!(path = %path.display(), %err, "invalid config file, using defaults");
        Config::default()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.side_by_side);
        assert_eq!(config.tree_width, 40);
        assert_eq!(config.scroll_step, 3);
        assert_eq!(config.keys.quit, vec!["q", "ctrl+c"]);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config {
            side_by_side: false,
            tree_width: 30,
            max_intraline_len: 100,
            scroll_step: 5,
            keys: KeyBindings {
                toggle_layout: vec!["t".to_string()],
                ..KeyBindings::default()
            },
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let partial = r#"
            tree_width = 25

            [keys]
            quit = ["x"]
        "#;

        let config: Config = toml::from_str(partial).unwrap();
        assert_eq!(config.tree_width, 25);
        assert_eq!(config.keys.quit, vec!["x"]);
        assert!(config.side_by_side);
        assert_eq!(config.keys.down, vec!["j", "down"]);
    }

    #[test]
    fn test_invalid_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml {{{{").unwrap();

        assert_eq!(load_from(&path), Config::default());
        assert_eq!(load_from(&dir.path().join("missing.toml")), Config::default());
    }
}

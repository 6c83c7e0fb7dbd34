//! Key bindings: parsing key names from the config and mapping keys to
//! actions.

use crate::config::KeyBindings;
use crate::event::Key;
use error_set::error_set;
use std::collections::HashMap;
use tracing::warn;

error_set! {
    /// Errors from parsing key names
    KeyError := {
        #[display("Unknown key '{name}'")]
        UnknownKey { name: String },
    }
}

/// Everything a key can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SwitchFocus,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Top,
    Bottom,
    Select,
    ToggleLayout,
    ToggleTree,
    NextFile,
    PrevFile,
    Search,
    NextMatch,
    PrevMatch,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<Key, Action>,
}

impl KeyMap {
    /// Build the map from configured key names. Unknown names are logged and
    /// skipped; when two actions claim a key the later one wins.
    pub fn new(keys: &KeyBindings) -> Self {
        let mut bindings = HashMap::new();

        for (action, names) in keys.entries() {
            for name in names {
                match parse_key(name) {
                    Ok(key) => {
                        bindings.insert(key, action);
                    }
                    Err(err) => warn!(%err, ?action, "ignoring key binding"),
                }
            }
        }

        Self { bindings }
    }

    pub fn action(&self, key: Key) -> Option<Action> {
        self.bindings.get(&key).copied()
    }
}

/// Parse a key name such as `j`, `G`, `ctrl+n`, `pgdown` or `tab`.
///
/// Single characters are case-sensitive; named keys are not.
pub fn parse_key(name: &str) -> Result<Key, KeyError> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Key::Char(c));
    }

    let lower = name.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("ctrl+") {
        let mut chars = rest.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::Ctrl(c));
        }
    }

    let key = match lower.as_str() {
        "up" => Key::Up,
        "down" => Key::Down,
        "left" => Key::Left,
        "right" => Key::Right,
        "pgup" | "pageup" => Key::PageUp,
        "pgdown" | "pagedown" => Key::PageDown,
        "home" => Key::Home,
        "end" => Key::End,
        "tab" => Key::Tab,
        "backtab" | "shift+tab" => Key::BackTab,
        "enter" | "return" => Key::Enter,
        "esc" | "escape" => Key::Esc,
        "backspace" => Key::Backspace,
        "space" => Key::Char(' '),
        _ => {
            return Err(KeyError::UnknownKey {
                name: name.to_string(),
            });
        }
    };
    Ok(key)
}

//! Decoded input events delivered to the view controller.

/// A key press, independent of any terminal library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Ctrl(char),
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Tab,
    BackTab,
    Enter,
    Esc,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    ScrollUp,
    ScrollDown,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The document is ready; sent once before any other event
    Loaded,
    Key(Key),
    Mouse {
        action: MouseAction,
        column: u16,
        row: u16,
    },
    Resize {
        width: u16,
        height: u16,
    },
}

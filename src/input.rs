//! Reading the diff from standard input.

use crate::DiffNavError;
use std::io::{IsTerminal, Read};

/// What arrived on standard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing was piped in
    Missing,
    /// Only whitespace (after removing escape sequences)
    Blank,
    Diff(String),
}

/// Read all of stdin, unless it is a terminal
pub fn read_stdin() -> Result<Input, DiffNavError> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(Input::Missing);
    }
    read_from(stdin.lock())
}

/// Read everything from `reader` and strip terminal escape sequences.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_from(mut reader: impl Read) -> Result<Input, DiffNavError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| DiffNavError::InputError {
            message: e.to_string(),
        })?;

    if bytes.is_empty() {
        return Ok(Input::Missing);
    }

    let text = strip_escapes(&String::from_utf8_lossy(&bytes));
    if text.trim().is_empty() {
        Ok(Input::Blank)
    } else {
        Ok(Input::Diff(text))
    }
}

/// Remove ANSI escape sequences, e.g. the colors of `git diff --color`
pub fn strip_escapes(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\x1b' {
            result.push(ch);
            continue;
        }

        match chars.next() {
            // CSI: parameters then a final byte in '@'..='~'
            Some('[') => {
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            // OSC: terminated by BEL or ESC '\'
            Some(']') => {
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            // Two-character escapes
            Some(_) | None => {}
        }
    }

    result
}

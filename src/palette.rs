//! ANSI SGR sequences and the per-level color table.

use colored::Color;

use crate::Level;

pub const RESET: &str = "\x1b[m";
pub const BOLD: &str = "\x1b[1m";

/// Foreground color sequence, e.g. `fg(Color::Red) == "\x1b[31m"`.
pub fn fg(color: Color) -> String {
    format!("\x1b[{}m", color.to_fg_str())
}

/// Background color sequence, e.g. `bg(Color::Red) == "\x1b[41m"`.
pub fn bg(color: Color) -> String {
    format!("\x1b[{}m", color.to_bg_str())
}

/// Color code for each level, owned by a single sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    codes: [String; Level::COUNT],
}

impl Default for ColorTable {
    fn default() -> Self {
        let mut table = Self {
            codes: Default::default(),
        };
        table.set(Level::Trace, &fg(Color::White));
        table.set(Level::Debug, &fg(Color::Cyan));
        table.set(Level::Info, &fg(Color::Green));
        table.set(Level::Warn, &format!("{}{BOLD}", fg(Color::Yellow)));
        table.set(Level::Error, &format!("{}{BOLD}", fg(Color::Red)));
        table.set(Level::Critical, &format!("{BOLD}{}", bg(Color::Red)));
        table.set(Level::Off, RESET);
        table
    }
}

impl ColorTable {
    pub fn get(&self, level: Level) -> &str {
        &self.codes[level.index()]
    }

    /// Stores an owned copy of `code`; the bytes are not checked.
    pub fn set(&mut self, level: Level, code: &str) {
        self.codes[level.index()] = code.to_owned();
    }
}

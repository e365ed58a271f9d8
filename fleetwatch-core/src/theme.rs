//! Terminal color helpers for the text report
//!
//! Plain ANSI escapes, no terminal capability probing. Callers decide
//! whether color is enabled.

use std::fmt;

/// Foreground colors used by the text renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Green,
    Cyan,
    Yellow,
    LightYellow,
    Blue,
    LightRed,
    Red,
    Grey,
}

impl Color {
    /// SGR parameter for this color
    pub fn ansi_code(self) -> &'static str {
        match self {
            Color::Green => "32",
            Color::Cyan => "36",
            Color::Yellow => "33",
            Color::LightYellow => "93",
            Color::Blue => "34",
            Color::LightRed => "91",
            Color::Red => "31",
            Color::Grey => "90",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Green => "green",
            Color::Cyan => "cyan",
            Color::Yellow => "yellow",
            Color::LightYellow => "light-yellow",
            Color::Blue => "blue",
            Color::LightRed => "light-red",
            Color::Red => "red",
            Color::Grey => "grey",
        };
        f.write_str(name)
    }
}

const RESET: &str = "\x1b[0m";

/// Wrap `text` in the escape sequence for `color`
pub fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{}m{}{}", color.ansi_code(), text, RESET)
    } else {
        text.to_string()
    }
}

/// Render `text` with reduced intensity
pub fn dim(text: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[2m{}{}", text, RESET)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_disabled_is_plain() {
        assert_eq!(paint("web", Color::Red, false), "web");
        assert_eq!(dim("web", false), "web");
    }

    #[test]
    fn test_paint_enabled_wraps_text() {
        assert_eq!(paint("ok", Color::Green, true), "\x1b[32mok\x1b[0m");
        assert_eq!(dim("x", true), "\x1b[2mx\x1b[0m");
    }
}

//! Colors and icons used on the console.

use crossterm::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: ColorScheme,
    pub icons: Icons,
    /// Width of the item column in status lines.
    pub item_width: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: ColorScheme::default(),
            icons: Icons::default(),
            item_width: 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Platform ids and artifact names
    pub item: Color,
    /// Sizes, timings and other secondary info
    pub secondary: Color,
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            item: Color::Cyan,
            secondary: Color::DarkGrey,
            header: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Icons {
    pub active: &'static str,
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            active: "●",
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}

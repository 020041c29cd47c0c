//! Color theme system for notesync.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every UI
//! surface notesync renders. Two built-in themes are provided:
//!
//! - `dark` — ANSI 16 colors (`Color::Reset`, `Color::DarkGray`, etc.) so it
//!   works on any terminal including 256-color SSH sessions with no
//!   truecolor support.
//! - `catppuccin_mocha` — Catppuccin Mocha palette in RGB; requires
//!   truecolor.

use ratatui::style::Color;

/// All color values used across notesync's UI surfaces.
///
/// Every field is a `ratatui::style::Color`. Callers use `theme.field`
/// directly inside `Style::default().fg(theme.border_active)`.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    /// Border color for the currently focused panel.
    pub border_active: Color,
    /// Border color for unfocused panels.
    pub border_inactive: Color,

    // Diff view
    /// Inserted text.
    pub diff_added: Color,
    /// Deleted text.
    pub diff_removed: Color,
    /// Unchanged text.
    pub diff_context: Color,

    // Files panel
    /// Unread marker dot and unread file names.
    pub file_unread: Color,
    /// File names with no pending changes.
    pub file_read: Color,
    /// The "last modified by" author suffix.
    pub file_author: Color,

    // Team panel
    /// Activity feed timestamps.
    pub activity_time: Color,
    /// Activity feed author names.
    pub activity_author: Color,
    /// Open (unresolved) annotation markers.
    pub note_open: Color,
    /// Resolved annotation markers.
    pub note_resolved: Color,

    // Status bar
    /// Status bar background.
    pub status_bar_bg: Color,
    /// Status bar foreground (general text).
    pub status_bar_fg: Color,
    /// Mode indicator color.
    pub status_mode: Color,
    /// Unread-count badge color.
    pub status_unread: Color,

    // General
    /// Application background (used for clearing areas).
    pub background: Color,
}

impl Theme {
    /// Returns the built-in dark theme using ANSI 16 colors.
    ///
    /// Works on all terminals: 16-color, 256-color, and truecolor. Suitable
    /// as the default when no config is present or color capability is
    /// unknown.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_context: Color::Reset,

            file_unread: Color::Blue,
            file_read: Color::Reset,
            file_author: Color::DarkGray,

            activity_time: Color::DarkGray,
            activity_author: Color::Yellow,
            note_open: Color::Magenta,
            note_resolved: Color::DarkGray,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode: Color::Cyan,
            status_unread: Color::Blue,

            background: Color::Reset,
        }
    }

    /// Returns the Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Requires a truecolor terminal. Colors degrade to the nearest ANSI
    /// 256-color approximation on non-truecolor terminals, with reduced
    /// fidelity. Use `dark()` on SSH or 256-color terminals.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha
    /// variant.
    pub fn catppuccin_mocha() -> Self {
        // Catppuccin Mocha palette (selected subset)
        let green = Color::Rgb(166, 227, 161);    // #a6e3a1
        let red = Color::Rgb(243, 139, 168);      // #f38ba8
        let yellow = Color::Rgb(249, 226, 175);   // #f9e2af
        let blue = Color::Rgb(137, 180, 250);     // #89b4fa
        let mauve = Color::Rgb(203, 166, 247);    // #cba6f7
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface1 = Color::Rgb(69, 71, 90);    // #45475a
        let base = Color::Rgb(30, 30, 46);        // #1e1e2e
        let text = Color::Rgb(205, 214, 244);     // #cdd6f4

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_added: green,
            diff_removed: red,
            diff_context: text,

            file_unread: blue,
            file_read: text,
            file_author: overlay1,

            activity_time: overlay1,
            activity_author: yellow,
            note_open: mauve,
            note_resolved: overlay1,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode: lavender,
            status_unread: blue,

            background: base,
        }
    }

    /// Resolves a theme name string to the corresponding built-in theme.
    ///
    /// Unknown names fall back to `dark()` so a typo in config never
    /// prevents startup. The fallback is logged, not a hard error.
    ///
    /// # Arguments
    ///
    /// * `name` — theme name from config, e.g. `"dark"` or
    ///   `"catppuccin-mocha"`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}

//! Help overlay renderer for notesync.
//!
//! A centred, scrollable overlay listing every keybinding. Rendered last in
//! the frame so it sits above all panels; `Clear` erases the background
//! first.

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Clear, Paragraph},
};

use crate::theme::Theme;

/// Key/description pairs shown in the overlay, in display order.
const BINDINGS: &[(&str, &str)] = &[
    ("j / k", "scroll down / up"),
    ("g / G", "jump to top / bottom"),
    ("Ctrl-d / Ctrl-u", "half page down / up"),
    ("Ctrl-f / Ctrl-b", "full page down / up"),
    ("H / L", "cycle panel focus"),
    ("{ / }", "previous / next file"),
    ("Enter / l", "open selected file's changes"),
    ("[ / ]", "previous / next changed region"),
    ("r", "mark selected file as read"),
    ("< / >", "shrink / grow the diff panel"),
    ("?", "toggle this help"),
    ("q / Esc", "quit"),
];

/// Renders the help overlay centred over the whole frame.
///
/// `scroll` is the vertical offset driven by j/k while the overlay is open.
pub fn render_help_overlay(frame: &mut Frame, scroll: u16, theme: &Theme) {
    let area = centered(frame.area(), 46, (BINDINGS.len() + 4) as u16);

    frame.render_widget(Clear, area);

    let mut lines: Vec<Line<'static>> = vec![Line::raw("")];
    for (keys, what) in BINDINGS {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {keys:>15}  "),
                Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD),
            ),
            Span::raw((*what).to_owned()),
        ]));
    }

    let block = Block::bordered()
        .title(" Help ")
        .border_type(BorderType::Thick)
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(theme.background))
            .scroll((scroll, 0)),
        area,
    );
}

/// A `width` × `height` rect centred within `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [horizontal] = area.layout(&Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center));
    let [vertical] = horizontal.layout(&Layout::vertical([Constraint::Length(height)]).flex(Flex::Center));
    vertical
}

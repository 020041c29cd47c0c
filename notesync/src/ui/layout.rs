//! Responsive 3-panel layout engine for notesync.
//!
//! This module is pure layout arithmetic — no mutable application state
//! lives here. It is called inside `terminal.draw()` on every render so
//! every frame gets a fresh layout that automatically reflects the current
//! terminal size.
//!
//! # Panel geometry
//!
//! At `>= 110` columns all three panels are visible with widths driven by
//! `AppState.left_pct / center_pct / right_pct` (defaults 22 / 50 / 28).
//! Below 110 columns both side panels collapse and the diff fills the full
//! width.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders
//! (MergeStrategy::Fuzzy)` makes adjacent panel borders share a single
//! column and merge their junction box-drawing characters automatically.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Returns `[left, center, right, status_bar]` panel `Rect`s for the
/// current frame.
///
/// Called inside `terminal.draw()` on every render. The returned rects are
/// valid only for the current draw closure — never store them across frames
/// (the click-to-focus copy in `AppState.panel_rects` is refreshed every
/// frame for exactly this reason).
///
/// # Responsive behaviour
///
/// | Terminal width | Layout |
/// |----------------|--------|
/// | `< 110` cols   | Side panels collapsed; diff fills full width |
/// | `>= 110` cols  | 3-panel split using the `AppState` percentages |
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    // Vertical split: main area (fills remaining height) + 1-row status bar.
    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let horizontal = if term_width >= 110 {
        Layout::horizontal([
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ])
        .spacing(Spacing::Overlap(1))
    } else {
        Layout::horizontal([
            Constraint::Length(0),
            Constraint::Fill(1),
            Constraint::Length(0),
        ])
        .spacing(Spacing::Overlap(1))
    };

    let [left, center, right] = main_area.layout(&horizontal);

    [left, center, right, status_bar]
}

/// Returns the inner `Rect` of a panel after removing the 1-cell border on
/// each side.
///
/// Used to cache viewport heights in `AppState` before panels are rendered,
/// so half-page and full-page scroll distances are available at keypress
/// time.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// `BorderType::Thick` when focused, `Plain` otherwise.
/// `MergeStrategy::Fuzzy` is required for the border merge because `Exact`
/// produces incorrect junctions when mixing `Thick` and `Plain` borders.
pub fn panel_block<'a>(title: &'a str, is_focused: bool, theme: &'a Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar at the bottom of the terminal.
///
/// Shows the mode indicator, the local username, the unread count, and the
/// current diff summary when one is loaded. Never renders blank.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let mode_text = match state.mode {
        Mode::Normal | Mode::HelpOverlay => " NORMAL ",
    };

    let mut spans = vec![
        Span::styled(
            mode_text,
            Style::default().fg(theme.status_mode).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} ", state.username)),
    ];

    let unread = state.unread.len();
    if unread > 0 {
        spans.push(Span::styled(
            format!(" ● {unread} unread "),
            Style::default().fg(theme.status_unread).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(summary) = state.diff_summary() {
        spans.push(Span::styled(
            format!(" +{}", summary.added),
            Style::default().fg(theme.diff_added),
        ));
        spans.push(Span::styled(
            format!(" -{} ", summary.removed),
            Style::default().fg(theme.diff_removed),
        ));
    } else if state.diff_loading {
        spans.push(Span::raw(" diffing… "));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}

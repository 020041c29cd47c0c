//! Diff panel renderer for notesync.
//!
//! Renders the centre panel from the pre-styled lines computed by the
//! replica watcher. The panel title carries the file path and the
//! added/removed summary; the body is a `List` of lines windowed by the
//! scroll offset.

use ratatui::{
    Frame,
    style::Style,
    text::Line,
    widgets::{List, ListItem},
};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Renders the diff panel.
///
/// The scroll offset is clamped to the line count before rendering, so `G`
/// (scroll to bottom) and stale offsets left over from a longer diff cannot
/// scroll past the end. Placeholder text is shown while no diff is loaded
/// or a request is in flight.
pub fn render_diff(
    frame: &mut Frame,
    area: ratatui::layout::Rect,
    focus: PanelFocus,
    state: &mut AppState,
    theme: &Theme,
) {
    let is_focused = focus == PanelFocus::Diff;

    // Clamp the scroll offset before taking any borrow of the diff payload.
    let max_offset = state.diff.as_ref().map(|d| d.lines.len().saturating_sub(1)).unwrap_or(0);
    state.diff_scroll = state.diff_scroll.min(max_offset);

    let title = match &state.diff {
        Some(diff) => format!(
            "Changes: {}  +{} -{}",
            diff.path, diff.summary.added, diff.summary.removed
        ),
        None => "Changes".to_owned(),
    };
    let block = panel_block(&title, is_focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let placeholder = Style::default().fg(theme.diff_context);
    let lines: Vec<Line<'static>> = match &state.diff {
        Some(diff) if diff.lines.is_empty() => {
            vec![Line::styled("No differences since you last read this file", placeholder)]
        }
        Some(diff) => {
            let visible = inner.height as usize;
            diff.lines.iter().skip(state.diff_scroll).take(visible).cloned().collect()
        }
        None if state.diff_loading => vec![Line::styled("Computing diff…", placeholder)],
        None => {
            vec![Line::styled("Select a file and press Enter to view its changes", placeholder)]
        }
    };

    let items: Vec<ListItem> = lines.into_iter().map(ListItem::new).collect();
    frame.render_widget(List::new(items), inner);
}

//! Files panel renderer for notesync.
//!
//! Renders the left panel from `AppState.files`. Each entry shows an unread
//! dot, the note path, and the author of the latest revision. When the
//! listing is empty, shows a placeholder.

use ratatui::{
    Frame,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, PanelFocus};
use crate::sync::types::FileEntry;
use crate::theme::Theme;
use crate::ui::layout::panel_block;

/// Renders the files panel from `AppState.files`.
///
/// Uses `render_stateful_widget` so the ListState selection highlight is
/// applied. The unread count is shown in the panel title (e.g.
/// "Files (3 unread)").
pub fn render_files(
    frame: &mut Frame,
    area: ratatui::layout::Rect,
    focus: PanelFocus,
    state: &mut AppState,
    theme: &Theme,
) {
    let is_focused = focus == PanelFocus::Files;
    let unread_count = state.unread.len();
    let title = if unread_count > 0 {
        format!("Files ({unread_count} unread)")
    } else {
        format!("Files ({})", state.files.len())
    };
    let block = panel_block(&title, is_focused, theme);

    let items: Vec<ListItem> = if state.files.is_empty() {
        vec![ListItem::new(Line::raw("No notes in the replica yet"))]
    } else {
        state
            .files
            .iter()
            .map(|f| file_item(f, state.unread.contains(&f.path), theme))
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut state.file_list_state);
}

/// Converts a FileEntry into a styled ListItem.
///
/// Format: `● notes/plan.md  bob` for unread entries, with a hollow marker
/// and dimmer name once read. Long paths are truncated from the left so the
/// filename stays visible.
fn file_item(f: &FileEntry, unread: bool, theme: &Theme) -> ListItem<'static> {
    let (marker, name_color) = if unread {
        ("● ", theme.file_unread)
    } else {
        ("  ", theme.file_read)
    };

    let max_path_len = 30usize;
    let chars: Vec<char> = f.path.chars().collect();
    let path_display = if chars.len() > max_path_len {
        let tail: String = chars[chars.len() - (max_path_len - 1)..].iter().collect();
        format!("…{tail}")
    } else {
        f.path.clone()
    };

    ListItem::new(Line::from(vec![
        Span::styled(marker.to_owned(), Style::default().fg(theme.file_unread)),
        Span::styled(path_display, Style::default().fg(name_color)),
        Span::styled(
            format!("  {}", f.modified_by),
            Style::default().fg(theme.file_author),
        ),
    ]))
}

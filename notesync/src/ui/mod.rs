//! UI rendering module for notesync.
//!
//! This is the module root for `ui/`. It re-exports `render()` as the
//! single entry point called by the event loop's `terminal.draw()` closure.
//!
//! All layout arithmetic lives in `layout.rs`. The files panel lives in
//! `file_list.rs`, the diff panel in `diff_view.rs`, and the activity +
//! annotations panel in `team.rs`.

mod layout;
pub mod diff_view;
pub mod file_list;
pub mod help;
pub mod keybindings;
pub mod team;

use ratatui::Frame;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame: 3-panel layout, status bar, optional help
/// overlay.
///
/// Called exactly once per `AppEvent::Render` inside `terminal.draw()` —
/// this is the only location where drawing happens.
///
/// After computing the layout, viewport heights and panel rects are written
/// back into `state` so that scroll distances and click-to-focus hit tests
/// for the *next* input event use the current geometry. The one-frame lag
/// is imperceptible in practice.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [left, center, right, status_bar] = compute_layout(frame, state);

    state.files_viewport_height = inner_rect(left).height;
    state.diff_viewport_height = inner_rect(center).height;
    state.team_viewport_height = inner_rect(right).height;
    state.panel_rects = [left, center, right];

    let focus = state.focus;

    // Left panel: files with unread markers (skip when collapsed).
    if left.width > 0 {
        file_list::render_files(frame, left, focus, state, theme);
    }

    // Centre panel: diff (always visible).
    diff_view::render_diff(frame, center, focus, state, theme);

    // Right panel: activity feed + annotations (skip when collapsed).
    if right.width > 0 {
        team::render_team(frame, right, focus, state, theme);
    }

    // Status bar: always visible, 1 row.
    render_status_bar(frame, status_bar, state, theme);

    // Help overlay: rendered after all panels so it sits on top.
    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, state.help_scroll, theme);
    }
}

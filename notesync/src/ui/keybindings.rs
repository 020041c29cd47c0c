//! Keybinding dispatcher for notesync.
//!
//! Translates raw crossterm `KeyEvent`s into `AppState` mutations and
//! returns a `KeyAction` telling the event loop what (if anything) to do
//! next. Actions that need I/O — requesting a diff, writing the read ledger
//! — are signalled back to the event loop rather than performed here; the
//! dispatcher itself only touches view state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PanelFocus};

/// Control-flow signal returned from the key dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Continue the event loop normally.
    Continue,
    /// Exit cleanly.
    Quit,
    /// The user opened the selected file: the loop requests its diff and
    /// refreshes its annotations.
    OpenSelected,
    /// The user marked the selected file read: the loop persists it to the
    /// read ledger.
    MarkSelectedRead,
}

/// Dispatches a key event to the handler matching the current mode.
///
/// Mutates `state` in place and returns a `KeyAction`. The event loop calls
/// this once per received key; rendering happens on the next render tick
/// regardless.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Normal => handle_normal(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

/// Handles a key event while in Normal mode.
///
/// Delegates scroll keys to `handle_scroll_key`; focus, file navigation,
/// changed-region jumps, panel resize, and mode transitions are handled
/// inline.
fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }

    match key.code {
        // Panel focus
        KeyCode::Char('H') => {
            state.focus = state.focus.prev();
            KeyAction::Continue
        }
        KeyCode::Char('L') => {
            state.focus = state.focus.next();
            KeyAction::Continue
        }

        // File list navigation regardless of focused panel
        KeyCode::Char('{') => {
            state.prev_file();
            KeyAction::Continue
        }
        KeyCode::Char('}') => {
            state.next_file();
            KeyAction::Continue
        }

        // Open the selected file's changes
        KeyCode::Enter | KeyCode::Char('l') if state.focus == PanelFocus::Files => {
            if state.file_list_state.selected().is_some() {
                state.open_selected();
                KeyAction::OpenSelected
            } else {
                KeyAction::Continue
            }
        }

        // Changed-region navigation in the diff panel
        KeyCode::Char('[') => {
            state.prev_change();
            KeyAction::Continue
        }
        KeyCode::Char(']') => {
            state.next_change();
            KeyAction::Continue
        }

        // Mark the selected file read
        KeyCode::Char('r') => {
            if state.selected_file().is_some() {
                KeyAction::MarkSelectedRead
            } else {
                KeyAction::Continue
            }
        }

        // Diff panel resize
        KeyCode::Char('<') => {
            state.shrink_diff_panel();
            KeyAction::Continue
        }
        KeyCode::Char('>') => {
            state.grow_diff_panel();
            KeyAction::Continue
        }

        // Help overlay
        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }

        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,

        _ => KeyAction::Continue,
    }
}

/// Handles scroll-related keys in Normal mode: j / k / g / G and Ctrl
/// combos.
///
/// Returns `Some(KeyAction)` when the key was consumed, `None` when it
/// should fall through to the rest of the Normal handler.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') => {
            state.scroll_down(1);
            Some(KeyAction::Continue)
        }
        KeyCode::Char('k') => {
            state.scroll_up(1);
            Some(KeyAction::Continue)
        }
        KeyCode::Char('g') => {
            state.scroll_top();
            Some(KeyAction::Continue)
        }
        KeyCode::Char('G') => {
            state.scroll_bottom();
            Some(KeyAction::Continue)
        }
        KeyCode::Char('d') if ctrl => {
            state.half_page_down();
            Some(KeyAction::Continue)
        }
        KeyCode::Char('u') if ctrl => {
            state.half_page_up();
            Some(KeyAction::Continue)
        }
        KeyCode::Char('f') if ctrl => {
            state.full_page_down();
            Some(KeyAction::Continue)
        }
        KeyCode::Char('b') if ctrl => {
            state.full_page_up();
            Some(KeyAction::Continue)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

/// Handles a key event while the help overlay is visible.
///
/// j/k/g/G scroll the overlay; `?`, `Esc`, or `q` dismisses it. All other
/// keys are silently ignored.
fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => {
            state.help_scroll = state.help_scroll.saturating_add(1);
            KeyAction::Continue
        }
        KeyCode::Char('k') => {
            state.help_scroll = state.help_scroll.saturating_sub(1);
            KeyAction::Continue
        }
        KeyCode::Char('g') => {
            state.help_scroll = 0;
            KeyAction::Continue
        }
        KeyCode::Char('G') => {
            state.help_scroll = u16::MAX;
            KeyAction::Continue
        }
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Handles a mouse event: click-to-focus and scroll-wheel.
///
/// Left click on a panel sets focus to that panel. Scroll wheel up/down
/// scrolls the focused panel by 3 lines. Wheel events in HelpOverlay mode
/// scroll the overlay instead.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            handle_mouse_click(mouse.column, mouse.row, state)
        }
        MouseEventKind::ScrollUp => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_sub(3);
            } else {
                state.scroll_up(3);
            }
            KeyAction::Continue
        }
        MouseEventKind::ScrollDown => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_add(3);
            } else {
                state.scroll_down(3);
            }
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

/// Sets panel focus based on the clicked screen position.
///
/// Checks each cached panel rect in `state.panel_rects`. Panels with zero
/// width are skipped so collapsed panels cannot receive focus via click.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) -> KeyAction {
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::Files;
    } else if center.contains(pos) {
        state.focus = PanelFocus::Diff;
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Team;
    }

    KeyAction::Continue
}

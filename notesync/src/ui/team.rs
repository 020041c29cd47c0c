//! Team panel renderer: activity feed on top, annotations below.
//!
//! The right panel stacks two sections. "Activity" lists the tracker's feed
//! newest-first; "Notes" lists the relocated annotations for the selected
//! file with reply counts and resolved markers. Both share one scroll
//! offset via a single `Paragraph`.

use chrono::{Local, TimeZone};
use ratatui::{
    Frame,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use notesync_core::types::{ActivityEntry, RenderAnnotation};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Renders the team panel (activity + notes) with shared scrolling.
pub fn render_team(
    frame: &mut Frame,
    area: ratatui::layout::Rect,
    focus: PanelFocus,
    state: &AppState,
    theme: &Theme,
) {
    let is_focused = focus == PanelFocus::Team;
    let block = panel_block("Team", is_focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line<'static>> = Vec::new();

    lines.push(section_header("Activity", theme));
    if state.activity.is_empty() {
        lines.push(Line::raw("  no changes observed yet"));
    } else {
        for entry in &state.activity {
            lines.push(activity_line(entry, theme));
        }
    }

    lines.push(Line::raw(""));
    let notes_title = match &state.notes_for {
        Some(path) => format!("Notes — {path}"),
        None => "Notes".to_owned(),
    };
    lines.push(section_header(&notes_title, theme));
    if state.notes.is_empty() {
        lines.push(Line::raw("  no annotations on this file"));
    } else {
        for note in &state.notes {
            lines.extend(note_lines(note, theme));
        }
    }

    let paragraph = Paragraph::new(lines).scroll((state.team_scroll, 0));
    frame.render_widget(paragraph, inner);
}

fn section_header(text: &str, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(
        text.to_owned(),
        Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD),
    ))
}

/// One activity feed row: `12:04 bob  notes/plan.md`.
fn activity_line(entry: &ActivityEntry, theme: &Theme) -> Line<'static> {
    let time = Local
        .timestamp_opt(entry.timestamp, 0)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_owned());
    Line::from(vec![
        Span::styled(format!("  {time} "), Style::default().fg(theme.activity_time)),
        Span::styled(
            entry.modified_by.clone(),
            Style::default().fg(theme.activity_author),
        ),
        Span::raw(format!("  {}", entry.file_path)),
    ])
}

/// Annotation rows: marker + author + position, then the comment body.
///
/// Out-of-range positions are rendered at line 0 rather than skipped here —
/// the range was already clamped or carried over by the refresh cycle; the
/// panel shows whatever position the annotation currently claims.
fn note_lines(note: &RenderAnnotation, theme: &Theme) -> Vec<Line<'static>> {
    let (marker, marker_color) = if note.resolved {
        ("✓", theme.note_resolved)
    } else {
        ("◆", theme.note_open)
    };
    let mut header = vec![
        Span::styled(format!("  {marker} "), Style::default().fg(marker_color)),
        Span::styled(
            note.author.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" @ line {}", note.range.start_line + 1),
            Style::default().fg(theme.activity_time),
        ),
    ];
    if note.reply_count > 0 {
        header.push(Span::styled(
            format!("  ({} replies)", note.reply_count),
            Style::default().fg(theme.activity_time),
        ));
    }

    let mut lines = vec![Line::from(header)];
    for body_line in note.content.lines().take(3) {
        lines.push(Line::raw(format!("    {body_line}")));
    }
    lines
}

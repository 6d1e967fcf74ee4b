// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Drawing of [`RenderState`] with ratatui

use crate::theme::Theme;
use crate::view_model::{LogEntry, RenderState, RunStatus};
use ratatui::{prelude::*, widgets::Paragraph};
use std::time::Instant;

/// Dividers never grow past this many columns
pub const DIVIDER_MAX_WIDTH: u16 = 60;

pub fn divider(width: u16, glyph: char) -> String {
    std::iter::repeat(glyph)
        .take(width.min(DIVIDER_MAX_WIDTH) as usize)
        .collect()
}

/// Draw the whole view into `frame`
pub fn render(frame: &mut Frame<'_>, state: &RenderState, theme: &Theme, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Length(2), // Current instruction
            Constraint::Length(1), // Divider
            Constraint::Length(1), // Status
            Constraint::Min(1),    // Log
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state, theme);
    render_current(frame, chunks[1], state, theme);
    frame.render_widget(
        Paragraph::new(divider(chunks[2].width, '━')).style(theme.divider()),
        chunks[2],
    );
    render_status(frame, chunks[3], state, theme, now);
    render_log(frame, chunks[4], state, theme);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("q", theme.title()),
            Span::styled(" quit", theme.muted()),
        ])),
        chunks[5],
    );
}

fn render_header(frame: &mut Frame<'_>, area: Rect, state: &RenderState, theme: &Theme) {
    let info = &state.info;
    let lines = vec![
        Line::from(vec![
            Span::styled("⚡ Livebridge", theme.title()),
            Span::styled(
                format!("  {} → {}", info.proxy_url, info.target_url),
                theme.muted(),
            ),
        ]),
        Line::from(Span::styled(format!("📁 {}", info.project_dir), theme.muted())),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_current(frame: &mut Frame<'_>, area: Rect, state: &RenderState, theme: &Theme) {
    let lines = match &state.current {
        Some(current) => vec![
            Line::from(Span::styled(
                format!("📝 {}", current.instruction.replace(['\r', '\n'], " ")),
                theme.text(),
            )),
            Line::from(Span::styled(
                format!("   {}", current.area_summary),
                theme.muted(),
            )),
        ],
        None => vec![Line::from(Span::styled(
            "Select an area in the browser and describe the change",
            theme.muted(),
        ))],
    };
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_status(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &RenderState,
    theme: &Theme,
    now: Instant,
) {
    let style = match state.status {
        RunStatus::Waiting => theme.muted(),
        RunStatus::Processing => theme.warning(),
        RunStatus::Complete => theme.success(),
        RunStatus::Error => theme.error(),
    };
    frame.render_widget(Paragraph::new(state.status_line(now)).style(style), area);
}

fn entry_style(entry: &LogEntry, theme: &Theme) -> Style {
    match entry {
        LogEntry::Separator => theme.divider(),
        LogEntry::Instruction { .. } => theme.title(),
        LogEntry::Content(_) => theme.text(),
        LogEntry::ToolUse(_) => theme.tool(),
        LogEntry::ToolResult | LogEntry::Complete { .. } => theme.success(),
        LogEntry::Error { .. } => theme.error(),
    }
}

/// Log lines wrapped to `width`, oldest first
pub fn log_lines(state: &RenderState, theme: &Theme, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in state.log() {
        let style = entry_style(entry, theme);
        if matches!(entry, LogEntry::Separator) {
            lines.push(Line::from(Span::styled(divider(width, '─'), style)));
            continue;
        }
        for text in entry.display_lines() {
            for piece in wrap(&text, width) {
                lines.push(Line::from(Span::styled(piece, style)));
            }
        }
    }
    lines
}

fn render_log(frame: &mut Frame<'_>, area: Rect, state: &RenderState, theme: &Theme) {
    let lines = log_lines(state, theme, area.width);
    // Follow the tail
    let skip = lines.len().saturating_sub(area.height as usize);
    let visible: Vec<Line<'static>> = lines.into_iter().skip(skip).collect();
    frame.render_widget(Paragraph::new(visible), area);
}

fn wrap(text: &str, width: u16) -> Vec<String> {
    let width = width.max(1) as usize;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return vec![text.to_string()];
    }
    chars.chunks(width).map(|chunk| chunk.iter().collect()).collect()
}

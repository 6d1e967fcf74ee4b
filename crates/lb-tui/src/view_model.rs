// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Render state for the agent run view
//!
//! [`RenderState`] is a pure model: it only changes through
//! [`RenderState::apply`], which the render loop calls for every
//! [`BridgeEvent`] it drains. Nothing here touches the terminal, so the whole
//! state machine is testable with plain `Instant`s.

use lb_agent::{BridgeEvent, StreamEvent, StreamEventKind};
use std::time::{Duration, Instant};

/// Where the bridge is listening and what it forwards to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub proxy_url: String,
    pub target_url: String,
    pub project_dir: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Waiting,
    Processing,
    Complete,
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Error)
    }
}

/// One line group in the run log
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// Marker between two instructions
    Separator,
    Instruction {
        instruction: String,
        area_summary: String,
    },
    Content(String),
    ToolUse(String),
    ToolResult,
    Error {
        message: String,
        elapsed: Duration,
    },
    Complete {
        elapsed: Duration,
    },
}

/// Icon shown before a tool invocation
pub fn tool_icon(name: &str) -> &'static str {
    match name {
        "Edit" | "MultiEdit" => "✏️",
        "Bash" => "🔧",
        "Read" => "📖",
        "Write" => "📝",
        "Glob" => "🔍",
        "Grep" => "🔎",
        _ => "🛠️",
    }
}

/// `X.Ys` with one decimal
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

impl LogEntry {
    /// Plain text rendering, one string per display line
    pub fn display_lines(&self) -> Vec<String> {
        match self {
            LogEntry::Separator => vec![String::new()],
            LogEntry::Instruction { instruction, area_summary } => {
                let mut lines = vec![format!("▶ {}", first_line(instruction))];
                if !area_summary.is_empty() {
                    lines.push(format!("  {area_summary}"));
                }
                lines
            }
            LogEntry::Content(text) => {
                let mut lines = text.lines().filter(|line| !line.trim().is_empty());
                let Some(first) = lines.next() else {
                    return Vec::new();
                };
                std::iter::once(format!("💬 {first}"))
                    .chain(lines.map(|line| format!("   {line}")))
                    .collect()
            }
            LogEntry::ToolUse(name) => vec![format!("{} {name}", tool_icon(name))],
            LogEntry::ToolResult => vec!["✓ Tool completed".to_string()],
            LogEntry::Error { message, elapsed } => vec![
                format!("❌ {message}"),
                format!("⏱  Completed in {}", format_elapsed(*elapsed)),
            ],
            LogEntry::Complete { elapsed } => {
                vec![format!("⏱  Completed in {}", format_elapsed(*elapsed))]
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().find(|line| !line.trim().is_empty()).unwrap_or("").trim()
}

/// Instruction currently shown above the log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentInstruction {
    pub instruction: String,
    pub area_summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub info: SessionInfo,
    pub status: RunStatus,
    pub current: Option<CurrentInstruction>,
    log: Vec<LogEntry>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
    /// Set by every state change, cleared by the render loop after drawing
    pub needs_redraw: bool,
}

impl RenderState {
    pub fn new(info: SessionInfo) -> Self {
        Self {
            info,
            needs_redraw: true,
            ..Default::default()
        }
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Frozen duration of the last finished run
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    /// Time since the current run started, frozen once it finished
    pub fn running_for(&self, now: Instant) -> Option<Duration> {
        self.elapsed
            .or_else(|| self.started.map(|started| now.saturating_duration_since(started)))
    }

    pub fn apply(&mut self, event: BridgeEvent, now: Instant) {
        match event {
            BridgeEvent::Instruction { instruction, area_summary } => {
                if !self.log.is_empty() {
                    self.log.push(LogEntry::Separator);
                }
                self.log.push(LogEntry::Instruction {
                    instruction: instruction.clone(),
                    area_summary: area_summary.clone(),
                });
                self.current = Some(CurrentInstruction { instruction, area_summary });
                self.status = RunStatus::Processing;
                self.started = Some(now);
                self.elapsed = None;
            }
            BridgeEvent::Stream(event) => self.apply_stream(event, now),
        }
        self.needs_redraw = true;
    }

    fn apply_stream(&mut self, event: StreamEvent, now: Instant) {
        match event.kind {
            StreamEventKind::Content => {
                if !event.text.trim().is_empty() {
                    self.log.push(LogEntry::Content(event.text));
                }
            }
            StreamEventKind::ToolUse => self.log.push(LogEntry::ToolUse(event.text)),
            StreamEventKind::ToolResult => self.log.push(LogEntry::ToolResult),
            StreamEventKind::Complete => {
                let elapsed = self.finish(now);
                self.status = RunStatus::Complete;
                self.log.push(LogEntry::Complete { elapsed });
            }
            StreamEventKind::Error => {
                // In-stream errors show as failed until the exit-status event overrides them
                let elapsed = self.finish(now);
                self.status = RunStatus::Error;
                self.log.push(LogEntry::Error { message: event.text, elapsed });
            }
        }
    }

    fn finish(&mut self, now: Instant) -> Duration {
        let elapsed = self
            .started
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        self.elapsed = Some(elapsed);
        elapsed
    }

    /// Status line text for `now`
    pub fn status_line(&self, now: Instant) -> String {
        match self.status {
            RunStatus::Waiting => "● Waiting for instructions from the browser".to_string(),
            RunStatus::Processing => format!(
                "⏳ Processing… {}",
                format_elapsed(self.running_for(now).unwrap_or_default())
            ),
            RunStatus::Complete => "✓ Complete".to_string(),
            RunStatus::Error => "✗ Failed".to_string(),
        }
    }
}

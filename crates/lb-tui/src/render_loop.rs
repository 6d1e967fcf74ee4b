// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Render loop: the single owner of [`RenderState`]
//!
//! Pipeline events arrive on the render channel, keyboard input on a
//! dedicated crossterm reader thread. `q` or Ctrl-C cancels the shutdown
//! token; the caller observes the same token to stop the server.

use crate::error::TuiResult;
use crate::terminal::{self, TerminalConfig};
use crate::theme::Theme;
use crate::view;
use crate::view_model::{RenderState, RunStatus, SessionInfo};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lb_agent::BridgeEvent;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// How often the reader thread checks for shutdown between key presses
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Redraw cadence for the running timer
const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Resize,
}

/// Whether `key` asks to leave the application
pub fn is_quit(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Char('q') => key.modifiers.is_empty(),
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn spawn_input_thread(
    tx: mpsc::UnboundedSender<InputEvent>,
    shutdown: CancellationToken,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.is_cancelled() {
            match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    debug!("Terminal input closed: {}", e);
                    break;
                }
            }
            let input = match event::read() {
                Ok(Event::Key(key)) if is_quit(&key) => InputEvent::Quit,
                Ok(Event::Resize(_, _)) => InputEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Terminal input closed: {}", e);
                    break;
                }
            };
            if tx.send(input).is_err() {
                break;
            }
        }
    })
}

/// Run the full-screen view until `shutdown` is cancelled.
///
/// The terminal is restored on every exit path.
pub async fn run_tui(
    info: SessionInfo,
    mut events: mpsc::UnboundedReceiver<BridgeEvent>,
    shutdown: CancellationToken,
) -> TuiResult<()> {
    terminal::setup_terminal(TerminalConfig::default())?;

    let result = async {
        let mut terminal = Terminal::new(CrosstermBackend::new(std::io::stdout()))?;
        terminal.clear()?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let reader = spawn_input_thread(input_tx, shutdown.clone());

        let mut state = RenderState::new(info);
        let outcome = drive(
            &mut terminal,
            &mut state,
            &Theme::default(),
            &mut events,
            input_rx,
            &shutdown,
        )
        .await;

        // The reader notices the cancelled token within one poll interval.
        shutdown.cancel();
        let _ = tokio::task::spawn_blocking(move || reader.join()).await;
        outcome
    }
    .await;

    terminal::cleanup_terminal();
    result
}

/// Apply events and redraw on change until `shutdown` is cancelled
pub async fn drive<B: Backend>(
    terminal: &mut Terminal<B>,
    state: &mut RenderState,
    theme: &Theme,
    events: &mut mpsc::UnboundedReceiver<BridgeEvent>,
    mut input: mpsc::UnboundedReceiver<InputEvent>,
    shutdown: &CancellationToken,
) -> TuiResult<()> {
    let mut tick = tokio::time::interval(TICK);
    let mut events_open = true;
    let mut input_open = true;

    loop {
        if state.needs_redraw {
            terminal.draw(|frame| view::render(frame, state, theme, Instant::now()))?;
            state.needs_redraw = false;
        }

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    let now = Instant::now();
                    state.apply(event, now);
                    while let Ok(event) = events.try_recv() {
                        state.apply(event, now);
                    }
                }
                None => events_open = false,
            },
            input = input.recv(), if input_open => match input {
                Some(InputEvent::Quit) => {
                    debug!("Quit requested from the terminal");
                    shutdown.cancel();
                }
                Some(InputEvent::Resize) => {
                    terminal.autoresize()?;
                    state.needs_redraw = true;
                }
                None => input_open = false,
            },
            _ = tick.tick() => {
                if state.status == RunStatus::Processing {
                    trace!("Timer redraw");
                    state.needs_redraw = true;
                }
            }
        }
    }

    Ok(())
}

/// Plain console output for `--no-tui`: every log entry as it arrives
pub async fn run_console(
    mut events: mpsc::UnboundedReceiver<BridgeEvent>,
    shutdown: CancellationToken,
) {
    let mut state = RenderState::default();
    let mut printed = 0;

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else { break };

        state.apply(event, Instant::now());
        for entry in &state.log()[printed..] {
            for line in entry.display_lines() {
                println!("{line}");
            }
        }
        printed = state.log().len();
    }
}

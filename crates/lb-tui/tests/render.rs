// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use lb_agent::{BridgeEvent, StreamEvent};
use lb_tui::{create_test_terminal, drive, view, RenderState, SessionInfo, Theme};
use ratatui::buffer::Buffer;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn info() -> SessionInfo {
    SessionInfo {
        proxy_url: "http://localhost:9999".into(),
        target_url: "http://127.0.0.1:5173".into(),
        project_dir: "/work/app".into(),
    }
}

fn instruction(text: &str) -> BridgeEvent {
    BridgeEvent::Instruction {
        instruction: text.into(),
        area_summary: "Area: 300x120px with 4 elements".into(),
    }
}

/// Buffer rows as text. Wide glyphs leave a padding cell behind them, so
/// assertions stick to plain words.
fn rows(buffer: &Buffer) -> Vec<String> {
    (0..buffer.area().height)
        .map(|y| {
            (0..buffer.area().width)
                .map(|x| buffer.cell((x, y)).map(|cell| cell.symbol()).unwrap_or(" "))
                .collect::<String>()
        })
        .collect()
}

fn contains(buffer: &Buffer, needle: &str) -> bool {
    rows(buffer).iter().any(|row| row.contains(needle))
}

fn render(state: &RenderState, width: u16, height: u16, now: Instant) -> Buffer {
    let mut terminal = create_test_terminal(width, height).unwrap();
    terminal
        .draw(|frame| view::render(frame, state, &Theme::default(), now))
        .unwrap();
    terminal.backend().buffer().clone()
}

#[test]
fn idle_view_shows_header_and_waiting_status() {
    let state = RenderState::new(info());
    let buffer = render(&state, 80, 12, Instant::now());

    assert!(contains(&buffer, "Livebridge"));
    assert!(contains(&buffer, "http://localhost:9999"));
    assert!(contains(&buffer, "/work/app"));
    assert!(contains(&buffer, "Waiting for instructions from the browser"));
    assert!(contains(&buffer, "quit"));
}

#[test]
fn divider_is_capped_at_sixty_columns() {
    let state = RenderState::new(info());
    let buffer = render(&state, 100, 12, Instant::now());

    let divider = rows(&buffer)
        .into_iter()
        .find(|row| row.contains('━'))
        .unwrap();
    assert_eq!(divider.chars().filter(|c| *c == '━').count(), 60);
}

#[test]
fn completed_run_shows_log_and_duration() {
    let start = Instant::now();
    let mut state = RenderState::new(info());
    state.apply(instruction("Make the header sticky"), start);
    state.apply(StreamEvent::content("Updating the header styles").into(), start);
    state.apply(StreamEvent::tool_use("Edit").into(), start);
    state.apply(StreamEvent::tool_result("ok").into(), start);
    state.apply(StreamEvent::complete().into(), start + Duration::from_millis(4200));

    let buffer = render(&state, 80, 20, start + Duration::from_secs(30));

    assert!(contains(&buffer, "Make the header sticky"));
    assert!(contains(&buffer, "Area: 300x120px with 4 elements"));
    assert!(contains(&buffer, "Complete"));
    assert!(contains(&buffer, "Updating the header styles"));
    assert!(contains(&buffer, "Edit"));
    assert!(contains(&buffer, "Tool completed"));
    assert!(contains(&buffer, "Completed in 4.2s"));
}

#[test]
fn errors_are_shown_in_the_log() {
    let start = Instant::now();
    let mut state = RenderState::new(info());
    state.apply(instruction("Break things"), start);
    state.apply(StreamEvent::error("Exit code: 1").into(), start);

    let buffer = render(&state, 80, 16, start);
    assert!(contains(&buffer, "Exit code: 1"));
    assert!(contains(&buffer, "Failed"));
}

#[test]
fn log_follows_the_newest_entries() {
    let start = Instant::now();
    let mut state = RenderState::new(info());
    state.apply(instruction("Lots of output"), start);
    for n in 0..40 {
        state.apply(StreamEvent::content(format!("line number {n}")).into(), start);
    }

    let buffer = render(&state, 80, 14, start);
    assert!(contains(&buffer, "line number 39"));
    assert!(!contains(&buffer, "line number 0 "));
}

#[tokio::test]
async fn drive_applies_events_until_shutdown() {
    let mut terminal = create_test_terminal(80, 20).unwrap();
    let mut state = RenderState::new(info());
    let (tx, mut events) = mpsc::unbounded_channel();
    let (_input_tx, input) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    tx.send(instruction("Center the hero")).unwrap();
    tx.send(StreamEvent::tool_use("Bash").into()).unwrap();
    tx.send(StreamEvent::complete().into()).unwrap();
    drop(tx);

    let stopper = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        stopper.cancel();
    });

    drive(
        &mut terminal,
        &mut state,
        &Theme::default(),
        &mut events,
        input,
        &shutdown,
    )
    .await
    .unwrap();

    assert_eq!(state.log().len(), 3);
    let buffer = terminal.backend().buffer().clone();
    assert!(contains(&buffer, "Center the hero"));
    assert!(contains(&buffer, "Bash"));
    assert!(contains(&buffer, "Completed in"));
}

#[tokio::test]
async fn quit_input_cancels_shutdown() {
    let mut terminal = create_test_terminal(40, 10).unwrap();
    let mut state = RenderState::new(info());
    let (_tx, mut events) = mpsc::unbounded_channel();
    let (input_tx, input) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    input_tx.send(lb_tui::InputEvent::Quit).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        drive(
            &mut terminal,
            &mut state,
            &Theme::default(),
            &mut events,
            input,
            &shutdown,
        ),
    )
    .await
    .expect("quit ends the loop")
    .unwrap();

    assert!(shutdown.is_cancelled());
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Terminal setup and restore
//!
//! Raw mode and the alternate screen are tracked in statics so that cleanup
//! runs exactly once, whether from the normal exit path or the panic hook.

use crate::error::TuiResult;
use crossterm::{
    cursor::{Hide, Show},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

static CLEANUP_DONE: AtomicBool = AtomicBool::new(false);
static RAW_MODE_ENABLED: AtomicBool = AtomicBool::new(false);
static ALTERNATE_SCREEN_ACTIVE: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub raw_mode: bool,
    pub alternate_screen: bool,
    /// Restore the terminal before the default panic message prints
    pub panic_hook: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            raw_mode: true,
            alternate_screen: true,
            panic_hook: true,
        }
    }
}

pub fn setup_terminal(config: TerminalConfig) -> TuiResult<()> {
    let mut stdout = io::stdout();
    CLEANUP_DONE.store(false, Ordering::SeqCst);

    if config.raw_mode {
        crossterm::terminal::enable_raw_mode()?;
        RAW_MODE_ENABLED.store(true, Ordering::SeqCst);
    }

    if config.alternate_screen {
        stdout.execute(EnterAlternateScreen)?;
        ALTERNATE_SCREEN_ACTIVE.store(true, Ordering::SeqCst);
    }
    stdout.execute(Hide)?;

    if config.panic_hook && !PANIC_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        let default_panic = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            cleanup_terminal();
            default_panic(panic_info);
        }));
    }

    Ok(())
}

/// Undo [`setup_terminal`]. Safe to call more than once.
pub fn cleanup_terminal() {
    if CLEANUP_DONE.swap(true, Ordering::SeqCst) {
        return;
    }

    let mut stdout = io::stdout();
    let _ = stdout.execute(Show);

    if RAW_MODE_ENABLED.swap(false, Ordering::SeqCst) {
        let _ = crossterm::terminal::disable_raw_mode();
    }

    // Leave alternate screen last
    if ALTERNATE_SCREEN_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}

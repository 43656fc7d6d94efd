//! Display — the crawl dashboard collaborator (`SPEC_FULL.md` §5.H). The
//! design treats it as an external, named-interface collaborator rather
//! than a core component, so this gives it exactly one concrete realization
//! (`TerminalDisplay`, `crossterm`-backed) and one no-op realization
//! (`NullDisplay`, used for non-tty runs and tests).

use std::io::{self, Write as _};
use std::sync::Mutex;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};

/// The dashboard surface the crawl engine reports progress to.
pub trait Display: Send + Sync {
    fn update_current_url(&self, url: &str);
    fn update_current_local(&self, path: &str);
    fn update_status_code(&self, status: u16);
    fn update_operation_status(&self, status: &str);
    fn update_connection_state(&self, connected: bool);
    fn update_cache_status(&self, draining_len: usize, filling_len: usize);
    fn put_error_msg(&self, msg: &str);
    fn clear_error_msg(&self);
}

/// Discards every update. Used in tests and whenever stdout is not a tty.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn update_current_url(&self, _url: &str) {}
    fn update_current_local(&self, _path: &str) {}
    fn update_status_code(&self, _status: u16) {}
    fn update_operation_status(&self, _status: &str) {}
    fn update_connection_state(&self, _connected: bool) {}
    fn update_cache_status(&self, _draining_len: usize, _filling_len: usize) {}
    fn put_error_msg(&self, _msg: &str) {}
    fn clear_error_msg(&self) {}
}

#[derive(Debug, Default)]
struct DashboardState {
    current_url: String,
    current_local: String,
    status: u16,
    operation: String,
    connected: bool,
    draining_len: usize,
    filling_len: usize,
    error: Option<String>,
}

/// A fixed-cell terminal dashboard, one `Mutex<DashboardState>` guarding the
/// whole redraw so concurrent updates from the crawl thread never tear a
/// frame.
pub struct TerminalDisplay {
    state: Mutex<DashboardState>,
}

impl TerminalDisplay {
    #[must_use]
    pub fn new() -> Self {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Hide, Clear(ClearType::All));
        let _ = stdout.flush();
        Self {
            state: Mutex::new(DashboardState::default()),
        }
    }

    fn redraw(&self, state: &DashboardState) {
        let mut stdout = io::stdout();
        let _ = queue!(stdout, MoveTo(0, 0), Clear(ClearType::All));
        let _ = queue!(
            stdout,
            Print(format!("url:       {}\r\n", state.current_url)),
            Print(format!("local:     {}\r\n", state.current_local)),
            Print(format!("status:    {}\r\n", state.status)),
            Print(format!("operation: {}\r\n", state.operation)),
            SetForegroundColor(if state.connected { Color::Green } else { Color::Red }),
            Print(format!("connected: {}\r\n", state.connected)),
            ResetColor,
            Print(format!(
                "frontier:  draining={} filling={}\r\n",
                state.draining_len, state.filling_len
            )),
        );
        if let Some(err) = &state.error {
            let _ = queue!(
                stdout,
                SetForegroundColor(Color::Red),
                Print(format!("error:     {err}\r\n")),
                ResetColor
            );
        }
        let _ = stdout.flush();
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show);
    }
}

impl Display for TerminalDisplay {
    fn update_current_url(&self, url: &str) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.current_url = url.to_string();
        self.redraw(&state);
    }

    fn update_current_local(&self, path: &str) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.current_local = path.to_string();
        self.redraw(&state);
    }

    fn update_status_code(&self, status: u16) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.status = status;
        self.redraw(&state);
    }

    fn update_operation_status(&self, status: &str) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.operation = status.to_string();
        self.redraw(&state);
    }

    fn update_connection_state(&self, connected: bool) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.connected = connected;
        self.redraw(&state);
    }

    fn update_cache_status(&self, draining_len: usize, filling_len: usize) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.draining_len = draining_len;
        state.filling_len = filling_len;
        self.redraw(&state);
    }

    fn put_error_msg(&self, msg: &str) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.error = Some(msg.to_string());
        self.redraw(&state);
    }

    fn clear_error_msg(&self) {
        let mut state = self.state.lock().expect("display mutex poisoned");
        state.error = None;
        self.redraw(&state);
    }
}

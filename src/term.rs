use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use std::io;

/// Scoped raw-mode acquisition. Cooked mode is restored in `Drop`, which
/// runs on normal return, error propagation and panic unwinding alike, so
/// the user's shell is never left in raw mode.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn acquire() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Scoped alternate-screen acquisition, with the cursor hidden while the
/// screen is active. Same restoration guarantee as [`RawModeGuard`].
pub struct AlternateScreenGuard {
    _private: (),
}

impl AlternateScreenGuard {
    pub fn acquire() -> io::Result<Self> {
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(Self { _private: () })
    }
}

impl Drop for AlternateScreenGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    }
}

/// Block until one key press arrives. Escape sequences arrive as decoded
/// key events; in raw mode Ctrl+C is delivered here as an ordinary event
/// and the caller decides to treat it as an interrupt.
pub fn read_key() -> io::Result<KeyEvent> {
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(key);
            }
        }
    }
}

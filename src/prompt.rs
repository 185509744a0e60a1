//! Masked password prompt on the controlling terminal.
//!
//! The keystroke loop ([`read_masked`]) is independent of the terminal so it
//! can be driven by synthetic input. [`TerminalPrompt`] feeds it from
//! `crossterm` key events while raw mode is held by [`RawModeGuard`].
//! When stdin is not a terminal a single line is read instead.

use std::io::{self, BufRead, IsTerminal, Write};

use blogsync_core::contract::{CredentialPrompt, RemoteTarget, Secret};
use blogsync_core::error::{PublishError, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const MASK: char = '*';
pub const ERASE: &str = "\u{8} \u{8}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Char(char),
    Backspace,
    Enter,
    /// Ctrl-C.
    Interrupt,
    /// Anything else; ignored.
    Other,
}

impl From<KeyEvent> for Keystroke {
    fn from(key: KeyEvent) -> Self {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        // AltGr arrives as Control+Alt on Windows
        let alt_gr = control && key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Char('c') if control && !alt_gr => Keystroke::Interrupt,
            KeyCode::Char(c) if !control || alt_gr => Keystroke::Char(c),
            KeyCode::Backspace => Keystroke::Backspace,
            KeyCode::Enter => Keystroke::Enter,
            _ => Keystroke::Other,
        }
    }
}

/// Collects a secret from `keys`, echoing one mask per character to `echo`.
///
/// Input ends at Enter or when `keys` runs out. Ctrl-C yields an
/// `Interrupted` error.
pub fn read_masked<I, W>(keys: I, echo: &mut W) -> io::Result<Secret>
where
    I: IntoIterator<Item = io::Result<Keystroke>>,
    W: Write,
{
    let mut buffer = Zeroizing::new(String::new());
    for key in keys {
        match key? {
            Keystroke::Char(c) if !c.is_control() => {
                buffer.push(c);
                write!(echo, "{MASK}")?;
                echo.flush()?;
            }
            Keystroke::Backspace => {
                if buffer.pop().is_some() {
                    echo.write_all(ERASE.as_bytes())?;
                    echo.flush()?;
                }
            }
            Keystroke::Enter => break,
            Keystroke::Interrupt => {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "password prompt interrupted",
                ));
            }
            Keystroke::Char(_) | Keystroke::Other => {}
        }
    }
    Ok(Secret::new(std::mem::take(&mut *buffer)))
}

/// Prompt header shown before any input is read.
pub fn header(target: &RemoteTarget) -> String {
    format!(
        "Password for user {} on ftp host {}. Type enter to skip publishing.",
        target.user, target.host
    )
}

/// Restores cooked mode on drop, including on early return and panic unwinding.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self { active: true })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Err(e) = disable_raw_mode() {
                warn!(error = ?e, "[PROMPT] failed to restore terminal mode");
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    pub fn new() -> Self {
        Self
    }

    fn read_from_terminal(&self) -> io::Result<Secret> {
        let mut stdout = io::stdout();
        let secret = {
            let _raw = RawModeGuard::enable()?;
            read_masked(KeyEvents, &mut stdout)
        };
        // raw mode swallows the newline
        writeln!(stdout)?;
        secret
    }

    fn read_line(&self) -> io::Result<Secret> {
        let mut line = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut line)?;
        let trimmed = line.trim_end_matches(['\r', '\n']).to_string();
        Ok(Secret::new(trimmed))
    }
}

impl CredentialPrompt for TerminalPrompt {
    fn read_secret(&mut self, target: &RemoteTarget) -> Result<Secret> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", header(target)).map_err(PublishError::Prompt)?;
        stdout.flush().map_err(PublishError::Prompt)?;

        let interactive = io::stdin().is_terminal();
        debug!(interactive, "[PROMPT] reading password");
        let secret = if interactive {
            self.read_from_terminal()
        } else {
            self.read_line()
        };
        secret.map_err(PublishError::Prompt)
    }
}

/// Blocking iterator over key presses from the terminal.
struct KeyEvents;

impl Iterator for KeyEvents {
    type Item = io::Result<Keystroke>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    return Some(Ok(Keystroke::from(key)));
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

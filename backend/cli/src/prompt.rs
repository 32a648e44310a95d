//! Credential collection: e-mail line prompt and a no-echo password prompt.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use once_cell::sync::Lazy;
use regex::Regex;

pub const PASSWORD_ENV: &str = "FACTORIAL_PASSWORD";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_email(email: &str) -> Result<()> {
    if !is_valid_email(email) {
        bail!("'{email}' is not a valid e-mail address");
    }
    Ok(())
}

pub fn read_line(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

/// `FACTORIAL_PASSWORD` when set, otherwise prompt with echo off.
pub fn read_password(label: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            return Ok(password);
        }
    }

    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;

    let _raw = RawModeGuard::enable()?;
    let mut password = String::new();
    loop {
        let Event::Key(key) = event::read().context("Failed to read key")? else {
            continue;
        };
        match apply_key(&mut password, key) {
            KeyStep::Continue => {}
            KeyStep::Done => break,
            KeyStep::Abort => {
                write!(stdout, "\r\n")?;
                bail!("Password entry cancelled");
            }
        }
    }
    write!(stdout, "\r\n")?;
    stdout.flush()?;
    Ok(password)
}

#[derive(Debug, PartialEq, Eq)]
enum KeyStep {
    Continue,
    Done,
    Abort,
}

fn apply_key(buffer: &mut String, key: KeyEvent) -> KeyStep {
    if key.kind != KeyEventKind::Press {
        return KeyStep::Continue;
    }
    match key.code {
        KeyCode::Enter => KeyStep::Done,
        KeyCode::Esc => KeyStep::Abort,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyStep::Abort,
        KeyCode::Backspace => {
            buffer.pop();
            KeyStep::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            KeyStep::Continue
        }
        _ => KeyStep::Continue,
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to switch terminal to raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("first.last@mail.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("ana"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@@example.com"));
        assert!(validate_email("not an email").is_err());
    }

    #[test]
    fn typing_and_backspace_edit_the_buffer() {
        let mut buf = String::new();
        for c in "pas".chars() {
            assert_eq!(apply_key(&mut buf, press(KeyCode::Char(c))), KeyStep::Continue);
        }
        apply_key(&mut buf, press(KeyCode::Backspace));
        apply_key(&mut buf, press(KeyCode::Char('t')));
        assert_eq!(buf, "pat");
        assert_eq!(apply_key(&mut buf, press(KeyCode::Enter)), KeyStep::Done);
    }

    #[test]
    fn ctrl_c_aborts() {
        let mut buf = String::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_key(&mut buf, key), KeyStep::Abort);
        assert!(buf.is_empty());
    }
}

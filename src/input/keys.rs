//! Terminal key source.
//!
//! Reads crossterm events on a plain thread and forwards them to the
//! runtime's queue. The thread never touches engine state, so all
//! transitions still happen on the runtime task in arrival order.

use super::KeyInput;
use crate::catalog::QUIT_KEY;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often the reader checks whether the runtime is gone
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// DOM-style identifier for a key press
pub fn key_identifier(key: &KeyEvent) -> Option<String> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let name = match key.code {
        KeyCode::Char(c) => return Some(c.to_string()),
        KeyCode::Right => "ArrowRight",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Enter => "Enter",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        _ => return None,
    };
    Some(name.to_string())
}

pub fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if c == QUIT_KEY => true,
        KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Spawn the blocking reader. It exits once the receiver is dropped or the
/// terminal stops delivering events.
pub fn spawn_reader(tx: mpsc::Sender<KeyInput>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !tx.is_closed() {
            let ready = match event::poll(POLL_INTERVAL) {
                Ok(ready) => ready,
                Err(e) => {
                    tracing::error!("Key input failed: {}", e);
                    let _ = tx.blocking_send(KeyInput::Quit);
                    break;
                }
            };
            if !ready {
                continue;
            }

            let input = match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press && is_quit(&key) => {
                    KeyInput::Quit
                }
                Ok(Event::Key(key)) => match key_identifier(&key) {
                    Some(id) => KeyInput::Key(id),
                    None => continue,
                },
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!("Key input failed: {}", e);
                    let _ = tx.blocking_send(KeyInput::Quit);
                    break;
                }
            };

            if tx.blocking_send(input).is_err() {
                break;
            }
        }
        tracing::debug!("Key reader stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_identifiers() {
        assert_eq!(key_identifier(&press(KeyCode::Char('5'))).as_deref(), Some("5"));
        assert_eq!(key_identifier(&press(KeyCode::Right)).as_deref(), Some("ArrowRight"));
        assert_eq!(key_identifier(&press(KeyCode::Left)).as_deref(), Some("ArrowLeft"));
        assert_eq!(key_identifier(&press(KeyCode::F(5))), None);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut key = press(KeyCode::Char('1'));
        key.kind = KeyEventKind::Release;
        assert_eq!(key_identifier(&key), None);
    }

    #[test]
    fn test_quit_keys() {
        assert!(is_quit(&press(KeyCode::Char('q'))));
        assert!(is_quit(&press(KeyCode::Esc)));
        assert!(is_quit(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&press(KeyCode::Char('c'))));
    }
}

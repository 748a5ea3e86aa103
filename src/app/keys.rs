use crate::app::SelectorKey;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Releases and unbound keys map to `None`.
pub fn selector_key_from_event(key: KeyEvent) -> Option<SelectorKey> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    if control {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => Some(SelectorKey::Interrupt),
            KeyCode::Char('p') => Some(SelectorKey::Up),
            KeyCode::Char('n') => Some(SelectorKey::Down),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Up => Some(SelectorKey::Up),
        KeyCode::Down => Some(SelectorKey::Down),
        KeyCode::PageUp => Some(SelectorKey::PageUp),
        KeyCode::PageDown => Some(SelectorKey::PageDown),
        KeyCode::Enter => Some(SelectorKey::Enter),
        KeyCode::Esc => Some(SelectorKey::Escape),
        KeyCode::Backspace => Some(SelectorKey::Backspace),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
            Some(SelectorKey::Char(ch))
        }
        _ => None,
    }
}

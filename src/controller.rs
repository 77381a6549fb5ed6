use std::time::Duration;
use tracing::trace;

use gridview::domain::{Message, TVConfig, TVError};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('l') | KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown, _) => {
                Some(Message::NextPage)
            }
            (KeyCode::Char('h') | KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp, _) => {
                Some(Message::PrevPage)
            }
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char('z'), _) => Some(Message::CyclePageSize),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('f'), _) => Some(Message::Filter),
            (KeyCode::Tab, _) => Some(Message::NextFilterColumn),
            (KeyCode::BackTab, _) => Some(Message::PrevFilterColumn),
            (KeyCode::Char('c'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('s'), _) => Some(Message::SortAscending),
            (KeyCode::Char('S'), _) => Some(Message::SortDescending),
            (KeyCode::Char('x'), _) => Some(Message::Export),
            (KeyCode::Char('e') | KeyCode::Enter, _) => Some(Message::Edit),
            (KeyCode::Char('d'), _) => Some(Message::Delete),
            (KeyCode::Char('a'), _) => Some(Message::Add),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn key_bindings() {
        let controller = Controller::new(&TVConfig::default());
        assert_eq!(controller.handle_key(key(KeyCode::Char('q'))), Some(Message::Quit));
        assert_eq!(controller.handle_key(key(KeyCode::Char('/'))), Some(Message::Search));
        assert_eq!(controller.handle_key(key(KeyCode::Enter)), Some(Message::Edit));
        assert_eq!(controller.handle_key(key(KeyCode::Char('G'))), Some(Message::LastPage));
        assert_eq!(
            controller.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Message::Quit)
        );
        assert_eq!(controller.handle_key(key(KeyCode::Char('c'))), Some(Message::ClearFilters));
        assert_eq!(controller.handle_key(key(KeyCode::F(5))), None);
    }
}

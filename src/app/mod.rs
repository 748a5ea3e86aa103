mod keys;

pub use keys::selector_key_from_event;

use crate::domain::{SessionRecord, filter_records};
use thiserror::Error;

/// Records visible at once.
pub const PAGE_SIZE: usize = 8;

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("interactive selection needs a terminal on stdin and stdout")]
    NotATerminal,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectorState {
    Browsing,
    Searching,
    Selected(SessionRecord),
    Cancelled,
}

/// Input already decoded from terminal events.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SelectorKey {
    Up,
    Down,
    PageUp,
    PageDown,
    Char(char),
    Backspace,
    Enter,
    Escape,
    Interrupt,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectorOutcome {
    Selected(SessionRecord),
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct SelectorModel {
    records: Vec<SessionRecord>,
    filtered: Vec<SessionRecord>,
    query: String,
    cursor: usize,
    offset: usize,
    page_size: usize,
    pub state: SelectorState,
}

impl SelectorModel {
    pub fn new(records: Vec<SessionRecord>) -> Self {
        let filtered = records.clone();
        Self {
            records,
            filtered,
            query: String::new(),
            cursor: 0,
            offset: 0,
            page_size: PAGE_SIZE,
            state: SelectorState::Browsing,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self.scroll_to_cursor();
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Records in the window, with their position in the filtered list.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &SessionRecord)> {
        let end = (self.offset + self.page_size).min(self.filtered.len());
        (self.offset..end).map(|pos| (pos, &self.filtered[pos]))
    }

    pub fn is_searching(&self) -> bool {
        self.state == SelectorState::Searching
    }

    pub fn outcome(&self) -> Option<SelectorOutcome> {
        match &self.state {
            SelectorState::Selected(record) => Some(SelectorOutcome::Selected(record.clone())),
            SelectorState::Cancelled => Some(SelectorOutcome::Cancelled),
            SelectorState::Browsing | SelectorState::Searching => None,
        }
    }

    fn move_by(&mut self, delta: isize) {
        let Some(last) = self.filtered.len().checked_sub(1) else {
            self.cursor = 0;
            return;
        };
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.scroll_to_cursor();
    }

    fn scroll_to_cursor(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.page_size {
            self.offset = self.cursor + 1 - self.page_size;
        }
    }

    fn refilter(&mut self) {
        self.filtered = filter_records(&self.records, &self.query);
        self.cursor = 0;
        self.offset = 0;
    }

    fn confirm(&mut self) {
        if let Some(record) = self.filtered.get(self.cursor) {
            self.state = SelectorState::Selected(record.clone());
        }
    }

    fn page_delta(&self) -> isize {
        isize::try_from(self.page_size).unwrap_or(isize::MAX)
    }
}

pub fn update(model: SelectorModel, key: SelectorKey) -> SelectorModel {
    let mut model = model;
    if model.outcome().is_some() {
        return model;
    }

    match key {
        SelectorKey::Interrupt => {
            model.state = SelectorState::Cancelled;
            return model;
        }
        SelectorKey::Enter => {
            model.confirm();
            return model;
        }
        SelectorKey::Up => {
            model.move_by(-1);
            return model;
        }
        SelectorKey::Down => {
            model.move_by(1);
            return model;
        }
        SelectorKey::PageUp => {
            let delta = model.page_delta();
            model.move_by(-delta);
            return model;
        }
        SelectorKey::PageDown => {
            let delta = model.page_delta();
            model.move_by(delta);
            return model;
        }
        _ => {}
    }

    if model.is_searching() {
        update_searching(model, key)
    } else {
        update_browsing(model, key)
    }
}

fn update_browsing(mut model: SelectorModel, key: SelectorKey) -> SelectorModel {
    match key {
        SelectorKey::Char('/') => {
            model.state = SelectorState::Searching;
            model.query.clear();
            model.refilter();
        }
        SelectorKey::Char('q') | SelectorKey::Escape => {
            model.state = SelectorState::Cancelled;
        }
        _ => {}
    }
    model
}

fn update_searching(mut model: SelectorModel, key: SelectorKey) -> SelectorModel {
    match key {
        SelectorKey::Char(ch) if !ch.is_control() => {
            model.query.push(ch);
            model.refilter();
        }
        SelectorKey::Backspace => {
            if model.query.pop().is_some() {
                model.refilter();
            }
        }
        SelectorKey::Escape => {
            model.query.clear();
            model.state = SelectorState::Browsing;
            model.refilter();
        }
        _ => {}
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use time::macros::datetime;

    fn record(id: &str, title: &str) -> SessionRecord {
        SessionRecord {
            session_id: id.to_string(),
            project_path: PathBuf::from("/work").join(id),
            titles: if title.is_empty() {
                Vec::new()
            } else {
                vec![title.to_string()]
            },
            first_message: format!("first message of {id}"),
            message_count: 3,
            last_activity: datetime!(2025-01-01 00:00 UTC),
        }
    }

    fn model_with(count: usize) -> SelectorModel {
        SelectorModel::new(
            (0..count)
                .map(|idx| record(&format!("s{idx}"), &format!("Title {idx}")))
                .collect(),
        )
    }

    fn press(model: SelectorModel, keys: &[SelectorKey]) -> SelectorModel {
        keys.iter().fold(model, |model, key| update(model, *key))
    }

    fn type_text(model: SelectorModel, text: &str) -> SelectorModel {
        text.chars()
            .fold(model, |model, ch| update(model, SelectorKey::Char(ch)))
    }

    #[test]
    fn cursor_is_clamped_at_both_ends() {
        let model = model_with(3);
        let model = press(model, &[SelectorKey::Down; 10]);
        assert_eq!(model.cursor(), 2);

        let model = press(model, &[SelectorKey::Up; 10]);
        assert_eq!(model.cursor(), 0);
        assert_eq!(model.state, SelectorState::Browsing);
    }

    #[test]
    fn window_scrolls_minimally_to_keep_cursor_visible() {
        let model = model_with(20);
        let model = press(model, &[SelectorKey::Down; 8]);
        assert_eq!(model.cursor(), 8);
        assert_eq!(model.offset(), 1);

        let visible: Vec<_> = model.visible().map(|(pos, _)| pos).collect();
        assert_eq!(visible, (1..9).collect::<Vec<_>>());

        let model = press(model, &[SelectorKey::Up; 7]);
        assert_eq!(model.offset(), 1);
        let model = update(model, SelectorKey::Up);
        assert_eq!(model.offset(), 0);
    }

    #[test]
    fn page_keys_move_by_page_and_clamp() {
        let model = model_with(20);
        let model = update(model, SelectorKey::PageDown);
        assert_eq!(model.cursor(), 8);
        let model = press(model, &[SelectorKey::PageDown; 3]);
        assert_eq!(model.cursor(), 19);
        assert_eq!(model.offset(), 12);
        let model = update(model, SelectorKey::PageUp);
        assert_eq!(model.cursor(), 11);
    }

    #[test]
    fn unmatched_search_then_escape_restores_everything() {
        let model = press(model_with(5), &[SelectorKey::Down, SelectorKey::Down]);
        let model = update(model, SelectorKey::Char('/'));
        assert_eq!(model.state, SelectorState::Searching);

        let model = type_text(model, "zzz-no-match");
        assert_eq!(model.filtered_len(), 0);

        let model = update(model, SelectorKey::Escape);
        assert_eq!(model.state, SelectorState::Browsing);
        assert_eq!(model.query(), "");
        assert_eq!(model.filtered_len(), 5);
        assert_eq!(model.cursor(), 0);
    }

    #[test]
    fn search_filters_case_insensitively_and_backspace_widens() {
        let records = vec![
            record("a", "Add OAuth"),
            record("b", "Fix login"),
            record("c", ""),
        ];
        let model = update(SelectorModel::new(records), SelectorKey::Char('/'));
        let model = type_text(model, "OAUTHX");
        assert_eq!(model.filtered_len(), 0);

        let model = update(model, SelectorKey::Backspace);
        assert_eq!(model.query(), "OAUTH");
        let ids: Vec<_> = model.visible().map(|(_, r)| r.session_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn backspace_on_empty_query_is_a_no_op() {
        let model = update(model_with(2), SelectorKey::Char('/'));
        let model = update(model, SelectorKey::Backspace);
        assert_eq!(model.state, SelectorState::Searching);
        assert_eq!(model.query(), "");
    }

    #[test]
    fn q_cancels_while_browsing_but_is_text_while_searching() {
        let model = update(model_with(2), SelectorKey::Char('q'));
        assert_eq!(model.outcome(), Some(SelectorOutcome::Cancelled));

        let model = press(model_with(2), &[SelectorKey::Char('/'), SelectorKey::Char('q')]);
        assert_eq!(model.state, SelectorState::Searching);
        assert_eq!(model.query(), "q");
    }

    #[test]
    fn enter_selects_record_under_cursor() {
        let model = press(model_with(3), &[SelectorKey::Down, SelectorKey::Enter]);
        match model.outcome() {
            Some(SelectorOutcome::Selected(record)) => assert_eq!(record.session_id, "s1"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn enter_on_empty_filter_is_a_no_op() {
        let model = update(model_with(3), SelectorKey::Char('/'));
        let model = type_text(model, "nothing matches");
        let model = update(model, SelectorKey::Enter);
        assert_eq!(model.state, SelectorState::Searching);
        assert!(model.outcome().is_none());

        let empty = update(SelectorModel::new(Vec::new()), SelectorKey::Enter);
        assert_eq!(empty.state, SelectorState::Browsing);
    }

    #[test]
    fn interrupt_cancels_from_search() {
        let model = press(
            model_with(3),
            &[SelectorKey::Char('/'), SelectorKey::Char('x'), SelectorKey::Interrupt],
        );
        assert_eq!(model.outcome(), Some(SelectorOutcome::Cancelled));
    }

    #[test]
    fn keys_after_an_outcome_are_ignored() {
        let model = press(model_with(3), &[SelectorKey::Enter, SelectorKey::Char('q')]);
        assert!(matches!(model.outcome(), Some(SelectorOutcome::Selected(_))));
    }
}

use std::path::PathBuf;
use time::OffsetDateTime;

pub type SessionId = String;

/// Ordered title history for one session. Consecutive duplicates never occur.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TitleHistory {
    titles: Vec<String>,
    created: OffsetDateTime,
    last_updated: OffsetDateTime,
}

impl TitleHistory {
    pub fn new(title: String, now: OffsetDateTime) -> Self {
        Self {
            titles: vec![title],
            created: now,
            last_updated: now,
        }
    }

    /// Rebuilds a history read from disk. Returns `None` when `titles` is empty.
    pub fn from_parts(
        titles: Vec<String>,
        created: OffsetDateTime,
        last_updated: OffsetDateTime,
    ) -> Option<Self> {
        if titles.is_empty() {
            return None;
        }
        Some(Self {
            titles,
            created,
            last_updated,
        })
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn current(&self) -> Option<&str> {
        self.titles.last().map(|s| s.as_str())
    }

    pub fn created(&self) -> OffsetDateTime {
        self.created
    }

    pub fn last_updated(&self) -> OffsetDateTime {
        self.last_updated
    }

    pub fn push(&mut self, title: String, now: OffsetDateTime) {
        if self.current() != Some(title.as_str()) {
            self.titles.push(title);
        }
        if now > self.last_updated {
            self.last_updated = now;
        }
    }
}

/// Transcript facts for one session, as produced by agent-specific discovery.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveredSession {
    pub session_id: SessionId,
    pub project_path: PathBuf,
    pub first_message: String,
    pub message_count: usize,
    pub last_activity: OffsetDateTime,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub project_path: PathBuf,
    pub titles: Vec<String>,
    pub first_message: String,
    pub message_count: usize,
    pub last_activity: OffsetDateTime,
}

impl SessionRecord {
    pub fn has_titles(&self) -> bool {
        !self.titles.is_empty()
    }
}

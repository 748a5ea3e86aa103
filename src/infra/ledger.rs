use crate::domain::{DiscoveredSession, SessionId, TitleHistory, TitleSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

pub const LEDGER_DIR: &str = ".resume-sessions";
pub const LEDGER_FILE: &str = "sessions.json";

/// Title histories of one repository, keyed by session id.
///
/// Top-level document keys that do not hold a valid history are kept verbatim
/// in `preserved` and written back on save.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ledger {
    histories: BTreeMap<SessionId, TitleHistory>,
    preserved: BTreeMap<String, Value>,
}

impl Ledger {
    pub fn history(&self, session_id: &str) -> Option<&TitleHistory> {
        self.histories.get(session_id)
    }

    pub fn histories(&self) -> impl Iterator<Item = (&str, &TitleHistory)> {
        self.histories.iter().map(|(id, history)| (id.as_str(), history))
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Records `title` for `session_id`. Blank titles are ignored and return `None`.
    pub fn append_title(
        &mut self,
        session_id: &str,
        title: &str,
        now: OffsetDateTime,
    ) -> Option<&TitleHistory> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        self.preserved.remove(session_id);
        let history = self
            .histories
            .entry(session_id.to_string())
            .and_modify(|history| history.push(title.to_string(), now))
            .or_insert_with(|| TitleHistory::new(title.to_string(), now));
        Some(history)
    }
}

impl TitleSource for Ledger {
    fn history_for(&self, session: &DiscoveredSession) -> Option<&TitleHistory> {
        self.history(&session.session_id)
    }
}

/// Ledgers of every repository a set of discovered sessions belongs to.
#[derive(Clone, Debug, Default)]
pub struct ProjectLedgers {
    by_project: BTreeMap<PathBuf, Ledger>,
}

impl ProjectLedgers {
    pub fn load_for(sessions: &[DiscoveredSession]) -> Self {
        let mut by_project = BTreeMap::new();
        for session in sessions {
            if by_project.contains_key(&session.project_path) {
                continue;
            }
            let root = resolve_repo_root(&session.project_path);
            by_project.insert(session.project_path.clone(), load_ledger(&root));
        }
        Self { by_project }
    }
}

impl TitleSource for ProjectLedgers {
    fn history_for(&self, session: &DiscoveredSession) -> Option<&TitleHistory> {
        self.by_project
            .get(&session.project_path)
            .and_then(|ledger| ledger.history(&session.session_id))
    }
}

#[derive(Debug, Error)]
pub enum LoadLedgerError {
    #[error("failed to read ledger: {0}")]
    Read(#[from] io::Error),

    #[error("failed to parse ledger: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SaveLedgerError {
    #[error("failed to format ledger timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write ledger {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

pub fn ledger_path(repo_root: &Path) -> PathBuf {
    repo_root.join(LEDGER_DIR).join(LEDGER_FILE)
}

/// Nearest ancestor of `start` (inclusive) containing `.git`, else `start` itself.
pub fn resolve_repo_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .unwrap_or(start)
        .to_path_buf()
}

/// Never fails: a missing, unreadable or malformed ledger reads as empty.
pub fn load_ledger(repo_root: &Path) -> Ledger {
    match read_ledger(repo_root) {
        Ok(ledger) => ledger,
        Err(error) => {
            tracing::debug!(
                path = %ledger_path(repo_root).display(),
                %error,
                "ledger unreadable, starting empty"
            );
            Ledger::default()
        }
    }
}

pub fn read_ledger(repo_root: &Path) -> Result<Ledger, LoadLedgerError> {
    let path = ledger_path(repo_root);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(Ledger::default());
        }
        Err(error) => return Err(error.into()),
    };

    let document: BTreeMap<String, Value> = serde_json::from_str(&raw)?;
    let mut ledger = Ledger::default();
    for (key, value) in document {
        match history_from_value(&value) {
            Some(history) => {
                ledger.histories.insert(key, history);
            }
            None => {
                ledger.preserved.insert(key, value);
            }
        }
    }
    Ok(ledger)
}

pub fn save_ledger(repo_root: &Path, ledger: &Ledger) -> Result<PathBuf, SaveLedgerError> {
    let path = ledger_path(repo_root);
    let text = render_ledger(ledger)?;
    write_atomic(&path, text.as_bytes()).map_err(|source| SaveLedgerError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Load, append, save. Returns the updated history, or `None` for a blank title.
pub fn record_title(
    repo_root: &Path,
    session_id: &str,
    title: &str,
    now: OffsetDateTime,
) -> Result<Option<TitleHistory>, SaveLedgerError> {
    let mut ledger = load_ledger(repo_root);
    let Some(history) = ledger.append_title(session_id, title, now).cloned() else {
        return Ok(None);
    };
    save_ledger(repo_root, &ledger)?;
    Ok(Some(history))
}

fn render_ledger(ledger: &Ledger) -> Result<String, SaveLedgerError> {
    let mut document: BTreeMap<String, Value> = ledger.preserved.clone();
    for (session_id, history) in &ledger.histories {
        let entry = LedgerEntry {
            titles: history.titles().to_vec(),
            created: history.created().format(&Rfc3339)?,
            last_updated: history.last_updated().format(&Rfc3339)?,
        };
        document.insert(session_id.clone(), serde_json::to_value(entry)?);
    }
    let mut text = serde_json::to_string_pretty(&document)?;
    text.push('\n');
    Ok(text)
}

fn history_from_value(value: &Value) -> Option<TitleHistory> {
    let entry = LedgerEntry::deserialize(value).ok()?;
    let created = OffsetDateTime::parse(&entry.created, &Rfc3339).ok()?;
    let last_updated = OffsetDateTime::parse(&entry.last_updated, &Rfc3339).ok()?;
    TitleHistory::from_parts(entry.titles, created, last_updated)
}

/// Writes `bytes` to a uniquely named sibling file, syncs it, then renames it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| LEDGER_FILE.to_string());
    let tmp = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    let written = write_then_rename(&tmp, path, bytes);
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct LedgerEntry {
    titles: Vec<String>,
    created: String,
    last_updated: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::macros::datetime;

    #[test]
    fn duplicate_append_is_idempotent_and_timestamps_follow_writes() {
        let t0 = datetime!(2025-01-01 10:00 UTC);
        let t1 = datetime!(2025-01-01 11:00 UTC);
        let t2 = datetime!(2025-01-01 12:00 UTC);

        let mut ledger = Ledger::default();
        ledger.append_title("s1", "Fix bug", t0);
        ledger.append_title("s1", "Fix bug", t1);
        ledger.append_title("s1", "Add tests", t2);

        let history = ledger.history("s1").expect("history");
        assert_eq!(history.titles(), ["Fix bug", "Add tests"]);
        assert_eq!(history.created(), t0);
        assert_eq!(history.last_updated(), t2);
    }

    #[test]
    fn non_repeating_sequence_is_kept_verbatim() {
        let now = datetime!(2025-01-01 10:00 UTC);
        let sequence = ["A", "B", "A", "C", "B"];
        let mut ledger = Ledger::default();
        for title in sequence {
            ledger.append_title("s", title, now);
        }
        assert_eq!(ledger.history("s").expect("history").titles(), sequence);
    }

    #[test]
    fn blank_titles_are_ignored() {
        let now = datetime!(2025-01-01 10:00 UTC);
        let mut ledger = Ledger::default();
        assert!(ledger.append_title("s", "   \n", now).is_none());
        assert!(ledger.is_empty());

        ledger.append_title("s", "  Trimmed  ", now);
        assert_eq!(ledger.history("s").expect("history").titles(), ["Trimmed"]);
    }

    #[test]
    fn missing_and_corrupt_ledgers_load_empty() {
        let dir = tempdir().expect("tempdir");
        assert!(load_ledger(dir.path()).is_empty());

        fs::create_dir_all(dir.path().join(LEDGER_DIR)).expect("mkdir");
        fs::write(ledger_path(dir.path()), "{ not json").expect("write");
        assert!(load_ledger(dir.path()).is_empty());

        fs::write(ledger_path(dir.path()), "[1, 2, 3]").expect("write");
        assert!(load_ledger(dir.path()).is_empty());
    }

    #[test]
    fn save_creates_directory_and_round_trips_byte_for_byte() {
        let dir = tempdir().expect("tempdir");
        let mut ledger = Ledger::default();
        ledger.append_title("b-session", "Second", datetime!(2025-01-02 00:00 UTC));
        ledger.append_title("a-session", "First", datetime!(2025-01-01 00:00 UTC));

        let path = save_ledger(dir.path(), &ledger).expect("save");
        assert!(path.is_file());
        let first = fs::read_to_string(&path).expect("read");

        let reloaded = load_ledger(dir.path());
        assert_eq!(reloaded, ledger);
        save_ledger(dir.path(), &reloaded).expect("save again");
        let second = fs::read_to_string(&path).expect("read");
        assert_eq!(first, second);
        assert!(first.find("a-session") < first.find("b-session"));
    }

    #[test]
    fn unknown_top_level_keys_survive_a_rewrite() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join(LEDGER_DIR)).expect("mkdir");
        fs::write(
            ledger_path(dir.path()),
            r#"{
  "_schema": 2,
  "s1": {"titles": ["Old"], "created": "2025-01-01T00:00:00+00:00", "last_updated": "2025-01-01T00:00:00Z"}
}"#,
        )
        .expect("write");

        let history = record_title(dir.path(), "s1", "New", datetime!(2025-02-01 00:00 UTC))
            .expect("record")
            .expect("history");
        assert_eq!(history.titles(), ["Old", "New"]);

        let raw = fs::read_to_string(ledger_path(dir.path())).expect("read");
        let value: Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["_schema"], 2);
        assert_eq!(value["s1"]["titles"], serde_json::json!(["Old", "New"]));
        assert_eq!(value["s1"]["last_updated"], "2025-02-01T00:00:00Z");
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempdir().expect("tempdir");
        record_title(dir.path(), "s", "Title", datetime!(2025-01-01 00:00 UTC)).expect("record");
        let names: Vec<_> = fs::read_dir(dir.path().join(LEDGER_DIR))
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![LEDGER_FILE.to_string()]);
    }

    #[test]
    fn save_failure_is_reported_not_panicked() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a dir").expect("write");

        let mut ledger = Ledger::default();
        ledger.append_title("s", "Title", datetime!(2025-01-01 00:00 UTC));
        let error = save_ledger(&blocker, &ledger).expect_err("should fail");
        assert!(matches!(error, SaveLedgerError::Write { .. }));
    }

    #[test]
    fn repo_root_is_nearest_git_ancestor() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join(".git")).expect("git");
        let nested = dir.path().join("crates").join("core");
        fs::create_dir_all(&nested).expect("nested");

        assert_eq!(resolve_repo_root(&nested), dir.path());

        let plain = tempdir().expect("tempdir");
        assert_eq!(resolve_repo_root(plain.path()), plain.path());
    }
}

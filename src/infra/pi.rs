use crate::domain::{DiscoveredSession, TranscriptLine, parse_pi_transcript_line};
use dirs::home_dir;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use walkdir::WalkDir;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScanWarningCount(usize);

impl From<usize> for ScanWarningCount {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl ScanWarningCount {
    pub fn get(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Error)]
pub enum ScanPiSessionsError {
    #[error("sessions directory does not exist: {0}")]
    SessionsDirMissing(String),
}

#[derive(Debug, Error)]
pub enum ResolvePiDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

pub fn resolve_pi_agent_dir() -> Result<PathBuf, ResolvePiDirError> {
    if let Some(override_dir) = std::env::var_os("PI_AGENT_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = home_dir() else {
        return Err(ResolvePiDirError::HomeDirNotFound);
    };

    Ok(home.join(".pi").join("agent"))
}

pub fn resolve_pi_sessions_dir() -> Result<PathBuf, ResolvePiDirError> {
    if let Some(override_dir) = std::env::var_os("PI_SESSIONS_DIR") {
        return Ok(PathBuf::from(override_dir));
    }
    Ok(resolve_pi_agent_dir()?.join("sessions"))
}

#[derive(Clone, Debug)]
pub struct ScanOutput {
    pub sessions: Vec<DiscoveredSession>,
    pub warnings: ScanWarningCount,
}

/// Every `*.jsonl` under `sessions_dir` is one session; its parent directory names the project.
pub fn scan_pi_sessions_dir(
    sessions_dir: &Path,
    home: Option<&Path>,
) -> Result<ScanOutput, ScanPiSessionsError> {
    if !sessions_dir.exists() {
        return Err(ScanPiSessionsError::SessionsDirMissing(
            sessions_dir.display().to_string(),
        ));
    }

    let mut warnings = 0usize;
    let mut sessions: Vec<DiscoveredSession> = Vec::new();

    let walker = WalkDir::new(sessions_dir).follow_links(false).into_iter();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_error) => {
                warnings += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        let Some(session_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warnings += 1;
            continue;
        };
        let project_key = path
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let summary = summarize_pi_transcript(path);
        warnings += summary.warnings;
        sessions.push(DiscoveredSession {
            session_id: session_id.to_string(),
            project_path: decode_project_key(&project_key, home),
            first_message: summary.first_message,
            message_count: summary.message_count,
            last_activity: summary.modified,
        });
    }

    Ok(ScanOutput {
        sessions,
        warnings: ScanWarningCount::from(warnings),
    })
}

#[derive(Clone, Debug)]
pub struct TranscriptSummary {
    pub first_message: String,
    pub message_count: usize,
    pub modified: OffsetDateTime,
    pub warnings: usize,
}

/// Unreadable files and malformed lines degrade to empty fields plus a warning.
pub fn summarize_pi_transcript(path: &Path) -> TranscriptSummary {
    let mut first_message = String::new();
    let mut message_count = 0usize;
    let mut warnings = 0usize;

    match File::open(path) {
        Ok(file) => {
            for line in BufReader::new(file).lines() {
                let Ok(line) = line else {
                    warnings += 1;
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match parse_pi_transcript_line(line) {
                    Ok(TranscriptLine::UserMessage { text }) => {
                        message_count += 1;
                        if first_message.is_empty() {
                            if let Some(text) = text {
                                first_message = text;
                            }
                        }
                    }
                    Ok(TranscriptLine::OtherMessage) => message_count += 1,
                    Ok(TranscriptLine::NotAMessage) => {}
                    Err(_) => warnings += 1,
                }
            }
        }
        Err(_) => warnings += 1,
    }

    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(OffsetDateTime::from)
        .unwrap_or_else(|_| OffsetDateTime::now_utc());

    TranscriptSummary {
        first_message,
        message_count,
        modified,
        warnings,
    }
}

/// Pi stores `/Users/me/my-app` under `--Users-me-my-app--`. The encoding is lossy,
/// so paths below `home` are resolved against directories that actually exist.
pub fn decode_project_key(key: &str, home: Option<&Path>) -> PathBuf {
    let encoded = key.trim_matches('-');

    if let Some(home) = home {
        let home_encoded = home
            .to_string_lossy()
            .trim_start_matches('/')
            .replace('/', "-");
        if let Some(rest) = encoded.strip_prefix(home_encoded.as_str()) {
            if !home_encoded.is_empty() && (rest.is_empty() || rest.starts_with('-')) {
                let rest = rest.trim_start_matches('-');
                if rest.is_empty() {
                    return home.to_path_buf();
                }
                return resolve_encoded_path(home, rest)
                    .unwrap_or_else(|| home.join(rest.replace('-', "/")));
            }
        }
    }

    PathBuf::from(format!("/{}", encoded.replace('-', "/")))
}

/// Greedy: the longest dash-joined prefix naming an existing directory wins.
fn resolve_encoded_path(base: &Path, encoded: &str) -> Option<PathBuf> {
    let parts: Vec<&str> = encoded.split('-').collect();
    for take in (1..=parts.len()).rev() {
        let candidate = base.join(parts[..take].join("-"));
        if !candidate.exists() {
            continue;
        }
        let rest = parts[take..].join("-");
        if rest.is_empty() {
            return Some(candidate);
        }
        if let Some(resolved) = resolve_encoded_path(&candidate, &rest) {
            return Some(resolved);
        }
    }
    None
}

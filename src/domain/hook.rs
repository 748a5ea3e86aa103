use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookParseError {
    #[error("invalid hook payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Claude Code hook payload, tagged by `hook_event_name`.
#[derive(Debug, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum HookEvent {
    PostToolUse(PostToolUseEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct PostToolUseEvent {
    pub session_id: String,
    pub cwd: PathBuf,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: BashToolInput,
    #[serde(default)]
    pub tool_response: BashToolResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct BashToolInput {
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BashToolResponse {
    #[serde(default)]
    pub stderr: String,
}

pub fn parse_hook_event(raw: &str) -> Result<HookEvent, HookParseError> {
    Ok(serde_json::from_str(raw)?)
}

/// Per-invocation context threaded through hook handling.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HookContext {
    pub session_id: String,
    pub cwd: PathBuf,
}

/// A title the ledger of `target_dir`'s repository should record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TitleUpdate {
    pub context: HookContext,
    pub target_dir: PathBuf,
    pub title: String,
}

/// Turns a successful `git commit` Bash call into a title update.
pub fn title_update_from_event(event: &HookEvent, home: Option<&Path>) -> Option<TitleUpdate> {
    let HookEvent::PostToolUse(event) = event else {
        return None;
    };
    if event.tool_name != "Bash" {
        return None;
    }
    let command = event.tool_input.command.as_str();
    if !command.contains("git commit") {
        return None;
    }
    if event.tool_response.stderr.to_lowercase().contains("error") {
        return None;
    }
    if event.session_id.trim().is_empty() {
        return None;
    }

    let title = extract_commit_message(command)?;
    let context = HookContext {
        session_id: event.session_id.clone(),
        cwd: event.cwd.clone(),
    };
    let target_dir = resolve_command_cwd(command, &context.cwd, home);
    Some(TitleUpdate {
        context,
        target_dir,
        title,
    })
}

/// First line of the `-m`/`--message` argument of a `git commit` command.
pub fn extract_commit_message(command: &str) -> Option<String> {
    let commit_at = command.find("git commit")?;
    let rest = &command[commit_at..];

    let mut search_from = 0usize;
    while let Some(flag_end) = find_message_flag(&rest[search_from..]) {
        let after_flag = &rest[search_from + flag_end..];
        if let Some(message) = quoted_argument(after_flag) {
            let first_line = message.lines().next().unwrap_or("").trim();
            if first_line.is_empty() {
                return None;
            }
            return Some(first_line.to_string());
        }
        search_from += flag_end;
    }
    None
}

/// Byte offset just past the next `--message`, `--message=`, `-m` or `-am`-style flag.
fn find_message_flag(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let is_delimiter =
        |b: Option<u8>| b.is_some_and(|b| b.is_ascii_whitespace() || b == b'"' || b == b'\'');

    let mut idx = 0usize;
    while idx < bytes.len() {
        let at_token_start = idx == 0 || bytes[idx - 1].is_ascii_whitespace();
        if !at_token_start || bytes[idx] != b'-' {
            idx += 1;
            continue;
        }

        let token = &text[idx..];
        if token.starts_with("--message=") {
            return Some(idx + "--message=".len());
        }
        if token.starts_with("--message")
            && is_delimiter(bytes.get(idx + "--message".len()).copied())
        {
            return Some(idx + "--message".len());
        }
        if bytes.get(idx + 1).is_some_and(|b| *b != b'-') {
            let letters = token[1..]
                .bytes()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
            let end = idx + 1 + letters;
            if letters > 0 && bytes[end - 1] == b'm' && is_delimiter(bytes.get(end).copied()) {
                return Some(end);
            }
        }
        idx += 1;
    }
    None
}

fn quoted_argument(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let quote = text.chars().next().filter(|ch| *ch == '"' || *ch == '\'')?;
    let body = &text[quote.len_utf8()..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

/// Applies a leading `cd <dir>` in `command` to `cwd`.
pub fn resolve_command_cwd(command: &str, cwd: &Path, home: Option<&Path>) -> PathBuf {
    let Some(target) = cd_target(command) else {
        return cwd.to_path_buf();
    };

    let expanded = match (target.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(target),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

fn cd_target(command: &str) -> Option<&str> {
    let trimmed = command.trim_start();
    let rest = trimmed.strip_prefix("cd")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let end = rest
        .find(|ch: char| ch.is_whitespace() || ch == '&' || ch == ';')
        .unwrap_or(rest.len());
    let target = rest[..end].trim_matches(|ch| ch == '"' || ch == '\'');
    if target.is_empty() { None } else { Some(target) }
}

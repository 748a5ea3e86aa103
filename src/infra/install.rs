use crate::infra::{resolve_pi_agent_dir, write_atomic};
use dirs::home_dir;
use serde_json::{Map, Value, json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PI_HOOK_FILE: &str = "resume-sessions.ts";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookAgent {
    Pi,
    ClaudeCode,
}

impl HookAgent {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pi" => Some(Self::Pi),
            "claude-code" | "claude" => Some(Self::ClaudeCode),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pi => "pi",
            Self::ClaudeCode => "claude-code",
        }
    }
}

#[derive(Debug, Error)]
pub enum InstallHookError {
    #[error("home directory not found")]
    HomeDirNotFound,

    #[error("failed to locate the resume-sessions executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("{path} is not valid JSON, refusing to overwrite it: {source}")]
    ParseSettings {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path}: {reason}")]
    UnexpectedSettingsShape { path: PathBuf, reason: &'static str },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

impl From<crate::infra::ResolvePiDirError> for InstallHookError {
    fn from(error: crate::infra::ResolvePiDirError) -> Self {
        match error {
            crate::infra::ResolvePiDirError::HomeDirNotFound => Self::HomeDirNotFound,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstallOutcome {
    pub path: PathBuf,
    pub changed: bool,
}

pub fn resolve_claude_config_dir() -> Result<PathBuf, InstallHookError> {
    if let Some(override_dir) = std::env::var_os("CLAUDE_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let Some(home) = home_dir() else {
        return Err(InstallHookError::HomeDirNotFound);
    };

    Ok(home.join(".claude"))
}

pub fn install_hook(agent: HookAgent) -> Result<InstallOutcome, InstallHookError> {
    let exe = std::env::current_exe().map_err(InstallHookError::CurrentExe)?;
    match agent {
        HookAgent::Pi => install_pi_hook(&resolve_pi_agent_dir()?, &exe),
        HookAgent::ClaudeCode => install_claude_code_hook(&resolve_claude_config_dir()?, &exe),
    }
}

pub fn claude_hook_command(exe: &Path) -> String {
    format!("{} hook claude-code", shell_quote(&exe.to_string_lossy()))
}

/// Adds a `PostToolUse` Bash hook to `<claude_dir>/settings.json`, keeping every other setting.
pub fn install_claude_code_hook(
    claude_dir: &Path,
    exe: &Path,
) -> Result<InstallOutcome, InstallHookError> {
    let path = claude_dir.join("settings.json");
    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) if raw.trim().is_empty() => Value::Object(Map::new()),
        Ok(raw) => serde_json::from_str(&raw).map_err(|source| {
            InstallHookError::ParseSettings {
                path: path.clone(),
                source,
            }
        })?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => Value::Object(Map::new()),
        Err(source) => {
            return Err(InstallHookError::Read {
                path: path.clone(),
                source,
            });
        }
    };

    let command = claude_hook_command(exe);
    let changed = add_post_tool_use_hook(&mut settings, &command).map_err(|reason| {
        InstallHookError::UnexpectedSettingsShape {
            path: path.clone(),
            reason,
        }
    })?;

    if changed {
        let mut text = serde_json::to_string_pretty(&settings)?;
        text.push('\n');
        write_atomic(&path, text.as_bytes()).map_err(|source| InstallHookError::Write {
            path: path.clone(),
            source,
        })?;
    }
    Ok(InstallOutcome { path, changed })
}

/// Returns `false` when an identical command is already registered.
pub fn add_post_tool_use_hook(settings: &mut Value, command: &str) -> Result<bool, &'static str> {
    let root = settings
        .as_object_mut()
        .ok_or("settings root is not an object")?;
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or("\"hooks\" is not an object")?;
    let post_tool_use = hooks
        .entry("PostToolUse")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or("\"hooks.PostToolUse\" is not an array")?;

    let already_installed = post_tool_use.iter().any(|matcher| {
        matcher
            .get("hooks")
            .and_then(Value::as_array)
            .is_some_and(|hooks| {
                hooks
                    .iter()
                    .any(|hook| hook.get("command").and_then(Value::as_str) == Some(command))
            })
    });
    if already_installed {
        return Ok(false);
    }

    post_tool_use.push(json!({
        "matcher": "Bash",
        "hooks": [{ "type": "command", "command": command }],
    }));
    Ok(true)
}

pub fn install_pi_hook(agent_dir: &Path, exe: &Path) -> Result<InstallOutcome, InstallHookError> {
    let path = agent_dir.join("hooks").join(PI_HOOK_FILE);
    let script = render_pi_hook(exe)?;

    let changed = match fs::read_to_string(&path) {
        Ok(existing) => existing != script,
        Err(error) if error.kind() == io::ErrorKind::NotFound => true,
        Err(source) => {
            return Err(InstallHookError::Read {
                path: path.clone(),
                source,
            });
        }
    };
    if changed {
        write_atomic(&path, script.as_bytes()).map_err(|source| InstallHookError::Write {
            path: path.clone(),
            source,
        })?;
    }
    Ok(InstallOutcome { path, changed })
}

fn render_pi_hook(exe: &Path) -> Result<String, serde_json::Error> {
    let exe_literal = serde_json::to_string(&exe.to_string_lossy())?;
    Ok(PI_HOOK_TEMPLATE.replace("__RESUME_SESSIONS_EXE__", &exe_literal))
}

fn shell_quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '.' | '_' | '-' | '+'));
    if plain && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

const PI_HOOK_TEMPLATE: &str = r#"/**
 * resume-sessions hook for the Pi coding agent.
 * A successful `git commit` turns the first line of its message into the session title.
 */
import type { HookAPI } from "@mariozechner/pi-coding-agent/hooks";
import { execFileSync } from "node:child_process";
import * as path from "node:path";

const RESUME_SESSIONS = __RESUME_SESSIONS_EXE__;

let currentSessionId: string | null = null;

function extractCommitMessage(command: string): string | null {
  const match = command.match(/(?:-m|--message)[\s=]+(["'])([\s\S]*?)\1/);
  if (!match) return null;
  const firstLine = match[2].split("\n")[0].trim();
  return firstLine || null;
}

function extractCwd(command: string, defaultCwd: string): string {
  const cdMatch = command.match(/^\s*cd\s+([^\s&;]+)/);
  if (!cdMatch) return defaultCwd;
  let target = cdMatch[1].replace(/^["']|["']$/g, "");
  if (target.startsWith("~")) {
    target = target.replace("~", process.env.HOME || "");
  }
  return path.resolve(defaultCwd, target);
}

export default function (pi: HookAPI) {
  pi.on("session", async (event, ctx) => {
    if ((event.reason === "start" || event.reason === "switch") && ctx.sessionFile) {
      currentSessionId = path.basename(ctx.sessionFile).replace(/\.jsonl$/, "");
    }
  });

  pi.on("tool_result", async (event, ctx) => {
    if (event.toolName !== "bash" || event.isError || !currentSessionId) return undefined;

    const command = event.input.command as string;
    if (!command.includes("git commit")) return undefined;

    const message = extractCommitMessage(command);
    if (!message) return undefined;

    try {
      execFileSync(
        RESUME_SESSIONS,
        [
          "title",
          "--cwd",
          extractCwd(command, ctx.cwd),
          "--quiet",
          "--",
          currentSessionId,
          message,
        ],
        { stdio: ["ignore", "inherit", "ignore"] },
      );
    } catch {}
    return undefined;
  });
}
"#;

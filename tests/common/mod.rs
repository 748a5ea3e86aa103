use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

pub struct CliOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the binary with `home` as HOME and every agent directory pointed inside it.
pub fn run_cli(home: &Path, cwd: &Path, args: &[&str], stdin: &str) -> CliOutput {
    run_cli_with_env(home, cwd, args, stdin, &[])
}

pub fn run_cli_with_env(
    home: &Path,
    cwd: &Path,
    args: &[&str],
    stdin: &str,
    env: &[(&str, &Path)],
) -> CliOutput {
    let mut command = Command::new(env!("CARGO_BIN_EXE_resume-sessions"));
    command
        .args(args)
        .current_dir(cwd)
        .env("HOME", home)
        .env("PI_SESSIONS_DIR", home.join(".pi/agent/sessions"))
        .env("PI_AGENT_DIR", home.join(".pi/agent"))
        .env("CLAUDE_CONFIG_DIR", home.join(".claude"))
        .env("NO_COLOR", "1")
        .env_remove("RESUME_SESSIONS_LOG")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        command.env(key, value);
    }

    let mut child = command.spawn().expect("failed to spawn binary");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");

    let output = child.wait_with_output().expect("wait");
    CliOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Strips OSC title sequences so assertions see only printed text.
pub fn visible_text(stdout: &str) -> String {
    let mut out = String::new();
    let mut rest = stdout;
    while let Some(start) = rest.find("\x1b]0;") {
        out.push_str(&rest[..start]);
        match rest[start..].find('\x07') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResumeSessionError {
    #[error("failed to launch `pi --resume {session_id}`: {source}")]
    Launch { session_id: String, source: io::Error },
}

/// Runs `pi --resume <id>` in the session's project directory and waits for it.
///
/// A project directory that no longer exists falls back to the current one.
pub fn resume_pi_session(
    session_id: &str,
    project_path: &Path,
) -> Result<ExitStatus, ResumeSessionError> {
    let mut command = Command::new("pi");
    command.arg("--resume").arg(session_id);
    if project_path.is_dir() {
        command.current_dir(project_path);
    } else {
        tracing::warn!(
            path = %project_path.display(),
            "project directory missing, resuming from the current directory"
        );
    }

    command.status().map_err(|source| ResumeSessionError::Launch {
        session_id: session_id.to_string(),
        source,
    })
}

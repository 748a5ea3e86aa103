use crate::domain::{
    SessionRecord, build_records, format_titles, parse_hook_event, title_update_from_event,
};
use crate::infra::{
    HookAgent, InstallHookError, ProjectLedgers, ResolvePiDirError, ResumeSessionError,
    SaveLedgerError, ScanPiSessionsError, install_hook, load_ledger, record_title,
    resolve_pi_sessions_dir, resolve_repo_root, resume_pi_session, scan_pi_sessions_dir,
    set_terminal_title,
};
use crate::ui::{DisplayContext, enhanced_record_lines, ledger_list_line, simple_record_line};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use thiserror::Error;
use time::OffsetDateTime;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Command(CliCommand),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliCommand {
    Title {
        repo: RepoLocation,
        session_id: String,
        title: String,
        quiet: bool,
    },
    Show {
        repo: RepoLocation,
        session_id: String,
    },
    List {
        repo: RepoLocation,
    },
    Resume(ResumeOptions),
    Install {
        agent: HookAgent,
    },
    Hook {
        agent: HookAgent,
    },
}

/// Where a ledger command finds its repository root.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum RepoLocation {
    /// Nearest ancestor of the current directory containing `.git`.
    #[default]
    CurrentDir,
    /// `--repo PATH`: used as the root as given.
    Root(PathBuf),
    /// `--cwd PATH`: nearest ancestor of PATH containing `.git`.
    Within(PathBuf),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResumeOptions {
    pub limit: usize,
    pub project: Option<String>,
    pub simple: bool,
    pub interactive: bool,
    pub run: bool,
}

impl Default for ResumeOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            project: None,
            simple: false,
            interactive: false,
            run: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliParseError {
    #[error("unknown subcommand: {0}")]
    UnknownSubcommand(String),

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("unknown agent: {0} (expected pi or claude-code)")]
    UnknownAgent(String),

    #[error("`hook` only supports claude-code; the pi hook calls `title` directly")]
    UnsupportedHookAgent,
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    let before_separator = || args.iter().skip(1).take_while(|arg| *arg != "--");
    if before_separator().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if before_separator().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut iter = args.iter().skip(1);
    let Some(subcommand) = iter.next() else {
        return Ok(CliInvocation::PrintHelp);
    };

    let command = match subcommand.as_str() {
        "title" => {
            let parsed = parse_ledger_args(iter, true)?;
            let [session_id, title] =
                expect_positionals(parsed.positionals, ["session-id", "title"])?;
            CliCommand::Title {
                repo: parsed.repo,
                session_id,
                title,
                quiet: parsed.quiet,
            }
        }
        "show" => {
            let parsed = parse_ledger_args(iter, false)?;
            let [session_id] = expect_positionals(parsed.positionals, ["session-id"])?;
            CliCommand::Show {
                repo: parsed.repo,
                session_id,
            }
        }
        "list" => {
            let parsed = parse_ledger_args(iter, false)?;
            let [] = expect_positionals(parsed.positionals, [])?;
            CliCommand::List { repo: parsed.repo }
        }
        "resume" => CliCommand::Resume(parse_resume_options(iter)?),
        "install" => {
            let [agent] = expect_positionals(iter.cloned().collect(), ["agent"])?;
            CliCommand::Install {
                agent: parse_agent(&agent)?,
            }
        }
        "hook" => {
            let [agent] = expect_positionals(iter.cloned().collect(), ["agent"])?;
            match parse_agent(&agent)? {
                HookAgent::ClaudeCode => CliCommand::Hook {
                    agent: HookAgent::ClaudeCode,
                },
                HookAgent::Pi => return Err(CliParseError::UnsupportedHookAgent),
            }
        }
        other => return Err(CliParseError::UnknownSubcommand(other.to_string())),
    };
    Ok(CliInvocation::Command(command))
}

#[derive(Debug, Default)]
struct LedgerArgs {
    repo: RepoLocation,
    quiet: bool,
    positionals: Vec<String>,
}

fn parse_ledger_args<'a>(
    mut args: impl Iterator<Item = &'a String>,
    allow_quiet: bool,
) -> Result<LedgerArgs, CliParseError> {
    let mut parsed = LedgerArgs::default();
    let mut flags_done = false;

    while let Some(arg) = args.next() {
        if flags_done {
            parsed.positionals.push(arg.to_string());
            continue;
        }
        match arg.as_str() {
            "--repo" | "-r" => {
                let value = args
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--repo".to_string()))?;
                parsed.repo = RepoLocation::Root(PathBuf::from(value));
            }
            "--cwd" | "-C" => {
                let value = args
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--cwd".to_string()))?;
                parsed.repo = RepoLocation::Within(PathBuf::from(value));
            }
            "--quiet" | "-q" if allow_quiet => parsed.quiet = true,
            "--" => flags_done = true,
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(CliParseError::UnknownFlag(arg.to_string()));
            }
            _ => parsed.positionals.push(arg.to_string()),
        }
    }
    Ok(parsed)
}

fn expect_positionals<const N: usize>(
    positionals: Vec<String>,
    names: [&'static str; N],
) -> Result<[String; N], CliParseError> {
    if positionals.len() > N {
        return Err(CliParseError::UnexpectedArgument(positionals[N].clone()));
    }
    if positionals.len() < N {
        return Err(CliParseError::MissingArgument(names[positionals.len()]));
    }
    positionals
        .try_into()
        .map_err(|_: Vec<String>| CliParseError::MissingArgument(names[0]))
}

fn parse_resume_options<'a>(
    mut args: impl Iterator<Item = &'a String>,
) -> Result<ResumeOptions, CliParseError> {
    let mut options = ResumeOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--limit" | "-n" => {
                let value = args
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--limit".to_string()))?;
                options.limit = parse_usize_flag("--limit", value)?;
            }
            "--project" | "-p" => {
                let value = args
                    .next()
                    .ok_or_else(|| CliParseError::MissingFlagValue("--project".to_string()))?;
                options.project = Some(value.to_string());
            }
            "--simple" => options.simple = true,
            "--interactive" | "-i" => options.interactive = true,
            "--run" => {
                options.run = true;
                options.interactive = true;
            }
            _ if arg.starts_with('-') => {
                return Err(CliParseError::UnknownFlag(arg.to_string()));
            }
            _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
        }
    }
    Ok(options)
}

fn parse_agent(value: &str) -> Result<HookAgent, CliParseError> {
    HookAgent::parse(value.trim()).ok_or_else(|| CliParseError::UnknownAgent(value.to_string()))
}

fn parse_usize_flag(flag: &str, value: &str) -> Result<usize, CliParseError> {
    value
        .parse::<usize>()
        .map_err(|_| CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        })
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    ResolvePiDir(#[from] ResolvePiDirError),

    #[error(transparent)]
    SaveLedger(#[from] SaveLedgerError),

    #[error(transparent)]
    Install(#[from] InstallHookError),

    #[error(transparent)]
    Resume(#[from] ResumeSessionError),

    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Process-wide inputs resolved once in `main`.
#[derive(Clone, Debug)]
pub struct CliEnv {
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    pub now: OffsetDateTime,
    pub color: bool,
}

impl CliEnv {
    pub fn detect() -> Result<Self, CliRunError> {
        Ok(Self {
            cwd: std::env::current_dir().map_err(CliRunError::CurrentDir)?,
            home: dirs::home_dir(),
            now: OffsetDateTime::now_utc(),
            color: should_color_stdout(),
        })
    }

    fn repo_root(&self, repo: &RepoLocation) -> PathBuf {
        match repo {
            RepoLocation::CurrentDir => resolve_repo_root(&self.cwd),
            RepoLocation::Root(root) => self.cwd.join(root),
            RepoLocation::Within(dir) => resolve_repo_root(&self.cwd.join(dir)),
        }
    }

    pub fn display_context(&self) -> DisplayContext {
        DisplayContext {
            now: self.now,
            home: self.home.clone(),
        }
    }
}

fn should_color_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    io::stdout().is_terminal()
}

/// Runs every non-interactive command. `resume -i` goes through `main`'s selector loop.
pub fn run(command: CliCommand, env: &CliEnv) -> Result<(), CliRunError> {
    let mut out = io::stdout().lock();

    match command {
        CliCommand::Title {
            repo,
            session_id,
            title,
            quiet,
        } => {
            let repo_root = env.repo_root(&repo);
            match record_title(&repo_root, &session_id, &title, env.now)? {
                Some(history) => {
                    set_terminal_title(history.current().unwrap_or_default());
                    if quiet {
                        return Ok(());
                    }
                    let _ = write_line(
                        &mut out,
                        &format!("Session titled: {}", format_titles(history.titles())),
                    )?;
                }
                None => {
                    tracing::debug!(%session_id, "blank title ignored");
                }
            }
        }
        CliCommand::Show { repo, session_id } => {
            let ledger = load_ledger(&env.repo_root(&repo));
            let line = match ledger.history(&session_id) {
                Some(history) => format_titles(history.titles()),
                None => format!("No titles recorded for {session_id}"),
            };
            let _ = write_line(&mut out, &line)?;
        }
        CliCommand::List { repo } => {
            let ledger = load_ledger(&env.repo_root(&repo));
            if ledger.is_empty() {
                let _ = write_line(&mut out, "No sessions found.")?;
            }
            for (session_id, history) in ledger.histories() {
                if !write_line(&mut out, &ledger_list_line(session_id, history))? {
                    break;
                }
            }
        }
        CliCommand::Resume(options) => {
            let Some(records) = load_resume_records(&mut out, &options, env)? else {
                return Ok(());
            };
            print_records(&mut out, &records, &options, env)?;
        }
        CliCommand::Install { agent } => {
            let outcome = install_hook(agent)?;
            let status = if outcome.changed {
                "Installed"
            } else {
                "Already installed"
            };
            let _ = write_line(
                &mut out,
                &format!("{status} {} hook: {}", agent.label(), outcome.path.display()),
            )?;
            let _ = write_line(&mut out, "")?;
            let _ = write_line(
                &mut out,
                "After git commits, the commit message (first line) becomes the session title.",
            )?;
            let _ = write_line(
                &mut out,
                "Titles are saved to .resume-sessions/sessions.json in each repo.",
            )?;
        }
        CliCommand::Hook { agent: _ } => {
            let mut raw = String::new();
            if let Err(error) = io::stdin().read_to_string(&mut raw) {
                tracing::warn!(%error, "failed to read hook payload");
                return Ok(());
            }
            handle_claude_hook(&raw, env);
        }
    }

    Ok(())
}

/// Never fails: a hook must not break the agent that invoked it.
pub fn handle_claude_hook(raw: &str, env: &CliEnv) {
    let event = match parse_hook_event(raw) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "ignoring hook payload");
            return;
        }
    };
    let Some(update) = title_update_from_event(&event, env.home.as_deref()) else {
        return;
    };

    let repo_root = resolve_repo_root(&update.target_dir);
    match record_title(&repo_root, &update.context.session_id, &update.title, env.now) {
        Ok(Some(_)) => set_terminal_title(&update.title),
        Ok(None) => {}
        Err(error) => {
            tracing::warn!(
                session_id = %update.context.session_id,
                repo = %repo_root.display(),
                %error,
                "failed to record session title"
            );
        }
    }
}

/// Discovers, filters and sorts Pi sessions. `None` means a message was already printed.
pub fn load_resume_records(
    out: &mut impl Write,
    options: &ResumeOptions,
    env: &CliEnv,
) -> Result<Option<Vec<SessionRecord>>, CliRunError> {
    let sessions_dir = resolve_pi_sessions_dir()?;
    let scan = match scan_pi_sessions_dir(&sessions_dir, env.home.as_deref()) {
        Ok(scan) => scan,
        Err(ScanPiSessionsError::SessionsDirMissing(dir)) => {
            tracing::debug!(%dir, "Pi sessions directory missing");
            let _ = write_line(out, "No Pi sessions found.")?;
            return Ok(None);
        }
    };
    if scan.warnings.get() > 0 {
        tracing::debug!(warnings = scan.warnings.get(), "skipped unreadable transcript data");
    }
    if scan.sessions.is_empty() {
        let _ = write_line(out, "No Pi sessions found.")?;
        return Ok(None);
    }

    let mut sessions = scan.sessions;
    if let Some(project) = options.project.as_deref() {
        let needle = project.to_lowercase();
        sessions.retain(|session| {
            session
                .project_path
                .to_string_lossy()
                .to_lowercase()
                .contains(&needle)
        });
    }

    let ledgers = ProjectLedgers::load_for(&sessions);
    let mut records = build_records(sessions, &ledgers);
    if !options.interactive {
        records.truncate(options.limit);
    }

    if records.is_empty() {
        let _ = write_line(out, "No matching sessions found.")?;
        return Ok(None);
    }
    Ok(Some(records))
}

fn print_records(
    out: &mut impl Write,
    records: &[SessionRecord],
    options: &ResumeOptions,
    env: &CliEnv,
) -> Result<(), CliRunError> {
    let ctx = env.display_context();
    for (idx, record) in records.iter().enumerate() {
        if options.simple {
            if !write_line(out, &simple_record_line(record, &ctx))? {
                return Ok(());
            }
            continue;
        }

        if idx > 0 && !write_line(out, "")? {
            return Ok(());
        }
        for line in enhanced_record_lines(record, &ctx) {
            if !write_line(out, &line.render(env.color))? {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Reports or launches the session chosen in the selector.
pub fn finish_selection(
    record: Option<SessionRecord>,
    options: &ResumeOptions,
) -> Result<(), CliRunError> {
    let Some(record) = record else {
        return Ok(());
    };
    let mut out = io::stdout().lock();

    if options.run {
        let _ = write_line(
            &mut out,
            &format!("Resuming session in {}...", record.project_path.display()),
        )?;
        drop(out);
        let status = resume_pi_session(&record.session_id, &record.project_path)?;
        if !status.success() {
            tracing::warn!(%status, "pi exited unsuccessfully");
        }
        return Ok(());
    }

    let _ = write_line(&mut out, &format!("Selected: {}", record.session_id))?;
    let _ = write_line(&mut out, "")?;
    let _ = write_line(
        &mut out,
        &format!("To resume: pi --resume {}", record.session_id),
    )?;
    Ok(())
}

pub fn write_line(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{line}") {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(error) => Err(error),
    }
}

mod app;
mod cli;
mod domain;
mod infra;
mod logging;
mod ui;

use crate::app::{PAGE_SIZE, SelectorError, SelectorModel, SelectorOutcome};
use crate::cli::{CliCommand, CliEnv, CliInvocation, ResumeOptions};
use crate::ui::{DisplayContext, InlineRenderer, selector_frame, selector_frame_height};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::size as terminal_size;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::{self, IsTerminal, Stdout, Write};
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Cli(#[from] crate::cli::CliRunError),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

fn main() {
    logging::init_logging();
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help(&mut err);
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help(&mut io::stdout().lock());
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Command(CliCommand::Resume(options)) if options.interactive => {
            let env = CliEnv::detect()?;
            run_interactive_resume(&options, &env)
        }
        CliInvocation::Command(command) => {
            let env = CliEnv::detect()?;
            crate::cli::run(command, &env)?;
            Ok(())
        }
    }
}

fn print_help(out: &mut impl Write) {
    let text = format!(
        "{name} - title history for AI coding-agent sessions\n\nUSAGE:\n  {name} title [--repo PATH | --cwd DIR] [-q] <session-id> <title>\n                                                    Record a title (first line of a commit message)\n  {name} show [--repo PATH | --cwd DIR] <session-id>  Print a session's title history\n  {name} list [--repo PATH | --cwd DIR]               List every titled session in the repo\n  {name} resume [-n N] [-p PROJECT] [--simple] [-i] [--run]\n                                                    Show recent Pi sessions with their titles\n  {name} install <pi|claude-code>                  Install the commit hook for an agent\n  {name} hook claude-code                          Handle a Claude Code hook payload on stdin\n  {name} --help | --version\n\nLEDGER FLAGS:\n  -r, --repo PATH      Use PATH as the repository root\n  -C, --cwd DIR        Use the nearest ancestor of DIR containing .git\n  -q, --quiet          title: only rename the terminal tab\n\nRESUME FLAGS:\n  -n, --limit N        Max sessions to print (default: {limit})\n  -p, --project TEXT   Only sessions whose project path contains TEXT\n  --simple             One line per session\n  -i, --interactive    Pick a session with a searchable list\n  --run                Pick a session and run `pi --resume` in its project (implies -i)\n\nSELECTOR KEYS:\n  Up/Down, PageUp/PageDown  Move\n  /                         Search (Esc clears)\n  Enter                     Select\n  q, Esc, Ctrl+C            Quit\n\nFILES:\n  <repo>/.resume-sessions/sessions.json   Title ledger (repo = nearest ancestor with .git)\n\nENV:\n  PI_SESSIONS_DIR       Override Pi sessions dir (default: ~/.pi/agent/sessions)\n  PI_AGENT_DIR          Override Pi agent dir used by `install pi` (default: ~/.pi/agent)\n  CLAUDE_CONFIG_DIR     Override Claude Code config dir (default: ~/.claude)\n  RESUME_SESSIONS_LOG   Log filter, e.g. debug (falls back to RUST_LOG; default: warn)\n  NO_COLOR              Disable styled output\n",
        name = env!("CARGO_PKG_NAME"),
        limit = crate::cli::DEFAULT_LIMIT,
    );
    let _ = write!(out, "{text}");
}

fn run_interactive_resume(options: &ResumeOptions, env: &CliEnv) -> Result<(), MainError> {
    let records = {
        let mut out = io::stdout().lock();
        match crate::cli::load_resume_records(&mut out, options, env)? {
            Some(records) => records,
            None => return Ok(()),
        }
    };

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err(SelectorError::NotATerminal.into());
    }

    let model = SelectorModel::new(records);
    let selected = match run_selector(model, &env.display_context(), env.color)? {
        SelectorOutcome::Selected(record) => Some(record),
        SelectorOutcome::Cancelled => None,
    };
    crate::cli::finish_selection(selected, options)?;
    Ok(())
}

/// Largest page that fits `rows`, leaving one row for the cursor.
fn page_size_for_rows(rows: u16) -> usize {
    let rows = usize::from(rows).saturating_sub(1);
    (1..=PAGE_SIZE)
        .rev()
        .find(|page| selector_frame_height(*page) <= rows)
        .unwrap_or(1)
}

fn run_selector(
    model: SelectorModel,
    ctx: &DisplayContext,
    color: bool,
) -> Result<SelectorOutcome, SelectorError> {
    let (width, rows) = terminal_size().unwrap_or((80, 24));
    let model = model.with_page_size(page_size_for_rows(rows));
    let mut renderer = InlineRenderer::new(color);
    let mut stdout = io::stdout();

    enable_raw_mode()?;
    let _ = execute!(stdout, Hide);
    let result = selector_loop(&mut stdout, &mut renderer, model, ctx, width);
    let _ = renderer.clear(&mut stdout);
    let _ = execute!(stdout, Show);
    disable_raw_mode()?;
    result
}

fn selector_loop(
    stdout: &mut Stdout,
    renderer: &mut InlineRenderer,
    model: SelectorModel,
    ctx: &DisplayContext,
    width: u16,
) -> Result<SelectorOutcome, SelectorError> {
    let mut model = model;
    let mut width = usize::from(width);

    loop {
        renderer.draw(stdout, &selector_frame(&model, ctx, width))?;

        match event::read()? {
            Event::Key(key) => {
                if let Some(key) = crate::app::selector_key_from_event(key) {
                    model = crate::app::update(model, key);
                }
            }
            Event::Resize(columns, rows) => {
                width = usize::from(columns);
                model = model.with_page_size(page_size_for_rows(rows));
            }
            _ => {}
        }

        if let Some(outcome) = model.outcome() {
            return Ok(outcome);
        }
    }
}

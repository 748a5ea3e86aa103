mod theme;

use crate::app::SelectorModel;
use crate::domain::{
    SessionRecord, TitleHistory, clip_to_width, display_project_path, format_date_minute,
    format_message_count, format_relative_time, format_titles_within, normalize_whitespace,
    started_at_from_session_id, truncate_end, truncate_start,
};
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::macros::format_description;
use unicode_width::UnicodeWidthStr;

pub const SELECTOR_HEADER: &str =
    "Resume Session  ↑↓ navigate · Enter select · / search · q quit";

const ENHANCED_TEXT_WIDTH: usize = 70;
const ENHANCED_PROJECT_WIDTH: usize = 25;
const SIMPLE_TITLE_WIDTH: usize = 50;
const SIMPLE_PROJECT_WIDTH: usize = 30;
const SELECTOR_INDENT: &str = "    ";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineRole {
    Header,
    Prompt,
    Title,
    Selected,
    Detail,
    Meta,
    Footer,
    Notice,
    Plain,
    Blank,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StyledLine {
    pub text: String,
    pub role: LineRole,
}

impl StyledLine {
    pub fn new(text: impl Into<String>, role: LineRole) -> Self {
        Self {
            text: text.into(),
            role,
        }
    }

    pub fn blank() -> Self {
        Self::new(String::new(), LineRole::Blank)
    }

    pub fn render(&self, color: bool) -> String {
        if !color || self.text.is_empty() {
            return self.text.clone();
        }
        theme::style_for(self.role).apply(&self.text).to_string()
    }
}

/// Clock and home directory every record line is rendered against.
#[derive(Clone, Debug)]
pub struct DisplayContext {
    pub now: OffsetDateTime,
    pub home: Option<PathBuf>,
}

impl DisplayContext {
    fn project(&self, record: &SessionRecord) -> String {
        display_project_path(&record.project_path, self.home.as_deref())
    }
}

/// Title history (or first message) over a dim first message over `time · count · project`.
pub fn enhanced_record_lines(record: &SessionRecord, ctx: &DisplayContext) -> Vec<StyledLine> {
    let first_message = truncate_end(
        &normalize_whitespace(&record.first_message),
        ENHANCED_TEXT_WIDTH,
    );

    let mut lines = Vec::with_capacity(3);
    if record.has_titles() {
        lines.push(StyledLine::new(
            format_titles_within(&record.titles, ENHANCED_TEXT_WIDTH),
            LineRole::Title,
        ));
        if !first_message.is_empty() {
            lines.push(StyledLine::new(format!("  {first_message}"), LineRole::Detail));
        }
    } else if first_message.is_empty() {
        lines.push(StyledLine::new("(empty session)", LineRole::Title));
    } else {
        lines.push(StyledLine::new(first_message, LineRole::Title));
    }

    lines.push(StyledLine::new(
        format!(
            "  {} · {} · {}",
            format_relative_time(record.last_activity, ctx.now),
            format_message_count(record.message_count),
            truncate_start(&ctx.project(record), ENHANCED_PROJECT_WIDTH)
        ),
        LineRole::Meta,
    ));
    lines
}

/// `YYYY-MM-DD HH:MM  <project>  <titles>` on one line.
pub fn simple_record_line(record: &SessionRecord, ctx: &DisplayContext) -> String {
    let started_at = started_at_from_session_id(&record.session_id)
        .unwrap_or_else(|| format_date_minute(record.last_activity));
    let project = truncate_start(&ctx.project(record), SIMPLE_PROJECT_WIDTH);
    let titles = if record.has_titles() {
        format_titles_within(&record.titles, SIMPLE_TITLE_WIDTH)
    } else {
        "(no title)".to_string()
    };
    format!(
        "{started_at}  {}  {titles}",
        pad_to_width(&project, SIMPLE_PROJECT_WIDTH)
    )
}

pub fn ledger_list_line(session_id: &str, history: &TitleHistory) -> String {
    let id: String = session_id.chars().take(12).collect();
    let updated = history
        .last_updated()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .unwrap_or_default();
    format!(
        "{id}  {updated}  {}",
        crate::domain::format_titles(history.titles())
    )
}

fn pad_to_width(text: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(text);
    let mut out = text.to_string();
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

fn selector_record_lines(
    record: &SessionRecord,
    selected: bool,
    ctx: &DisplayContext,
    width: usize,
) -> Vec<StyledLine> {
    let marker = if selected { "› " } else { "  " };
    let text_width = width.saturating_sub(SELECTOR_INDENT.len()).max(10);
    let first_message = normalize_whitespace(&record.first_message);
    let head_role = if selected {
        LineRole::Selected
    } else {
        LineRole::Plain
    };

    let mut lines = Vec::with_capacity(3);
    if record.has_titles() {
        let titles = format_titles_within(&record.titles, text_width);
        lines.push(StyledLine::new(
            format!("{marker}{}", truncate_end(&titles, text_width)),
            head_role,
        ));
        if !first_message.is_empty() {
            lines.push(StyledLine::new(
                format!("{SELECTOR_INDENT}{}", truncate_end(&first_message, text_width)),
                LineRole::Detail,
            ));
        }
    } else {
        let head = if first_message.is_empty() {
            "(empty session)".to_string()
        } else {
            truncate_end(&first_message, text_width)
        };
        lines.push(StyledLine::new(format!("{marker}{head}"), head_role));
    }

    lines.push(StyledLine::new(
        format!(
            "{SELECTOR_INDENT}{} · {} · {}",
            format_relative_time(record.last_activity, ctx.now),
            format_message_count(record.message_count),
            ctx.project(record)
        ),
        LineRole::Meta,
    ));
    lines
}

/// Every line of one selector frame, clipped to `width` columns.
pub fn selector_frame(
    model: &SelectorModel,
    ctx: &DisplayContext,
    width: usize,
) -> Vec<StyledLine> {
    let mut lines = vec![
        StyledLine::new(SELECTOR_HEADER, LineRole::Header),
        StyledLine::blank(),
    ];

    if model.is_searching() || !model.query().is_empty() {
        lines.push(StyledLine::new(
            format!("Search: {}_", model.query()),
            LineRole::Prompt,
        ));
        lines.push(StyledLine::blank());
    }

    let total = model.filtered_len();
    if total == 0 {
        lines.push(StyledLine::new("No matching sessions", LineRole::Notice));
    } else {
        let mut last_pos = model.offset();
        for (pos, record) in model.visible() {
            if pos > model.offset() {
                lines.push(StyledLine::blank());
            }
            let selected = pos == model.cursor();
            lines.extend(selector_record_lines(record, selected, ctx, width));
            last_pos = pos;
        }
        lines.push(StyledLine::blank());
        lines.push(StyledLine::new(
            format!("{}-{} of {total}", model.offset() + 1, last_pos + 1),
            LineRole::Footer,
        ));
    }

    let clip = width.saturating_sub(1).max(1);
    for line in &mut lines {
        line.text = clip_to_width(&line.text, clip);
    }
    lines
}

/// Lines a frame needs for `records_per_page` records of at most three lines each.
pub fn selector_frame_height(records_per_page: usize) -> usize {
    // header + blank, prompt + blank, blank + footer, plus a blank between records
    6 + records_per_page * 4
}

/// Redraws frames in place below the cursor without taking over the screen.
#[derive(Debug)]
pub struct InlineRenderer {
    previous_lines: usize,
    color: bool,
}

impl InlineRenderer {
    pub fn new(color: bool) -> Self {
        Self {
            previous_lines: 0,
            color,
        }
    }

    pub fn draw(&mut self, out: &mut impl Write, lines: &[StyledLine]) -> io::Result<()> {
        self.move_to_frame_start(out)?;
        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                queue!(out, Print("\r\n"))?;
            }
            queue!(
                out,
                Clear(ClearType::CurrentLine),
                Print(line.render(self.color))
            )?;
        }
        // Whatever the previous, taller frame left below us.
        queue!(out, Clear(ClearType::FromCursorDown))?;
        out.flush()?;
        self.previous_lines = lines.len();
        Ok(())
    }

    /// Erases the last frame and leaves the cursor where it started.
    pub fn clear(&mut self, out: &mut impl Write) -> io::Result<()> {
        self.move_to_frame_start(out)?;
        queue!(out, Clear(ClearType::FromCursorDown))?;
        out.flush()?;
        self.previous_lines = 0;
        Ok(())
    }

    fn move_to_frame_start(&self, out: &mut impl Write) -> io::Result<()> {
        let up = self.previous_lines.saturating_sub(1);
        if up > 0 {
            queue!(out, MoveUp(u16::try_from(up).unwrap_or(u16::MAX)))?;
        }
        queue!(out, MoveToColumn(0))
    }
}

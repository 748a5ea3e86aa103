use std::io::{self, Write};

/// Renames the terminal tab with OSC 0. Write failures are ignored.
pub fn set_terminal_title(title: &str) {
    let mut out = io::stdout().lock();
    let _ = write_terminal_title(&mut out, title);
}

pub fn write_terminal_title(out: &mut impl Write, title: &str) -> io::Result<()> {
    let sanitized: String = title
        .chars()
        .filter(|ch| !ch.is_control())
        .collect();
    write!(out, "\x1b]0;{sanitized}\x07")?;
    out.flush()
}

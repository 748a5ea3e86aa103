use unicode_width::UnicodeWidthStr;

pub const MAX_WIDTH: usize = 80;

const SEPARATOR: &str = " · ";
const ELLIPSIS: &str = " ··· ";

/// Renders a title history on one line within [`MAX_WIDTH`] columns.
///
/// - `[]` renders as `""`
/// - `["A"]` renders as `"A"`
/// - `["A", "B"]` renders as `"A · B"` no matter how long
/// - three or more titles that overflow collapse to `"first ··· prev · last"`
pub fn format_titles(titles: &[String]) -> String {
    format_titles_within(titles, MAX_WIDTH)
}

pub fn format_titles_within(titles: &[String], max_width: usize) -> String {
    match titles {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first}{SEPARATOR}{second}"),
        [first, .., prev, last] => {
            let full = titles.join(SEPARATOR);
            if UnicodeWidthStr::width(full.as_str()) <= max_width {
                full
            } else {
                format!("{first}{ELLIPSIS}{prev}{SEPARATOR}{last}")
            }
        }
    }
}

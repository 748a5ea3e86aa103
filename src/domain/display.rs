use std::path::Path;
use time::OffsetDateTime;
use time::macros::format_description;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn format_relative_time(moment: OffsetDateTime, now: OffsetDateTime) -> String {
    let seconds = (now - moment).whole_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} {} ago", plural(minutes, "minute"));
    }

    let hours = seconds / 3600;
    if hours < 24 {
        return format!("{hours} {} ago", plural(hours, "hour"));
    }

    let days = seconds / 86_400;
    if days < 7 {
        return format!("{days} {} ago", plural(days, "day"));
    }

    let weeks = days / 7;
    if weeks < 5 {
        return format!("{weeks} {} ago", plural(weeks, "week"));
    }

    format_date(moment)
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

pub fn format_date(moment: OffsetDateTime) -> String {
    moment
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

pub fn format_date_minute(moment: OffsetDateTime) -> String {
    moment
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

pub fn format_message_count(count: usize) -> String {
    if count == 1 {
        "1 message".to_string()
    } else {
        format!("{count} messages")
    }
}

/// Collapses runs of whitespace (including newlines) into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to `max_width` columns, ending with `...` when anything was dropped.
pub fn truncate_end(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let budget = max_width - 3;
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > budget {
            break;
        }
        used += width;
        out.push(ch);
    }
    out.push_str("...");
    out
}

/// Keeps the tail of `text`, prefixed with `...`, within `max_width` columns.
pub fn truncate_start(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width <= 3 {
        return ".".repeat(max_width);
    }

    let budget = max_width - 3;
    let mut tail: Vec<char> = Vec::new();
    let mut used = 0usize;
    for ch in text.chars().rev() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > budget {
            break;
        }
        used += width;
        tail.push(ch);
    }
    let tail: String = tail.into_iter().rev().collect();
    format!("...{tail}")
}

/// Hard clip with no marker, for fitting terminal rows.
pub fn clip_to_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + width > max_width {
            break;
        }
        used += width;
        out.push(ch);
    }
    out
}

pub fn display_project_path(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home {
        if let Ok(rest) = path.strip_prefix(home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

/// Pi names session files `2025-01-15T10-30-00-123Z_<uuid>`; returns `2025-01-15 10:30`.
pub fn started_at_from_session_id(session_id: &str) -> Option<String> {
    let stamp = session_id.split('_').next()?;
    let date = stamp.get(0..10)?;
    let time = stamp.get(11..16)?;
    if stamp.as_bytes().get(10) != Some(&b'T') {
        return None;
    }
    let date_ok = date
        .chars()
        .enumerate()
        .all(|(i, ch)| if i == 4 || i == 7 { ch == '-' } else { ch.is_ascii_digit() });
    let time_ok = time
        .chars()
        .enumerate()
        .all(|(i, ch)| if i == 2 { ch == '-' || ch == ':' } else { ch.is_ascii_digit() });
    if !date_ok || !time_ok {
        return None;
    }
    Some(format!("{date} {}", time.replace('-', ":")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use time::Duration;
    use time::macros::datetime;

    #[test]
    fn relative_time_buckets() {
        let now = datetime!(2025-03-01 12:00 UTC);
        assert_eq!(format_relative_time(now - Duration::seconds(30), now), "just now");
        assert_eq!(format_relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(format_relative_time(now - Duration::minutes(45), now), "45 minutes ago");
        assert_eq!(format_relative_time(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(format_relative_time(now - Duration::days(1), now), "1 day ago");
        assert_eq!(format_relative_time(now - Duration::days(15), now), "2 weeks ago");
        assert_eq!(format_relative_time(now - Duration::days(60), now), "2024-12-31");
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        let now = datetime!(2025-03-01 12:00 UTC);
        assert_eq!(format_relative_time(now + Duration::hours(2), now), "just now");
    }

    #[test]
    fn truncation_helpers() {
        assert_eq!(truncate_end("hello world", 8), "hello...");
        assert_eq!(truncate_end("short", 8), "short");
        assert_eq!(truncate_start("/very/long/project/path", 12), "...ject/path");
        assert_eq!(clip_to_width("abcdef", 4), "abcd");
        assert_eq!(normalize_whitespace("  fix\n the\tbug  "), "fix the bug");
    }

    #[test]
    fn project_paths_use_tilde_under_home() {
        let home = PathBuf::from("/Users/me");
        assert_eq!(
            display_project_path(Path::new("/Users/me/code/app"), Some(&home)),
            "~/code/app"
        );
        assert_eq!(display_project_path(Path::new("/Users/me"), Some(&home)), "~");
        assert_eq!(display_project_path(Path::new("/srv/app"), Some(&home)), "/srv/app");
    }

    #[test]
    fn parses_pi_session_id_timestamp() {
        assert_eq!(
            started_at_from_session_id("2025-01-15T10-30-00_abc123").as_deref(),
            Some("2025-01-15 10:30")
        );
        assert_eq!(started_at_from_session_id("abc123"), None);
        assert_eq!(started_at_from_session_id("0f0e-uuid-like-value-here"), None);
    }

    #[test]
    fn message_count_pluralizes() {
        assert_eq!(format_message_count(1), "1 message");
        assert_eq!(format_message_count(0), "0 messages");
    }
}

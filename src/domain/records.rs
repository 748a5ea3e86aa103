use crate::domain::{DiscoveredSession, SessionRecord, TitleHistory};
use std::cmp::Ordering;

/// Where records get their title history from.
pub trait TitleSource {
    fn history_for(&self, session: &DiscoveredSession) -> Option<&TitleHistory>;
}

pub fn build_records<S: TitleSource + ?Sized>(
    discovered: Vec<DiscoveredSession>,
    source: &S,
) -> Vec<SessionRecord> {
    let mut records: Vec<SessionRecord> = discovered
        .into_iter()
        .map(|session| {
            let titles = source
                .history_for(&session)
                .map(|history| history.titles().to_vec())
                .unwrap_or_default();
            SessionRecord {
                session_id: session.session_id,
                project_path: session.project_path,
                titles,
                first_message: session.first_message,
                message_count: session.message_count,
                last_activity: session.last_activity,
            }
        })
        .collect();

    records.sort_by(compare_recent_first);
    records
}

fn compare_recent_first(a: &SessionRecord, b: &SessionRecord) -> Ordering {
    b.last_activity
        .cmp(&a.last_activity)
        .then_with(|| a.session_id.cmp(&b.session_id))
}

pub fn filter_records(records: &[SessionRecord], query: &str) -> Vec<SessionRecord> {
    if query.is_empty() {
        return records.to_vec();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| record_matches(record, &needle))
        .cloned()
        .collect()
}

/// `needle` must already be lowercase.
pub fn record_matches(record: &SessionRecord, needle: &str) -> bool {
    let haystack = format!(
        "{}\n{}\n{}",
        record.project_path.display(),
        record.titles.join("\n"),
        record.first_message
    )
    .to_lowercase();
    haystack.contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use time::OffsetDateTime;
    use time::macros::datetime;

    struct MapSource(BTreeMap<String, TitleHistory>);

    impl TitleSource for MapSource {
        fn history_for(&self, session: &DiscoveredSession) -> Option<&TitleHistory> {
            self.0.get(&session.session_id)
        }
    }

    fn discovered(id: &str, project: &str, first: &str, at: OffsetDateTime) -> DiscoveredSession {
        DiscoveredSession {
            session_id: id.to_string(),
            project_path: PathBuf::from(project),
            first_message: first.to_string(),
            message_count: 3,
            last_activity: at,
        }
    }

    fn source() -> MapSource {
        let mut map = BTreeMap::new();
        let mut history =
            TitleHistory::new("Fix login".to_string(), datetime!(2025-01-01 00:00 UTC));
        history.push("Add OAuth tests".to_string(), datetime!(2025-01-02 00:00 UTC));
        map.insert("s2".to_string(), history);
        MapSource(map)
    }

    fn sample() -> Vec<SessionRecord> {
        build_records(
            vec![
                discovered(
                    "s1",
                    "/home/u/dashboard",
                    "make charts",
                    datetime!(2025-01-03 00:00 UTC),
                ),
                discovered("s2", "/home/u/api", "auth flow", datetime!(2025-01-05 00:00 UTC)),
                discovered("s3", "/home/u/api", "Refactor DB", datetime!(2025-01-03 00:00 UTC)),
            ],
            &source(),
        )
    }

    #[test]
    fn sorts_recent_first_with_id_tiebreak() {
        let ids: Vec<_> = sample().into_iter().map(|r| r.session_id).collect();
        assert_eq!(ids, vec!["s2", "s1", "s3"]);
    }

    #[test]
    fn joins_titles_by_exact_session_id() {
        let records = sample();
        assert_eq!(records[0].titles, vec!["Fix login", "Add OAuth tests"]);
        assert!(!records[1].has_titles());
        assert!(!records[2].has_titles());
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let records = sample();
        assert_eq!(filter_records(&records, ""), records);
    }

    #[test]
    fn query_matches_case_insensitively_across_fields() {
        let records = sample();

        let by_title = filter_records(&records, "oauth");
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].session_id, "s2");

        let by_path = filter_records(&records, "DASHBOARD");
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].session_id, "s1");

        let by_message = filter_records(&records, "refactor db");
        assert_eq!(by_message.len(), 1);
        assert_eq!(by_message[0].session_id, "s3");

        let by_project: Vec<_> = filter_records(&records, "/api")
            .into_iter()
            .map(|r| r.session_id)
            .collect();
        assert_eq!(by_project, vec!["s2", "s3"]);
    }

    #[test]
    fn unmatched_query_yields_empty_list() {
        assert!(filter_records(&sample(), "zzz-nothing").is_empty());
    }
}

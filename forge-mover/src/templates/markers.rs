//! Hidden source-identity markers embedded in migrated bodies.

use chrono::{DateTime, SecondsFormat, Utc};

const ISSUE_PREFIX: &str = "<!-- forge-mover:source-issue=";
const COMMENT_PREFIX: &str = "<!-- forge-mover:source-created-at=";
const SUFFIX: &str = " -->";

/// Marker identifying the source issue number.
#[must_use]
pub fn issue_marker(number: u64) -> String {
    format!("{ISSUE_PREFIX}{number}{SUFFIX}")
}

/// Marker identifying the source comment's creation time.
#[must_use]
pub fn comment_marker(created_at: DateTime<Utc>) -> String {
    format!(
        "{COMMENT_PREFIX}{}{SUFFIX}",
        created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    )
}

fn marker_value<'a>(body: &'a str, prefix: &str) -> Option<&'a str> {
    let start = body.rfind(prefix)? + prefix.len();
    let rest = &body[start..];
    let end = rest.find(SUFFIX)?;
    Some(rest[..end].trim())
}

/// Extracts the source issue number from a migrated issue body.
#[must_use]
pub fn parse_issue_marker(body: &str) -> Option<u64> {
    marker_value(body, ISSUE_PREFIX)?.parse().ok()
}

/// Extracts the source creation time from a migrated comment body.
#[must_use]
pub fn parse_comment_marker(body: &str) -> Option<DateTime<Utc>> {
    let value = marker_value(body, COMMENT_PREFIX)?;
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Removes any markers, so a body can be re-wrapped without duplicating them.
#[must_use]
pub fn strip_markers(body: &str) -> String {
    body.lines()
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with(ISSUE_PREFIX) || line.starts_with(COMMENT_PREFIX))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn issue_marker_is_recoverable() {
        let body = format!("Some text\n\n{}", issue_marker(42));
        assert_eq!(parse_issue_marker(&body), Some(42));
    }

    #[test]
    fn comment_marker_is_recoverable() {
        let at = Utc.with_ymd_and_hms(2021, 5, 4, 3, 2, 1).unwrap();
        let body = format!("Reply\n\n{}", comment_marker(at));
        assert_eq!(parse_comment_marker(&body), Some(at));
    }

    #[test]
    fn bodies_without_markers_parse_to_none() {
        assert_eq!(parse_issue_marker("plain body"), None);
        assert_eq!(parse_comment_marker("<!-- something else -->"), None);
    }

    #[test]
    fn last_marker_wins() {
        let body = format!("{}\nquoted\n{}", issue_marker(1), issue_marker(2));
        assert_eq!(parse_issue_marker(&body), Some(2));
    }

    #[test]
    fn strips_markers_only() {
        let body = format!("keep me\n{}", issue_marker(3));
        assert_eq!(strip_markers(&body), "keep me");
    }
}

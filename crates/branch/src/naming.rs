//! Job branch names.

use chrono::{DateTime, Utc};
use forgehand_core::EntityKind;

/// Timestamp layout used in branch names, second granularity, UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `{prefix}{issue|pr}-{number}-{timestamp}`.
///
/// Pure in its inputs: the caller supplies the clock reading.
pub fn branch_name(prefix: &str, kind: EntityKind, number: u64, at: DateTime<Utc>) -> String {
    format!(
        "{prefix}{}-{number}-{}",
        kind.slug(),
        at.format(TIMESTAMP_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 22).unwrap()
    }

    #[test]
    fn issue_and_pr_names() {
        assert_eq!(
            branch_name("claude/", EntityKind::Issue, 123, at()),
            "claude/issue-123-20240115_143022"
        );
        assert_eq!(
            branch_name("claude/", EntityKind::PullRequest, 9, at()),
            "claude/pr-9-20240115_143022"
        );
    }

    #[test]
    fn deterministic_and_distinct() {
        let a = branch_name("claude/", EntityKind::Issue, 1, at());
        assert_eq!(a, branch_name("claude/", EntityKind::Issue, 1, at()));
        assert_ne!(a, branch_name("claude/", EntityKind::Issue, 11, at()));
        assert_ne!(a, branch_name("claude/", EntityKind::PullRequest, 1, at()));
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(
            branch_name("bots/ai-", EntityKind::Issue, 5, at()),
            "bots/ai-issue-5-20240115_143022"
        );
    }
}

//! Ordered issue predicates and status derivation shared by all checkers.
//!
//! Every checker declares its issues as an ordered slice of
//! `(issue, predicate)` pairs. The slice order is the display precedence:
//! the first matching issue that is not excluded by policy becomes the
//! item's status.

/// Status of an item with no issues.
pub const OK: &str = "ok";

/// An issue a checker can report.
pub trait Issue: Copy + Eq + std::fmt::Debug {
    /// Stable code stored in results
    fn code(&self) -> &'static str;
    /// Human readable label, used as the item status
    fn label(&self) -> &'static str;
}

/// A predicate deciding whether an issue applies to a checked item.
///
/// Contexts that borrow use a higher-ranked pointer such as
/// `fn(&Context<'_>) -> bool` instead.
pub type Check<C> = fn(&C) -> bool;

/// Issues found on one item and the status derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<K> {
    pub status: String,
    /// Every matching issue in precedence order, including suppressed ones
    pub issues: Vec<K>,
}

impl<K: Issue> Classification<K> {
    pub fn is_ok(&self) -> bool {
        self.status == OK
    }

    /// Status derived from `issues`, skipping issues excluded by `exclude`.
    pub fn from_issues(issues: Vec<K>, exclude: impl Fn(K) -> bool) -> Self {
        let status = issues
            .iter()
            .copied()
            .find(|issue| !exclude(*issue))
            .map(|issue| issue.label().to_string())
            .unwrap_or_else(|| OK.to_string());
        Self { status, issues }
    }
}

/// Evaluate every predicate of `table` in order and collect those that match.
pub fn matching<K, C, F>(table: &[(K, F)], context: &C) -> Vec<K>
where
    K: Issue,
    F: Fn(&C) -> bool,
{
    table
        .iter()
        .filter(|(_, check)| check(context))
        .map(|(issue, _)| *issue)
        .collect()
}

/// Evaluate `table` and derive the status, skipping issues excluded by
/// `exclude` when choosing it.
pub fn classify<K, C, F>(
    table: &[(K, F)],
    context: &C,
    exclude: impl Fn(K) -> bool,
) -> Classification<K>
where
    K: Issue,
    F: Fn(&C) -> bool,
{
    Classification::from_issues(matching(table, context), exclude)
}

/// Look up an issue by its code among the entries of a table.
pub fn from_code<K: Issue, F>(table: &[(K, F)], code: &str) -> Option<K> {
    table
        .iter()
        .map(|(issue, _)| *issue)
        .find(|issue| issue.code() == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Probe {
        First,
        Second,
        Third,
    }

    impl Issue for Probe {
        fn code(&self) -> &'static str {
            match self {
                Probe::First => "first",
                Probe::Second => "second",
                Probe::Third => "third",
            }
        }

        fn label(&self) -> &'static str {
            match self {
                Probe::First => "first issue",
                Probe::Second => "second issue",
                Probe::Third => "third issue",
            }
        }
    }

    fn even(n: &u32) -> bool {
        *n % 2 == 0
    }

    fn multiple_of_three(n: &u32) -> bool {
        *n % 3 == 0
    }

    fn never(_: &u32) -> bool {
        false
    }

    const TABLE: &[(Probe, Check<u32>)] = &[
        (Probe::First, even),
        (Probe::Second, multiple_of_three),
        (Probe::Third, never),
    ];

    #[test]
    fn test_first_match_wins() {
        let result = classify(TABLE, &6, |_| false);
        assert_eq!(result.status, "first issue");
        assert_eq!(result.issues, vec![Probe::First, Probe::Second]);
    }

    #[test]
    fn test_ok_when_nothing_matches() {
        let result = classify(TABLE, &7, |_| false);
        assert!(result.is_ok());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_excluded_issue_kept_but_skipped_for_status() {
        let result = classify(TABLE, &6, |issue| issue == Probe::First);
        assert_eq!(result.status, "second issue");
        assert_eq!(result.issues, vec![Probe::First, Probe::Second]);

        let result = classify(TABLE, &4, |issue| issue == Probe::First);
        assert!(result.is_ok());
        assert_eq!(result.issues, vec![Probe::First]);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(from_code(TABLE, "second"), Some(Probe::Second));
        assert_eq!(from_code(TABLE, "missing"), None);
    }
}

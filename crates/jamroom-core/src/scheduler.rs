//! Fair queue scheduling
//!
//! Pending tracks are grouped by submitter, the groups are ordered so the user
//! who has waited longest plays first, and then one track per user is taken in
//! turn. A user's second track never plays before every other waiting user's
//! first track, and each user's own tracks keep their submission order.

use std::collections::HashMap;

/// Something that can be placed in a fair queue.
pub trait Submission {
    /// Id of the submitting user. Entries without one are grouped together.
    fn submitter(&self) -> Option<&str>;

    /// Submission time, used to order a single user's entries.
    fn submitted_at(&self) -> i64;
}

struct Lane<T> {
    last_played: i64,
    entries: Vec<T>,
}

/// Compute the play order for `pending`.
///
/// `last_played` returns the last-played timestamp for a submitter id. Ties
/// between users keep the order in which they first appear in `pending`, and
/// ties between one user's entries keep their input order, so the result is
/// deterministic and feeding it back in yields the same order.
pub fn fair_order<T, F>(pending: Vec<T>, last_played: F) -> Vec<T>
where
    T: Submission,
    F: Fn(&str) -> i64,
{
    let total = pending.len();
    let mut lanes: Vec<Lane<T>> = Vec::new();
    let mut lane_of: HashMap<Option<String>, usize> = HashMap::new();

    for entry in pending {
        let submitter = entry.submitter().map(str::to_owned);
        let index = *lane_of.entry(submitter).or_insert_with_key(|submitter| {
            lanes.push(Lane {
                last_played: submitter.as_deref().map_or(0, &last_played),
                entries: Vec::new(),
            });
            lanes.len() - 1
        });
        lanes[index].entries.push(entry);
    }

    // Both sorts are stable.
    lanes.sort_by_key(|lane| lane.last_played);
    let mut lanes: Vec<_> = lanes
        .into_iter()
        .map(|mut lane| {
            lane.entries.sort_by_key(Submission::submitted_at);
            lane.entries.into_iter()
        })
        .collect();

    let mut ordered = Vec::with_capacity(total);
    while ordered.len() < total {
        for lane in &mut lanes {
            if let Some(entry) = lane.next() {
                ordered.push(entry);
            }
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        label: &'static str,
        user: Option<&'static str>,
        added: i64,
    }

    impl Submission for Entry {
        fn submitter(&self) -> Option<&str> {
            self.user
        }

        fn submitted_at(&self) -> i64 {
            self.added
        }
    }

    fn entry(label: &'static str, user: &'static str, added: i64) -> Entry {
        Entry {
            label,
            user: Some(user),
            added,
        }
    }

    fn labels(entries: &[Entry]) -> Vec<&'static str> {
        entries.iter().map(|e| e.label).collect()
    }

    fn last_played(user: &str) -> i64 {
        match user {
            "a" => 0,
            "b" => 100,
            "c" => 50,
            _ => 0,
        }
    }

    #[test]
    fn test_round_robin_longest_waiting_first() {
        let pending = vec![
            entry("B1", "b", 1),
            entry("B2", "b", 2),
            entry("A1", "a", 1),
            entry("A2", "a", 2),
        ];
        let ordered = fair_order(pending, last_played);
        assert_eq!(labels(&ordered), vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_submission_order_within_user() {
        let pending = vec![
            entry("A3", "a", 30),
            entry("A1", "a", 10),
            entry("A2", "a", 20),
        ];
        let ordered = fair_order(pending, last_played);
        assert_eq!(labels(&ordered), vec!["A1", "A2", "A3"]);
    }

    #[test]
    fn test_uneven_groups_are_drained() {
        let pending = vec![
            entry("B1", "b", 1),
            entry("A1", "a", 1),
            entry("A2", "a", 2),
            entry("A3", "a", 3),
            entry("C1", "c", 1),
        ];
        let ordered = fair_order(pending, last_played);
        assert_eq!(labels(&ordered), vec!["A1", "C1", "B1", "A2", "A3"]);
    }

    #[test]
    fn test_ties_keep_first_encountered_user() {
        let pending = vec![
            entry("X1", "x", 1),
            entry("Y1", "y", 1),
            entry("X2", "x", 2),
            entry("Y2", "y", 2),
        ];
        let ordered = fair_order(pending, |_| 7);
        assert_eq!(labels(&ordered), vec!["X1", "Y1", "X2", "Y2"]);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let pending = vec![entry("first", "a", 5), entry("second", "a", 5)];
        let ordered = fair_order(pending, last_played);
        assert_eq!(labels(&ordered), vec!["first", "second"]);
    }

    #[test]
    fn test_idempotent() {
        let pending = vec![
            entry("C1", "c", 4),
            entry("B1", "b", 1),
            entry("A2", "a", 9),
            entry("A1", "a", 3),
            entry("B2", "b", 2),
        ];
        let once = fair_order(pending, last_played);
        let twice = fair_order(once.clone(), last_played);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_entries_without_submitter() {
        let pending = vec![
            Entry {
                label: "anon",
                user: None,
                added: 0,
            },
            entry("B1", "b", 1),
        ];
        let ordered = fair_order(pending, last_played);
        assert_eq!(labels(&ordered), vec!["anon", "B1"]);
    }

    #[test]
    fn test_empty_input() {
        let ordered: Vec<Entry> = fair_order(Vec::new(), last_played);
        assert!(ordered.is_empty());
    }
}

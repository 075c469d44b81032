//! Merging of per-source entry lists into one digest order.

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::models::Entry;

/// Merge entry lists given in source-priority order.
///
/// The lists are concatenated, stably sorted newest first on `created_at`
/// (string order, which is chronological for the fixed timestamp layout),
/// and then only the first entry for each `url` is kept. Entries are moved,
/// never modified.
#[instrument(level = "info", skip_all, fields(lists = lists.len()))]
pub fn merge(lists: Vec<Vec<Entry>>) -> Vec<Entry> {
    let mut all: Vec<Entry> = lists.into_iter().flatten().collect();
    let before = all.len();
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let merged: Vec<Entry> = all
        .into_iter()
        .unique_by(|entry| entry.url.clone())
        .collect();
    debug!(before, after = merged.len(), "Merged entry lists");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{news, paper};
    use std::collections::HashSet;

    fn urls(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.url.as_str()).collect()
    }

    #[test]
    fn test_newest_first_and_first_url_wins() {
        let first = vec![news("a", "2025-01-02 00:00:00")];
        let second = vec![news("a", "2025-01-01 00:00:00"), news("b", "2025-01-03 00:00:00")];

        let merged = merge(vec![first, second]);
        assert_eq!(urls(&merged), vec!["b", "a"]);
        assert_eq!(merged[1].created_at, "2025-01-02 00:00:00");
    }

    #[test]
    fn test_equal_timestamps_keep_source_priority() {
        let hn = vec![news("https://x/1", "2025-01-02 10:00:00")];
        let mut dup = paper("https://x/1", "2025-01-02 10:00:00");
        dup.title = "Later source".to_string();

        let merged = merge(vec![hn, vec![dup]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "hacker_news");
    }

    fn sample() -> Vec<Vec<Entry>> {
        vec![
            vec![
                news("https://n/1", "2025-01-05 09:00:00"),
                news("https://n/2", "2025-01-04 09:00:00"),
                news("https://shared", "2025-01-03 09:00:00"),
            ],
            vec![
                paper("https://p/1", "2025-01-05 12:00:00"),
                paper("https://shared", "2025-01-06 00:00:00"),
            ],
            Vec::new(),
            vec![news("https://n/1", "2025-01-01 00:00:00")],
        ]
    }

    #[test]
    fn test_urls_unique() {
        let merged = merge(sample());
        let distinct: HashSet<_> = merged.iter().map(|e| &e.url).collect();
        assert_eq!(distinct.len(), merged.len());
    }

    #[test]
    fn test_output_is_subset_of_inputs() {
        let input = sample();
        let total: usize = input.iter().map(Vec::len).sum();
        let flat: Vec<Entry> = input.iter().flatten().cloned().collect();

        let merged = merge(input);
        assert!(merged.len() <= total);
        assert!(merged.iter().all(|e| flat.contains(e)));
    }

    #[test]
    fn test_sorted_descending() {
        let merged = merge(sample());
        assert!(
            merged
                .windows(2)
                .all(|w| w[0].created_at >= w[1].created_at)
        );
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let once = merge(sample());
        let twice = merge(vec![once.clone(), once.clone()]);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_empty_input() {
        assert!(merge(Vec::new()).is_empty());
        assert!(merge(vec![Vec::new(), Vec::new()]).is_empty());
    }
}

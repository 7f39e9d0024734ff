//! Merging of title-search and ID-search result sets.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::CandidateRecord;
use crate::rules::RuleSet;

/// Merged, deduplicated and sorted output of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub records: Vec<CandidateRecord>,
    /// Whitelisted IDs that title search already found
    pub redundant_ids: Vec<String>,
}

/// Newest first: updated desc, then published desc, then identifier desc
pub fn compare_records(a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
    b.updated()
        .cmp(&a.updated())
        .then_with(|| b.published().cmp(&a.published()))
        .then_with(|| b.identifier().cmp(a.identifier()))
}

/// Sort in place into the canonical result order
pub fn sort_records(records: &mut [CandidateRecord]) {
    records.sort_by(compare_records);
}

/// Remove later records whose identifier was already seen
pub fn deduplicate(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.identifier().to_string()))
        .collect()
}

/// Whitelisted IDs present in the title results, minus the ignore list
pub fn redundant_whitelisted_ids(title_results: &[CandidateRecord], rules: &RuleSet) -> Vec<String> {
    let ignored = rules.id_whitelist_intersection_ignored();
    let mut seen = HashSet::new();
    title_results
        .iter()
        .map(CandidateRecord::identifier)
        .filter(|id| rules.is_id_whitelisted(id) && !ignored.contains(*id))
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Sort and cut down to `limit` records
pub fn finalize(mut records: Vec<CandidateRecord>, limit: Option<usize>) -> Vec<CandidateRecord> {
    sort_records(&mut records);
    if let Some(limit) = limit {
        if records.len() > limit {
            records.truncate(limit);
            tracing::info!("Limited search results to {} results.", limit);
        }
    }
    records
}

/// Combine both result sets; title results win when an identifier appears in both.
///
/// `id_results` is `None` when the ID search was skipped, in which case no
/// whitelisted ID is reported as redundant.
pub fn merge_results(
    title_results: Vec<CandidateRecord>,
    id_results: Option<Vec<CandidateRecord>>,
    rules: &RuleSet,
    limit: Option<usize>,
) -> MergeOutcome {
    let redundant_ids = match id_results {
        Some(_) => redundant_whitelisted_ids(&title_results, rules),
        None => Vec::new(),
    };
    if !redundant_ids.is_empty() {
        tracing::warn!(
            "ID whitelist has {} unnecessary IDs which are already present in the title search results: {}",
            redundant_ids.len(),
            redundant_ids.join(", ")
        );
    }

    let id_results = id_results.unwrap_or_default();
    let title_count = title_results.len();
    let id_count = id_results.len();
    let mut combined = title_results;
    combined.extend(id_results);
    let combined = deduplicate(combined);

    tracing::info!(
        "Concatenated {} title and {} ID search results into a single set with {} results.",
        title_count,
        id_count,
        combined.len()
    );

    MergeOutcome {
        records: finalize(combined, limit),
        redundant_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawEntry;
    use crate::rules::Term;

    fn record(id: &str, version: u32, published: &str, updated: &str) -> CandidateRecord {
        CandidateRecord::from_raw(&RawEntry {
            id: format!("http://arxiv.org/abs/{}v{}", id, version),
            title: format!("A Review {}", id),
            summary: String::new(),
            published: format!("{}T00:00:00Z", published),
            updated: format!("{}T00:00:00Z", updated),
            primary_category: Some("cs.LG".to_string()),
            categories: vec!["cs.LG".to_string()],
        })
        .unwrap()
    }

    fn rules() -> RuleSet {
        RuleSet::builder()
            .whitelist(Term::new("review").unwrap())
            .whitelist_id("2301.00001")
            .whitelist_id("2301.00002")
            .whitelist_id("2301.00003")
            .ignore_intersection("2301.00003")
            .build()
            .unwrap()
    }

    #[test]
    fn test_sort_newest_updated_first() {
        let mut records = vec![
            record("2301.00001", 1, "2023-01-01", "2023-01-01"),
            record("2301.00002", 1, "2023-01-01", "2023-02-01"),
        ];
        sort_records(&mut records);
        assert_eq!(records[0].identifier(), "2301.00002");
    }

    #[test]
    fn test_sort_tie_breakers() {
        let mut records = vec![
            record("2301.00001", 1, "2022-01-01", "2023-01-01"),
            record("2301.00003", 1, "2022-06-01", "2023-01-01"),
            record("2301.00002", 1, "2022-06-01", "2023-01-01"),
        ];
        sort_records(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["2301.00003", "2301.00002", "2301.00001"]);
    }

    #[test]
    fn test_merge_prefers_title_copy() {
        let title = vec![record("2301.00001", 2, "2023-01-01", "2023-01-01")];
        let ids = vec![
            record("2301.00001", 1, "2023-01-01", "2023-01-01"),
            record("2301.00004", 1, "2023-01-01", "2023-01-01"),
        ];

        let outcome = merge_results(title, Some(ids), &rules(), None);
        assert_eq!(outcome.records.len(), 2);
        let kept = outcome
            .records
            .iter()
            .find(|r| r.identifier() == "2301.00001")
            .unwrap();
        assert_eq!(kept.version(), 2);
    }

    #[test]
    fn test_redundant_ids_skip_ignore_list() {
        let title = vec![
            record("2301.00002", 1, "2023-01-01", "2023-01-01"),
            record("2301.00003", 1, "2023-01-01", "2023-01-01"),
            record("2301.00005", 1, "2023-01-01", "2023-01-01"),
        ];
        let outcome = merge_results(title, Some(Vec::new()), &rules(), None);
        assert_eq!(outcome.redundant_ids, vec!["2301.00002"]);
    }

    #[test]
    fn test_skipped_id_search_reports_no_redundant_ids() {
        let title = vec![
            record("2301.00001", 1, "2023-01-01", "2023-01-01"),
            record("2301.00002", 1, "2023-01-01", "2023-02-01"),
        ];
        let outcome = merge_results(title, None, &rules(), Some(2));
        assert!(outcome.redundant_ids.is_empty());
        assert_eq!(outcome.records.len(), 2);
    }

    #[test]
    fn test_truncates_to_limit_after_sorting() {
        let title = vec![
            record("2301.00001", 1, "2023-01-01", "2023-01-01"),
            record("2301.00002", 1, "2023-01-01", "2023-03-01"),
        ];
        let ids = vec![record("2301.00004", 1, "2023-01-01", "2023-02-01")];
        let outcome = merge_results(title, Some(ids), &rules(), Some(2));
        let ids: Vec<&str> = outcome.records.iter().map(|r| r.identifier()).collect();
        assert_eq!(ids, vec!["2301.00002", "2301.00004"]);
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let records = vec![
            record("2301.00001", 3, "2023-01-01", "2023-01-01"),
            record("2301.00001", 1, "2023-01-01", "2023-01-01"),
        ];
        let unique = deduplicate(records);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].version(), 3);
    }
}

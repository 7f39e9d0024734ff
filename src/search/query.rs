//! Search query construction from a rule set.

use std::collections::BTreeSet;

use crate::rules::{RuleSet, Term};

/// The two searches a run performs.
///
/// The title expression is `categories AND whitelist ANDNOT blacklist`. The
/// identifier list is a separate clause, OR-ed in by running it as its own
/// search, so whitelisted IDs bypass the title and category filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    title_query: Option<String>,
    id_list: Vec<String>,
}

impl SearchPlan {
    /// Build the plan for `rules`; identical rules always give identical plans
    pub fn new(rules: &RuleSet) -> Self {
        Self {
            title_query: title_query(rules),
            id_list: rules.id_whitelist().iter().cloned().collect(),
        }
    }

    /// Title search expression; `None` when no whitelist term exists
    pub fn title_query(&self) -> Option<&str> {
        self.title_query.as_deref()
    }

    /// Whitelisted identifiers in sorted order
    pub fn id_list(&self) -> &[String] {
        &self.id_list
    }

    /// Single-line rendering of the whole plan for logs and cache keys
    pub fn render(&self) -> String {
        let id_clause = or_clause("id", self.id_list.iter().cloned());
        match (&self.title_query, id_clause) {
            (Some(title), Some(ids)) => format!("({}) OR {}", title, ids),
            (Some(title), None) => title.clone(),
            (None, Some(ids)) => ids,
            (None, None) => String::new(),
        }
    }
}

fn title_query(rules: &RuleSet) -> Option<String> {
    let whitelist = terms_clause(rules.whitelist().iter())?;

    // Blacklist terms with adjacency assertions cannot be expressed remotely;
    // excluding their bare phrase would drop titles the local filter keeps.
    let blacklist = terms_clause(rules.blacklist().iter().filter(|t| !t.has_assertions()));
    let categories = or_clause("cat", rules.categories().iter().cloned());

    let mut query = match categories {
        Some(categories) => format!("{} AND {}", categories, whitelist),
        None => whitelist,
    };
    if let Some(blacklist) = blacklist {
        query.push_str(" ANDNOT ");
        query.push_str(&blacklist);
    }
    Some(query)
}

fn terms_clause<'a>(terms: impl Iterator<Item = &'a Term>) -> Option<String> {
    or_clause("ti", terms.map(Term::query_fragment))
}

/// `(prefix:a OR prefix:b)` over the sorted, deduplicated values; `None` when empty
fn or_clause(prefix: &str, values: impl Iterator<Item = String>) -> Option<String> {
    let values: BTreeSet<String> = values.collect();
    if values.is_empty() {
        return None;
    }

    let joined = values
        .iter()
        .map(|value| format!("{}:{}", prefix, value))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!("({})", joined))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(phrase: &str) -> Term {
        Term::new(phrase).unwrap()
    }

    #[test]
    fn test_full_title_query() {
        let rules = RuleSet::builder()
            .category("stat.ML")
            .category("cs.LG")
            .whitelist(term("tutorial"))
            .whitelist(term("State of the Art"))
            .whitelist(term("review"))
            .blacklist(term("peer review"))
            .blacklist(term("guide"))
            .build()
            .unwrap();

        let plan = SearchPlan::new(&rules);
        assert_eq!(
            plan.title_query(),
            Some(
                "(cat:cs.LG OR cat:stat.ML) AND (ti:\"state of the art\" OR ti:review OR ti:tutorial) \
                 ANDNOT (ti:\"peer review\" OR ti:guide)"
            )
        );
        assert!(plan.id_list().is_empty());
    }

    #[test]
    fn test_query_is_stable_across_insertion_order() {
        let a = RuleSet::builder()
            .category("cs.AI")
            .category("cs.LG")
            .whitelist(term("survey"))
            .whitelist(term("overview"))
            .whitelist_id("2301.00002")
            .whitelist_id("2301.00001")
            .build()
            .unwrap();
        let b = RuleSet::builder()
            .whitelist_id("2301.00001")
            .whitelist(term("overview"))
            .category("cs.LG")
            .whitelist_id("2301.00002")
            .whitelist(term("survey"))
            .category("cs.AI")
            .build()
            .unwrap();

        assert_eq!(SearchPlan::new(&a), SearchPlan::new(&b));
        assert_eq!(SearchPlan::new(&a).render(), SearchPlan::new(&b).render());
    }

    #[test]
    fn test_empty_clauses_are_omitted() {
        let rules = RuleSet::builder()
            .whitelist(term("survey"))
            .build()
            .unwrap();
        let plan = SearchPlan::new(&rules);
        assert_eq!(plan.title_query(), Some("(ti:survey)"));
        assert_eq!(plan.render(), "(ti:survey)");
    }

    #[test]
    fn test_no_whitelist_terms_means_no_title_search() {
        let rules = RuleSet::builder()
            .category("cs.LG")
            .blacklist(term("guide"))
            .whitelist_id("2301.00002")
            .whitelist_id("1706.03762")
            .build()
            .unwrap();
        let plan = SearchPlan::new(&rules);
        assert_eq!(plan.title_query(), None);
        assert_eq!(plan.id_list(), &["1706.03762", "2301.00002"]);
        assert_eq!(plan.render(), "(id:1706.03762 OR id:2301.00002)");
    }

    #[test]
    fn test_blacklist_terms_with_assertions_stay_local() {
        let rules = RuleSet::builder()
            .whitelist(term("review"))
            .blacklist(term("survey").not_followed_by("data").unwrap())
            .whitelist_id("2301.00001")
            .build()
            .unwrap();
        let plan = SearchPlan::new(&rules);
        assert_eq!(plan.title_query(), Some("(ti:review)"));
        assert_eq!(plan.render(), "((ti:review)) OR (id:2301.00001)");
    }
}

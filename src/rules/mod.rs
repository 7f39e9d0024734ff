//! Whitelist/blacklist rules for categories, title terms and identifiers.
//!
//! A [`RuleSet`] is built once per run from configuration and shared
//! read-only by the query builder and the record filter. Precedence when
//! classifying a record is: identifier whitelist, then blacklists (identifier
//! and title term), then the title term whitelist.

mod term;

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub use term::Term;
pub(crate) use term::tokenize;

/// Errors raised while building a rule set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid term {0:?}: {1}")]
    InvalidTerm(String, String),

    #[error("Invalid category code: {0:?}")]
    InvalidCategory(String),

    #[error("Invalid arXiv identifier: {0:?} (expected a version-agnostic ID)")]
    InvalidIdentifier(String),

    #[error("Rule set is empty: at least one whitelist term or whitelisted ID is required")]
    Empty,
}

fn category_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]+(-[a-z]+)*(\.[A-Za-z]+(-[A-Za-z]+)*)?$").expect("valid category regex")
    })
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // New style (0704.0001, 2301.12345) or old style (math.GT/0104020, hep-th/9901001)
        Regex::new(r"^(\d{4}\.\d{4,5}|[a-z]+(-[a-z]+)*(\.[A-Z]{2})?/\d{7})$")
            .expect("valid identifier regex")
    })
}

/// Immutable set of matching rules for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    categories: BTreeSet<String>,
    whitelist: Vec<Term>,
    blacklist: Vec<Term>,
    id_whitelist: BTreeSet<String>,
    id_blacklist: BTreeSet<String>,
    id_whitelist_intersection_ignored: BTreeSet<String>,
}

impl RuleSet {
    pub fn builder() -> RuleSetBuilder {
        RuleSetBuilder::default()
    }

    /// Enabled category codes in sorted order
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Whitelist terms in matching order
    pub fn whitelist(&self) -> &[Term] {
        &self.whitelist
    }

    /// Blacklist terms in matching order
    pub fn blacklist(&self) -> &[Term] {
        &self.blacklist
    }

    pub fn id_whitelist(&self) -> &BTreeSet<String> {
        &self.id_whitelist
    }

    pub fn id_blacklist(&self) -> &BTreeSet<String> {
        &self.id_blacklist
    }

    /// Whitelisted IDs that title search is known to return unreliably
    pub fn id_whitelist_intersection_ignored(&self) -> &BTreeSet<String> {
        &self.id_whitelist_intersection_ignored
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    pub fn is_id_whitelisted(&self, identifier: &str) -> bool {
        self.id_whitelist.contains(identifier)
    }

    pub fn is_id_blacklisted(&self, identifier: &str) -> bool {
        self.id_blacklist.contains(identifier)
    }

    /// First blacklist term occurring in the title as a whole word or phrase
    pub fn blacklist_match(&self, title: &str) -> Option<&Term> {
        let words = tokenize(title);
        self.blacklist.iter().find(|term| term.matches_tokens(&words))
    }

    pub fn matches_blacklist(&self, title: &str) -> bool {
        self.blacklist_match(title).is_some()
    }

    /// Phrase of the first whitelist term matching the title
    pub fn matches_whitelist(&self, title: &str) -> Option<String> {
        let words = tokenize(title);
        self.whitelist
            .iter()
            .find(|term| term.matches_tokens(&words))
            .map(Term::phrase)
    }
}

/// Builder for [`RuleSet`]; all validation happens in [`RuleSetBuilder::build`]
#[derive(Debug, Clone, Default)]
pub struct RuleSetBuilder {
    categories: Vec<String>,
    whitelist: Vec<Term>,
    blacklist: Vec<Term>,
    id_whitelist: Vec<String>,
    id_blacklist: Vec<String>,
    id_whitelist_intersection_ignored: Vec<String>,
}

impl RuleSetBuilder {
    pub fn category(mut self, code: impl Into<String>) -> Self {
        self.categories.push(code.into());
        self
    }

    pub fn whitelist(mut self, term: Term) -> Self {
        self.whitelist.push(term);
        self
    }

    pub fn blacklist(mut self, term: Term) -> Self {
        self.blacklist.push(term);
        self
    }

    pub fn whitelist_id(mut self, id: impl Into<String>) -> Self {
        self.id_whitelist.push(id.into());
        self
    }

    pub fn blacklist_id(mut self, id: impl Into<String>) -> Self {
        self.id_blacklist.push(id.into());
        self
    }

    /// Exclude a whitelisted ID from the redundant-whitelist warning
    pub fn ignore_intersection(mut self, id: impl Into<String>) -> Self {
        self.id_whitelist_intersection_ignored.push(id.into());
        self
    }

    /// Validate everything and freeze the rule set
    pub fn build(self) -> Result<RuleSet, RuleError> {
        let categories = self
            .categories
            .into_iter()
            .map(|code| {
                let code = code.trim().to_string();
                if category_pattern().is_match(&code) {
                    Ok(code)
                } else {
                    Err(RuleError::InvalidCategory(code))
                }
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        let id_whitelist = validate_ids(self.id_whitelist)?;
        let id_blacklist = validate_ids(self.id_blacklist)?;
        let id_whitelist_intersection_ignored =
            validate_ids(self.id_whitelist_intersection_ignored)?;

        let whitelist = sorted_terms(self.whitelist);
        let blacklist = sorted_terms(self.blacklist);

        if whitelist.is_empty() && id_whitelist.is_empty() {
            return Err(RuleError::Empty);
        }

        Ok(RuleSet {
            categories,
            whitelist,
            blacklist,
            id_whitelist,
            id_blacklist,
            id_whitelist_intersection_ignored,
        })
    }
}

fn validate_ids(ids: Vec<String>) -> Result<BTreeSet<String>, RuleError> {
    ids.into_iter()
        .map(|id| {
            let id = id.trim().to_string();
            if identifier_pattern().is_match(&id) {
                Ok(id)
            } else {
                Err(RuleError::InvalidIdentifier(id))
            }
        })
        .collect()
}

/// Deduplicate and order terms by normalized phrase so matching is deterministic
fn sorted_terms(mut terms: Vec<Term>) -> Vec<Term> {
    terms.sort_by_cached_key(|term| (term.phrase(), term.clone()));
    terms.dedup();
    terms
}

//! Article records: the raw boundary shape and the typed candidate built from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::RuleSet;

/// URL and namespace prefixes stripped from raw entry IDs
const ID_PREFIXES: &[&str] = &[
    "http://arxiv.org/abs/",
    "https://arxiv.org/abs/",
    "http://export.arxiv.org/abs/",
    "https://export.arxiv.org/abs/",
    "arxiv:",
];

/// One article entry exactly as delivered by the remote source.
///
/// All assumptions about the remote payload shape stop here;
/// [`CandidateRecord::from_raw`] is the only consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Versioned reference, e.g. `http://arxiv.org/abs/2301.12345v2`
    pub id: String,
    pub title: String,
    pub summary: String,
    /// RFC 3339 timestamp
    pub published: String,
    /// RFC 3339 timestamp
    pub updated: String,
    pub primary_category: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Errors for a single malformed entry; the entry is skipped, the run continues
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Malformed record {id:?}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Unparsable {field} date {value:?} for record {id:?}")]
    DateParse {
        id: String,
        field: &'static str,
        value: String,
    },
}

/// Split a raw entry reference into its version-agnostic identifier and version.
///
/// `http://arxiv.org/abs/2301.12345v2` yields `("2301.12345", 2)`.
pub fn parse_identifier(raw_id: &str) -> Result<(String, u32), RecordError> {
    let malformed = |reason: &str| RecordError::MalformedRecord {
        id: raw_id.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw_id.trim();
    let unprefixed = ID_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);

    let (identifier, version) = unprefixed
        .rsplit_once('v')
        .ok_or_else(|| malformed("missing version suffix"))?;

    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("missing version suffix"));
    }
    let version: u32 = version
        .parse()
        .map_err(|_| malformed("version suffix out of range"))?;
    if version == 0 {
        return Err(malformed("version must be at least 1"));
    }
    if identifier.is_empty() {
        return Err(malformed("empty identifier"));
    }

    Ok((identifier.to_string(), version))
}

fn parse_timestamp(
    id: &str,
    field: &'static str,
    value: &str,
) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RecordError::DateParse {
            id: id.to_string(),
            field,
            value: value.to_string(),
        })
}

/// Primary category first, the rest sorted and deduplicated.
/// Codes containing whitespace are malformed and dropped.
fn normalize_categories(primary: Option<&str>, categories: &[String]) -> Vec<String> {
    let is_valid = |code: &&str| !code.is_empty() && !code.contains(char::is_whitespace);

    let listed = categories.iter().map(|c| c.trim()).filter(is_valid);
    let primary = primary
        .map(str::trim)
        .filter(is_valid)
        .or_else(|| listed.clone().next());

    let Some(primary) = primary else {
        return Vec::new();
    };

    let mut rest: Vec<String> = listed
        .filter(|code| *code != primary)
        .map(str::to_string)
        .collect();
    rest.sort();
    rest.dedup();

    let mut normalized = Vec::with_capacity(rest.len() + 1);
    normalized.push(primary.to_string());
    normalized.extend(rest);
    normalized
}

/// Outcome of running a record through the rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Accepted because its identifier is whitelisted, regardless of other rules
    WhitelistedId,
    /// Accepted because its title matched this whitelist phrase
    WhitelistedTerm(String),
    BlacklistedId,
    /// Rejected because its title matched this blacklist phrase
    BlacklistedTerm(String),
    /// None of its categories is enabled
    OutsideCategories,
    NoWhitelistMatch,
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            Classification::WhitelistedId | Classification::WhitelistedTerm(_)
        )
    }
}

/// One fetched article, normalized and immutable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    identifier: String,
    version: u32,
    title: String,
    categories: Vec<String>,
    abstract_text: String,
    published: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl CandidateRecord {
    /// Map a raw entry into a typed record
    pub fn from_raw(raw: &RawEntry) -> Result<Self, RecordError> {
        let (identifier, version) = parse_identifier(&raw.id)?;

        let categories = normalize_categories(raw.primary_category.as_deref(), &raw.categories);
        if categories.is_empty() {
            return Err(RecordError::MalformedRecord {
                id: raw.id.clone(),
                reason: "no valid category".to_string(),
            });
        }

        let published = parse_timestamp(&raw.id, "published", &raw.published)?;
        let updated = parse_timestamp(&raw.id, "updated", &raw.updated)?;

        Ok(Self {
            identifier,
            version,
            title: raw.title.replace("\n ", ""),
            categories,
            abstract_text: raw.summary.clone(),
            published,
            updated,
        })
    }

    /// Version-agnostic identifier
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Title with line-wrap artifacts removed
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Primary category first, then the others in lexical order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn primary_category(&self) -> &str {
        // Construction guarantees at least one category
        &self.categories[0]
    }

    /// Abstract as delivered, possibly spanning several lines
    pub fn abstract_text(&self) -> &str {
        &self.abstract_text
    }

    pub fn published(&self) -> DateTime<Utc> {
        self.published
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn is_id_whitelisted(&self, rules: &RuleSet) -> bool {
        rules.is_id_whitelisted(&self.identifier)
    }

    pub fn is_id_blacklisted(&self, rules: &RuleSet) -> bool {
        rules.is_id_blacklisted(&self.identifier)
    }

    pub fn title_blacklist_match(&self, rules: &RuleSet) -> Option<String> {
        rules.blacklist_match(&self.title).map(|term| term.phrase())
    }

    pub fn title_whitelist_match(&self, rules: &RuleSet) -> Option<String> {
        rules.matches_whitelist(&self.title)
    }

    /// Apply the rules: ID whitelist > blacklists > category > title whitelist
    pub fn classify(&self, rules: &RuleSet) -> Classification {
        if self.is_id_whitelisted(rules) {
            return Classification::WhitelistedId;
        }
        if self.is_id_blacklisted(rules) {
            return Classification::BlacklistedId;
        }
        if let Some(phrase) = self.title_blacklist_match(rules) {
            return Classification::BlacklistedTerm(phrase);
        }
        if !rules.categories().is_empty()
            && !self.categories.iter().any(|c| rules.has_category(c))
        {
            return Classification::OutsideCategories;
        }
        match self.title_whitelist_match(rules) {
            Some(phrase) => Classification::WhitelistedTerm(phrase),
            None => Classification::NoWhitelistMatch,
        }
    }

    /// Flatten into the shape handed to output collaborators
    pub fn to_record(&self, rules: &RuleSet) -> ExportRecord {
        ExportRecord {
            identifier: self.identifier.clone(),
            version: self.version,
            published: self.published,
            updated: self.updated,
            title: self.title.clone(),
            matched_term: self.title_whitelist_match(rules),
            categories: self.categories.join(", "),
            r#abstract: self.abstract_text.replace('\n', " "),
        }
    }
}

/// Flat exported record consumed by CSV, markdown and feed writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub identifier: String,
    pub version: u32,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub title: String,
    pub matched_term: Option<String>,
    /// Categories joined with `", "`, primary first
    pub categories: String,
    pub r#abstract: String,
}

impl ExportRecord {
    /// Canonical abstract page URL for this record's version
    pub fn url(&self) -> String {
        format!("https://arxiv.org/abs/{}v{}", self.identifier, self.version)
    }
}

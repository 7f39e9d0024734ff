//! Title terms with whole-phrase matching and optional adjacency assertions.

use std::fmt;

use super::RuleError;

/// Characters that would break the remote boolean query syntax.
const RESERVED_CHARS: &[char] = &['"', '(', ')', ':'];

/// Split text into lowercase alphanumeric words.
///
/// Every non-alphanumeric character acts as a separator, so punctuation never
/// takes part in a match and matches always fall on word boundaries.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn parse_phrase(phrase: &str) -> Result<Vec<String>, RuleError> {
    if let Some(c) = phrase.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(RuleError::InvalidTerm(
            phrase.to_string(),
            format!("reserved character {:?}", c),
        ));
    }

    let tokens = tokenize(phrase);
    if tokens.is_empty() {
        return Err(RuleError::InvalidTerm(
            phrase.to_string(),
            "no alphanumeric words".to_string(),
        ));
    }

    Ok(tokens)
}

/// A whitelist or blacklist title term.
///
/// A term matches a title when its words appear as a contiguous phrase.
/// Optional assertions reject an occurrence that is immediately preceded or
/// followed by another phrase, e.g. `review` not preceded by `peer`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    tokens: Vec<String>,
    not_preceded_by: Option<Vec<String>>,
    not_followed_by: Option<Vec<String>>,
}

impl Term {
    /// Create a term from a phrase such as `"survey"` or `"state of the art"`
    pub fn new(phrase: &str) -> Result<Self, RuleError> {
        Ok(Self {
            tokens: parse_phrase(phrase)?,
            not_preceded_by: None,
            not_followed_by: None,
        })
    }

    /// Reject occurrences immediately preceded by `phrase`
    pub fn not_preceded_by(mut self, phrase: &str) -> Result<Self, RuleError> {
        self.not_preceded_by = Some(parse_phrase(phrase)?);
        Ok(self)
    }

    /// Reject occurrences immediately followed by `phrase`
    pub fn not_followed_by(mut self, phrase: &str) -> Result<Self, RuleError> {
        self.not_followed_by = Some(parse_phrase(phrase)?);
        Ok(self)
    }

    /// Normalized phrase: lowercase words joined by single spaces
    pub fn phrase(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn is_multi_word(&self) -> bool {
        self.tokens.len() > 1
    }

    /// Whether the term carries adjacency assertions the remote query cannot express
    pub fn has_assertions(&self) -> bool {
        self.not_preceded_by.is_some() || self.not_followed_by.is_some()
    }

    /// Fragment for the remote query, quoted when the phrase has several words
    pub fn query_fragment(&self) -> String {
        if self.is_multi_word() {
            format!("\"{}\"", self.phrase())
        } else {
            self.phrase()
        }
    }

    /// Check the term against an already tokenized title
    pub(crate) fn matches_tokens(&self, words: &[String]) -> bool {
        let n = self.tokens.len();
        if words.len() < n {
            return false;
        }

        (0..=words.len() - n).any(|start| {
            words[start..start + n] == self.tokens[..] && !self.is_excluded_at(words, start)
        })
    }

    /// Check the term against a raw title
    pub fn matches(&self, title: &str) -> bool {
        self.matches_tokens(&tokenize(title))
    }

    fn is_excluded_at(&self, words: &[String], start: usize) -> bool {
        let end = start + self.tokens.len();

        let preceded = self.not_preceded_by.as_ref().is_some_and(|before| {
            start >= before.len() && words[start - before.len()..start] == before[..]
        });

        let followed = self.not_followed_by.as_ref().is_some_and(|after| {
            end + after.len() <= words.len() && words[end..end + after.len()] == after[..]
        });

        preceded || followed
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.phrase())?;
        if let Some(before) = &self.not_preceded_by {
            write!(f, " (not after \"{}\")", before.join(" "))?;
        }
        if let Some(after) = &self.not_followed_by {
            write!(f, " (not before \"{}\")", after.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Deep Learning: A State-of-the-Art Review!"),
            vec!["deep", "learning", "a", "state", "of", "the", "art", "review"]
        );
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_whole_word_match() {
        let guide = Term::new("guide").unwrap();
        assert!(!guide.matches("Guidelines for practice"));
        assert!(guide.matches("A Guide to X"));
        assert!(guide.matches("guide: the basics"));
    }

    #[test]
    fn test_multi_word_phrase_must_be_contiguous() {
        let term = Term::new("state of the art").unwrap();
        assert!(term.matches("The State-of-the-Art in Graph Learning"));
        assert!(!term.matches("The state of modern art"));
        assert!(term.is_multi_word());
        assert_eq!(term.query_fragment(), "\"state of the art\"");
    }

    #[test]
    fn test_not_preceded_by() {
        let term = Term::new("review").unwrap().not_preceded_by("peer").unwrap();
        assert!(!term.matches("Automating Peer Review"));
        assert!(term.matches("A Review of Peer Review"));
        assert!(term.matches("Review of Methods"));
        assert!(term.has_assertions());
    }

    #[test]
    fn test_not_followed_by() {
        let term = Term::new("survey").unwrap().not_followed_by("data").unwrap();
        assert!(!term.matches("Learning from Survey Data"));
        assert!(term.matches("A Survey of Learning"));
        assert!(term.matches("The last word is survey"));
    }

    #[test]
    fn test_invalid_phrases() {
        assert!(matches!(Term::new(""), Err(RuleError::InvalidTerm(..))));
        assert!(matches!(Term::new("..."), Err(RuleError::InvalidTerm(..))));
        assert!(matches!(Term::new("a \"b\""), Err(RuleError::InvalidTerm(..))));
        assert!(Term::new("ok").unwrap().not_followed_by("(x)").is_err());
    }

    #[test]
    fn test_display() {
        let term = Term::new("Review").unwrap().not_preceded_by("peer").unwrap();
        assert_eq!(term.to_string(), "review (not after \"peer\")");
    }
}

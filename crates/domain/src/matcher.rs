//! Full-string glob matching for configuration object names.
//!
//! Every character is literal except `*`, which matches any (possibly empty)
//! sequence. Matching is anchored at both ends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard character recognised in name patterns.
pub const WILDCARD: char = '*';

/// A compiled object-name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NamePattern {
    raw: Box<str>,
    literals: Vec<Box<str>>,
}

impl NamePattern {
    /// Compile a pattern. Any string is a valid pattern.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw: String = raw.into();
        let literals = raw.split(WILDCARD).map(Box::from).collect();
        Self {
            raw: raw.into_boxed_str(),
            literals,
        }
    }

    /// Original pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true when the pattern contains at least one wildcard.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.literals.len() > 1
    }

    /// Returns true when `candidate` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let Some((first, rest)) = self.literals.split_first() else {
            return candidate.is_empty();
        };
        let Some((last, middle)) = rest.split_last() else {
            return candidate == &**first;
        };

        let Some(mut remaining) = candidate.strip_prefix(&**first) else {
            return false;
        };
        let Some(tail_start) = remaining.len().checked_sub(last.len()) else {
            return false;
        };
        let Some(tail) = remaining.get(tail_start..) else {
            return false;
        };
        if tail != &**last {
            return false;
        }
        remaining = remaining.get(..tail_start).unwrap_or_default();

        // Leftmost placement of each inner literal leaves the most room for the rest.
        for literal in middle {
            match remaining.find(&**literal) {
                Some(index) => {
                    remaining = remaining.get(index + literal.len()..).unwrap_or_default();
                },
                None => return false,
            }
        }
        true
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.raw)
    }
}

impl From<String> for NamePattern {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<NamePattern> for String {
    fn from(value: NamePattern) -> Self {
        value.raw.into_string()
    }
}

/// Match `pattern` against `candidate` without keeping the compiled form.
#[must_use]
pub fn matches(pattern: &str, candidate: &str) -> bool {
    NamePattern::new(pattern).matches(candidate)
}

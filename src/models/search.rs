//! Catalog search request types

use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

/// Page size used when a search request carries no count
pub const DEFAULT_COUNT: i64 = 5;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Split text into lower-cased search words: maximal runs of word characters
/// of length two or more.
pub fn words(text: &str) -> Vec<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Validated find-books request
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct SearchQuery {
    pub search: String,
    #[validate(range(min = 0, message = "must be a non-negative integer"))]
    pub index: i64,
    #[validate(range(min = 0, message = "must be a non-negative integer"))]
    pub count: i64,
}

/// Query handed to the store: every word must match, results sorted by
/// title then isbn and sliced to `[index, index + count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub words: Vec<String>,
    pub index: i64,
    pub count: i64,
}

impl From<&SearchQuery> for BookQuery {
    fn from(query: &SearchQuery) -> Self {
        let mut words = words(&query.search);
        words.sort();
        words.dedup();
        Self {
            words,
            index: query.index,
            count: query.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_skip_single_characters() {
        assert_eq!(words("Animal  FARM, a fable!"), vec!["animal", "farm", "fable"]);
        assert!(words("a b ! ?").is_empty());
    }

    #[test]
    fn test_book_query_dedups_words() {
        let query = SearchQuery {
            search: "farm Animal farm".to_string(),
            index: 2,
            count: 3,
        };
        let query = BookQuery::from(&query);
        assert_eq!(query.words, vec!["animal", "farm"]);
        assert_eq!((query.index, query.count), (2, 3));
    }
}

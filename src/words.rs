//! Word pool: built-in study list and uploaded list ingestion
//!
//! Uploaded lists are plain text, one `term: definition` pair per line.

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// A term the player types and the definition shown falling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub term: String,
    pub definition: String,
}

impl WordEntry {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }
}

const DEFAULT_WORDS: &[(&str, &str)] = &[
    (
        "polymorphism",
        "Ability of different objects to respond to the same method call",
    ),
    (
        "encapsulation",
        "Bundling data and methods that operate on the data",
    ),
    (
        "inheritance",
        "Mechanism where a class derives from another class",
    ),
    (
        "abstraction",
        "Exposing essential behavior while hiding implementation details",
    ),
    ("recursion", "A function that calls itself on a smaller input"),
    (
        "closure",
        "A function bundled together with references to its surrounding state",
    ),
];

/// Built-in study list used until a custom list is uploaded
pub fn default_words() -> Vec<WordEntry> {
    DEFAULT_WORDS
        .iter()
        .map(|(term, definition)| WordEntry::new(*term, *definition))
        .collect()
}

/// Parse an uploaded list.
///
/// Blank lines are skipped. Each remaining line splits on its first `:`; any
/// further colons stay in the definition. A line without a colon becomes a
/// term with an empty definition.
pub fn parse_word_list(text: &str) -> Result<Vec<WordEntry>, GameError> {
    let entries: Vec<WordEntry> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(':') {
            Some((term, definition)) => WordEntry::new(term.trim(), definition.trim()),
            None => WordEntry::new(line, ""),
        })
        .collect();

    if entries.is_empty() {
        return Err(GameError::EmptyWordList);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_on_first_colon() {
        let words = parse_word_list("url: scheme://host:port/path\n").unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].term, "url");
        assert_eq!(words[0].definition, "scheme://host:port/path");
    }

    #[test]
    fn test_parse_skips_blank_lines_and_trims() {
        let text = "\r\n  cat :  meow \r\n\n   \ndog:woof\r\n";
        let words = parse_word_list(text).unwrap();
        assert_eq!(
            words,
            vec![WordEntry::new("cat", "meow"), WordEntry::new("dog", "woof")]
        );
    }

    #[test]
    fn test_parse_keeps_lines_without_definition() {
        let words = parse_word_list("lonely\n: no term").unwrap();
        assert_eq!(words[0], WordEntry::new("lonely", ""));
        assert_eq!(words[1], WordEntry::new("", "no term"));
    }

    #[test]
    fn test_parse_empty_is_error() {
        assert_eq!(parse_word_list(""), Err(GameError::EmptyWordList));
        assert_eq!(parse_word_list("\n  \n\t\n"), Err(GameError::EmptyWordList));
    }

    #[test]
    fn test_default_words_nonempty() {
        let words = default_words();
        assert!(!words.is_empty());
        assert!(words.iter().all(|w| !w.term.is_empty() && !w.definition.is_empty()));
    }
}

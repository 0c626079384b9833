//! Text quality heuristics for titles and abstracts

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

static BULLETIN_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]{4}\d{2}[\s_]*[A-Z]{4}").expect("valid regex"));

static ACRONYM: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]\.*){2,}s?").expect("valid regex"));

static MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"</?[A-Za-z][A-Za-z0-9:-]*(\s+[^<>]*)?/?>"#).expect("valid regex")
});

/// Whether the text embeds a GTS bulletin header such as `SAUS70 KWBC`
pub fn has_bulletin_header(text: &str) -> bool {
    BULLETIN_HEADER.is_match(text)
}

/// Whether the text contains HTML-like start or end tags
pub fn contains_markup(text: &str) -> bool {
    MARKUP.is_match(text)
}

/// Number of acronyms (`WMO`, `U.S.`, `NWPs`) in the text
pub fn acronym_count(text: &str) -> usize {
    ACRONYM.find_iter(text).count()
}

/// Title case: every cased run starts upper case and continues lower case
///
/// Requires at least one cased character. Uncased characters (digits,
/// spaces, punctuation) start a new run.
pub fn is_title_case(text: &str) -> bool {
    let mut cased_seen = false;
    let mut previous_cased = false;
    for c in text.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased_seen = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased_seen = true;
        } else {
            previous_cased = false;
        }
    }
    cased_seen
}

/// Whether every word is non-empty and made of letters and digits only
pub fn all_alphanumeric<'a>(words: impl IntoIterator<Item = &'a str>) -> bool {
    words
        .into_iter()
        .all(|w| !w.is_empty() && w.chars().all(char::is_alphanumeric))
}

/// Spelling checker
pub trait Speller {
    /// Words of `text` that are not recognised, in order of appearance
    fn misspelled(&self, text: &str) -> Vec<String>;
}

/// Speller backed by a plain word list
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    /// Build from words, case-insensitively
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Parse a word list with one word per line
    pub fn parse(content: &str) -> Self {
        Self::from_words(content.lines())
    }

    /// Load a word list file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Resource(format!("Failed to read word list '{}': {}", path.display(), e))
        })?;
        Ok(Self::parse(&content))
    }

    /// Number of known words
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether a word is known
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }
}

impl Speller for WordList {
    fn misspelled(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut unknown = Vec::new();
        for token in text.split(|c: char| !(c.is_alphanumeric() || c == '\'')) {
            let token = token.trim_matches('\'');
            if token.is_empty() || token.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            // acronyms and codes
            if token.chars().count() > 1 && token.chars().all(|c| !c.is_lowercase()) {
                continue;
            }
            let lower = token.to_lowercase();
            let known = self.words.contains(&lower)
                || lower
                    .strip_suffix("'s")
                    .map_or(false, |stem| self.words.contains(stem));
            if !known && seen.insert(lower.clone()) {
                unknown.push(lower);
            }
        }
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulletin_header() {
        assert!(has_bulletin_header("Observations SAUS70 KWBC"));
        assert!(has_bulletin_header("ISMX01_EDZW"));
        assert!(!has_bulletin_header("Surface observations from Canada"));
    }

    #[test]
    fn test_markup() {
        assert!(contains_markup("A <b>bold</b> abstract"));
        assert!(contains_markup("line<br/>break"));
        assert!(!contains_markup("temperature < 5 and > 2"));
    }

    #[test]
    fn test_acronyms() {
        assert_eq!(acronym_count("WMO data from the U.S. and NWPs"), 3);
        assert_eq!(acronym_count("Daily Temperature"), 0);
    }

    #[test]
    fn test_title_case() {
        assert!(is_title_case("Hourly Surface Observations"));
        assert!(is_title_case("Radar 2024 Composite"));
        assert!(!is_title_case("Hourly surface observations"));
        assert!(!is_title_case("WMO Observations"));
        assert!(!is_title_case("2024"));
    }

    #[test]
    fn test_all_alphanumeric() {
        assert!(all_alphanumeric("Hourly Surface 2024".split_whitespace()));
        assert!(!all_alphanumeric("Hourly (Surface)".split_whitespace()));
    }

    #[test]
    fn test_word_list_speller() {
        let speller = WordList::parse("hourly\nsurface\nobservations\ncanada\n");
        assert_eq!(speller.len(), 4);
        assert!(speller.misspelled("Hourly Surface Observations").is_empty());
        assert_eq!(
            speller.misspelled("Hourly Surfase Observations from WMO in 2024 surfase"),
            vec!["surfase".to_string(), "from".to_string(), "in".to_string()]
        );
        assert!(speller.misspelled("Canada's surface").is_empty());
    }
}

//! Suspicious keyword scan

use regex::RegexSet;
use truthlens_core::{Error, Result};

/// Case-insensitive, word-boundary keyword matcher
///
/// Matches are reported in keyword-list order, each keyword at most once.
#[derive(Debug, Clone)]
pub struct KeywordScanner {
    keywords: Vec<String>,
    set: RegexSet,
}

impl KeywordScanner {
    /// Build a scanner from an ordered keyword list
    pub fn new(keywords: &[String]) -> Result<Self> {
        let mut ordered: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() || ordered.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
                continue;
            }
            ordered.push(keyword.to_string());
        }

        let patterns = ordered
            .iter()
            .map(|k| format!(r"(?i)\b{}\b", regex::escape(k)));

        let set = RegexSet::new(patterns).map_err(|e| {
            Error::config(format!("Failed to build keyword matcher: {}", e))
        })?;

        Ok(Self {
            keywords: ordered,
            set,
        })
    }

    /// Keywords present in `text`
    pub fn scan(&self, text: &str) -> Vec<String> {
        self.set
            .matches(text)
            .into_iter()
            .map(|idx| self.keywords[idx].clone())
            .collect()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_keywords;

    fn scanner() -> KeywordScanner {
        KeywordScanner::new(&default_keywords()).unwrap()
    }

    #[test]
    fn test_case_insensitive_matches() {
        let found = scanner().scan("This is a FAKE conspiracy");
        assert_eq!(found, vec!["fake", "conspiracy"]);
    }

    #[test]
    fn test_keyword_list_order() {
        let found = scanner().scan("Misleading claims and a hoax, all fabricated");
        assert_eq!(found, vec!["hoax", "fabricated", "misleading"]);
    }

    #[test]
    fn test_word_boundaries() {
        let found = scanner().scan("The fakery was unmisleading; hoaxes abound");
        assert!(found.is_empty());

        let found = scanner().scan("fake-news outlets");
        assert_eq!(found, vec!["fake"]);
    }

    #[test]
    fn test_repeats_reported_once() {
        let found = scanner().scan("fake fake FAKE");
        assert_eq!(found, vec!["fake"]);
    }

    #[test]
    fn test_duplicate_and_blank_keywords_dropped() {
        let keywords = vec![
            "Hoax".to_string(),
            " ".to_string(),
            "hoax".to_string(),
            "c++".to_string(),
        ];
        let scanner = KeywordScanner::new(&keywords).unwrap();
        assert_eq!(scanner.keywords(), &["Hoax".to_string(), "c++".to_string()]);
        assert_eq!(scanner.scan("a HOAX"), vec!["Hoax"]);
    }
}

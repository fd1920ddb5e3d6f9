//! Advisory moderation of uploaded game sources.
//!
//! The check is a plain denylist over the lower-cased text. It catches careless uploads,
//! not determined ones: spacing, homoglyphs and encodings all get through.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

const FORBIDDEN_TERMS: [&str; 25] = [
    "porn",
    "porno",
    "xxx",
    "sex",
    "nude",
    "naked",
    "erotic",
    "adult",
    "18+",
    "drugs",
    "violence",
    "hate",
    "racism",
    "extremism",
    "terrorism",
    "порно",
    "секс",
    "голый",
    "обнаженный",
    "эротика",
    "наркотики",
    "насилие",
    "ненависть",
    "расизм",
    "экстремизм",
];

const SUSPICIOUS_PATTERNS: [&str; 8] = [
    r"porn",
    r"xxx",
    r"sex",
    r"adult",
    r"18\+",
    r"нарко",
    r"насилие",
    r"порно",
];

/// Why a text was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("forbidden word found: {0}")]
    ForbiddenWord(String),

    #[error("forbidden content found")]
    ForbiddenContent,
}

/// Decides whether uploaded text may be published.
pub trait ContentFilter: Send + Sync {
    fn check(&self, text: &str) -> Result<(), Rejection>;
}

/// Two passes over the lower-cased text: literal terms first, reporting the first one
/// found in list order, then case-insensitive patterns.
#[derive(Debug, Clone)]
pub struct DenylistFilter {
    terms: Vec<String>,
    patterns: Vec<Regex>,
}

impl DenylistFilter {
    pub fn new<T, P>(terms: T, patterns: P) -> Result<Self, regex::Error>
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        let patterns: Vec<Regex> = patterns
            .into_iter()
            .map(|p| RegexBuilder::new(p.as_ref()).case_insensitive(true).build())
            .collect::<Result<_, _>>()?;
        Ok(Self { terms, patterns })
    }

    /// The built-in English and Russian lists.
    pub fn standard() -> Self {
        static STANDARD: OnceLock<DenylistFilter> = OnceLock::new();
        STANDARD
            .get_or_init(|| {
                DenylistFilter::new(FORBIDDEN_TERMS, SUSPICIOUS_PATTERNS)
                    .expect("built-in patterns are valid")
            })
            .clone()
    }
}

impl Default for DenylistFilter {
    fn default() -> Self {
        Self::standard()
    }
}

impl ContentFilter for DenylistFilter {
    fn check(&self, text: &str) -> Result<(), Rejection> {
        let lower = text.to_lowercase();

        if let Some(term) = self.terms.iter().find(|t| lower.contains(t.as_str())) {
            return Err(Rejection::ForbiddenWord(term.clone()));
        }

        if self.patterns.iter().any(|re| re.is_match(&lower)) {
            return Err(Rejection::ForbiddenContent);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_game_passes() {
        let filter = DenylistFilter::standard();
        let html = "<html><body><canvas id=\"c\"></canvas><script>let score = 0;</script></body></html>";
        assert_eq!(filter.check(html), Ok(()));
        assert_eq!(filter.check(""), Ok(()));
    }

    #[test]
    fn test_first_listed_term_is_reported() {
        let filter = DenylistFilter::standard();
        // "porno" also contains "porn", which comes first in the list
        assert_eq!(
            filter.check("some PORNO here"),
            Err(Rejection::ForbiddenWord("porn".to_string()))
        );
        assert_eq!(
            filter.check("nude and xxx"),
            Err(Rejection::ForbiddenWord("xxx".to_string()))
        );
    }

    #[test]
    fn test_case_insensitive_cyrillic_term() {
        let filter = DenylistFilter::standard();
        assert_eq!(
            filter.check("<p>НАСИЛИЕ</p>"),
            Err(Rejection::ForbiddenWord("насилие".to_string()))
        );
    }

    #[test]
    fn test_substring_matches_count() {
        let filter = DenylistFilter::standard();
        // Plain substring search, no word boundaries
        assert_eq!(
            filter.check("whatever"),
            Err(Rejection::ForbiddenWord("hate".to_string()))
        );
        assert_eq!(
            filter.check("Essex county"),
            Err(Rejection::ForbiddenWord("sex".to_string()))
        );
    }

    #[test]
    fn test_pattern_pass_catches_what_terms_miss() {
        let filter = DenylistFilter::standard();
        // "наркотик" is not a listed term but matches the "нарко" pattern
        assert_eq!(
            filter.check("продаём наркотик"),
            Err(Rejection::ForbiddenContent)
        );
    }

    #[test]
    fn test_custom_lists() {
        let filter = DenylistFilter::new(["Spoiler"], [r"\bboss\s+\d+\b"]).unwrap();
        assert_eq!(
            filter.check("A SPOILER follows"),
            Err(Rejection::ForbiddenWord("spoiler".to_string()))
        );
        assert_eq!(filter.check("Boss 3 awaits"), Err(Rejection::ForbiddenContent));
        assert_eq!(filter.check("bossy"), Ok(()));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(DenylistFilter::new(Vec::<String>::new(), ["("]).is_err());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::ForbiddenWord("xxx".into()).to_string(),
            "forbidden word found: xxx"
        );
        assert_eq!(Rejection::ForbiddenContent.to_string(), "forbidden content found");
    }
}

//! Language tag comparison.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an audience member's language is compared with an utterance's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageMatch {
    /// Tags must be identical strings ("en-US" != "en")
    #[default]
    Exact,
    /// Only the primary subtag counts, case-insensitively ("en-US" == "en")
    PrimarySubtag,
}

impl LanguageMatch {
    /// True when `a` and `b` name the same language under this policy
    pub fn matches(&self, a: &str, b: &str) -> bool {
        match self {
            LanguageMatch::Exact => a == b,
            LanguageMatch::PrimarySubtag => {
                primary_subtag(a).eq_ignore_ascii_case(primary_subtag(b))
            }
        }
    }
}

impl FromStr for LanguageMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(LanguageMatch::Exact),
            "primary_subtag" | "primary-subtag" | "prefix" => Ok(LanguageMatch::PrimarySubtag),
            other => Err(format!("unknown language match mode: {}", other)),
        }
    }
}

/// The primary subtag of a BCP 47-ish tag: "en-US" -> "en", "pt_BR" -> "pt"
pub fn primary_subtag(tag: &str) -> &str {
    let tag = tag.trim();
    tag.split(['-', '_']).next().unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_subtag() {
        assert_eq!(primary_subtag("en-US"), "en");
        assert_eq!(primary_subtag("pt_BR"), "pt");
        assert_eq!(primary_subtag("fr"), "fr");
        assert_eq!(primary_subtag(""), "");
    }

    #[test]
    fn test_exact_match() {
        let m = LanguageMatch::Exact;
        assert!(m.matches("en", "en"));
        assert!(!m.matches("en-US", "en"));
        assert!(!m.matches("EN", "en"));
    }

    #[test]
    fn test_primary_subtag_match() {
        let m = LanguageMatch::PrimarySubtag;
        assert!(m.matches("en-US", "en"));
        assert!(m.matches("EN_gb", "en-US"));
        assert!(!m.matches("es", "en"));
    }

    #[test]
    fn test_parse() {
        assert_eq!("exact".parse::<LanguageMatch>().unwrap(), LanguageMatch::Exact);
        assert_eq!(
            "primary_subtag".parse::<LanguageMatch>().unwrap(),
            LanguageMatch::PrimarySubtag
        );
        assert!("fuzzy".parse::<LanguageMatch>().is_err());
    }
}

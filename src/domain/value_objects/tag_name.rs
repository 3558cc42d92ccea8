//! Tag label normalisation.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_TAG_LENGTH: usize = 32;

/// A tag label in canonical form: lower-case ASCII letters, digits, `_` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    /// Normalise user input. A leading `#` is dropped and inner whitespace
    /// becomes `-`. Returns `None` when nothing valid remains or the result
    /// is too long.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('#').trim();
        if trimmed.is_empty() {
            return None;
        }

        let mut out = String::with_capacity(trimmed.len());
        let mut last_dash = false;
        for ch in trimmed.chars() {
            let mapped = if ch.is_whitespace() { '-' } else { ch.to_ascii_lowercase() };
            match mapped {
                'a'..='z' | '0'..='9' | '_' => {
                    out.push(mapped);
                    last_dash = false;
                }
                '-' => {
                    if !last_dash {
                        out.push('-');
                    }
                    last_dash = true;
                }
                _ => return None,
            }
        }

        let out = out.trim_matches('-').to_string();
        if out.is_empty() || out.len() > MAX_TAG_LENGTH {
            return None;
        }
        Some(Self(out))
    }

    /// Normalise a prefix for search. Whitespace becomes `-` like in
    /// [`TagName::parse`]; other invalid characters are dropped.
    pub fn normalize_prefix(raw: &str) -> String {
        let mut out = String::new();
        for ch in raw.trim().trim_start_matches('#').chars() {
            let mapped = if ch.is_whitespace() { '-' } else { ch.to_ascii_lowercase() };
            match mapped {
                'a'..='z' | '0'..='9' | '_' => out.push(mapped),
                '-' if !out.is_empty() && !out.ends_with('-') => out.push('-'),
                _ => {}
            }
            if out.len() >= MAX_TAG_LENGTH {
                break;
            }
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Rust", Some("rust"))]
    #[test_case("  #Digital Art ", Some("digital-art"))]
    #[test_case("pixel__art", Some("pixel__art"))]
    #[test_case("a  -  b", Some("a-b"))]
    #[test_case("", None)]
    #[test_case("#", None)]
    #[test_case("naïve", None)]
    #[test_case("semi;colon", None)]
    fn test_parse(raw: &str, expected: Option<&str>) {
        assert_eq!(TagName::parse(raw).as_ref().map(TagName::as_str), expected);
    }

    #[test]
    fn test_too_long_rejected() {
        let raw = "x".repeat(MAX_TAG_LENGTH + 1);
        assert!(TagName::parse(&raw).is_none());
        assert!(TagName::parse(&"x".repeat(MAX_TAG_LENGTH)).is_some());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(TagName::normalize_prefix(" #Ar!t"), "art");
        assert_eq!(TagName::normalize_prefix("#Digital A"), "digital-a");
        assert_eq!(TagName::normalize_prefix("pixel "), "pixel");
    }
}

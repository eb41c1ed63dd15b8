//! Tenant identifiers.
//!
//! A family name arrives from the outside world (URL path, CLI argument) in
//! whatever case the caller typed. [`FamilyName::parse`] is the single place
//! it is normalized; everything past the boundary takes a `&FamilyName` and
//! never lower-cases again.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

/// Longest accepted family name.
const MAX_LEN: usize = 64;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9_.-]*$").expect("family name pattern is a valid regex")
    })
}

/// A normalized, validated family (tenant) name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FamilyName(String);

impl FamilyName {
    /// Normalize and validate a raw family name.
    ///
    /// Surrounding whitespace is trimmed and the name is lower-cased. The
    /// result doubles as a database file stem, so path separators and
    /// leading dots are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFamilyName`] if the name is empty, too long,
    /// or contains characters outside `[a-z0-9_.-]`.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        let reject = |reason| Error::InvalidFamilyName {
            name: raw.to_string(),
            reason,
        };

        if normalized.is_empty() {
            return Err(reject("name is empty"));
        }
        if normalized.len() > MAX_LEN {
            return Err(reject("name is longer than 64 characters"));
        }
        if !name_pattern().is_match(&normalized) {
            return Err(reject(
                "name must start with a letter or digit and contain only letters, digits, '_', '.' or '-'",
            ));
        }
        Ok(Self(normalized))
    }

    /// The normalized name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FamilyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FamilyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lowercases_once() {
        let name = FamilyName::parse("  Office ").unwrap();
        assert_eq!(name.as_str(), "office");
        assert_eq!(FamilyName::parse("OFFICE").unwrap(), name);
    }

    #[test]
    fn test_parse_accepts_punctuation() {
        assert!(FamilyName::parse("home-2.lab_net").is_ok());
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = FamilyName::parse("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_parse_rejects_path_traversal() {
        assert!(FamilyName::parse("../etc").is_err());
        assert!(FamilyName::parse("a/b").is_err());
        assert!(FamilyName::parse(".hidden").is_err());
    }

    #[test]
    fn test_parse_rejects_long_names() {
        let long = "a".repeat(65);
        assert!(FamilyName::parse(&long).is_err());
        assert!(FamilyName::parse(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_display_and_serialize() {
        let name = FamilyName::parse("Lab").unwrap();
        assert_eq!(name.to_string(), "lab");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"lab\"");
    }
}

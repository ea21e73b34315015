//! Model identifiers and the cache-name patterns derived from them.

use crate::error::Pdf2TexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hub repository kinds that get their own cache folder prefix.
const REPO_PREFIXES: [&str; 3] = ["models--", "datasets--", "spaces--"];

/// A hub repository identifier such as `Norm/nougat-latex-base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    /// Parse an identifier. Surrounding whitespace is trimmed; an empty
    /// identifier is rejected because its pattern would match every entry.
    pub fn parse(s: &str) -> Result<Self, Pdf2TexError> {
        let s = s.trim();
        if s.is_empty() || s.chars().all(|c| c == '/') {
            return Err(Pdf2TexError::InvalidConfig(
                "Model identifier must not be empty".into(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The cache-safe form: every `/` replaced with `--`.
    pub fn pattern(&self, mode: MatchMode) -> ModelPattern {
        ModelPattern {
            needle: self.0.replace('/', "--"),
            mode,
        }
    }
}

impl FromStr for ModelId {
    type Err = Pdf2TexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an entry name is compared against a [`ModelPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    /// The name contains the pattern anywhere. (default)
    ///
    /// Loose on purpose: `Org/Name` also matches `models--Org--Name-v2`.
    #[default]
    Substring,
    /// The name is exactly the pattern or `models--`/`datasets--`/`spaces--`
    /// followed by the pattern.
    Exact,
}

/// The name pattern derived from a [`ModelId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPattern {
    needle: String,
    mode: MatchMode,
}

impl ModelPattern {
    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Whether a file or directory name belongs to this model.
    pub fn matches(&self, name: &str) -> bool {
        match self.mode {
            MatchMode::Substring => name.contains(&self.needle),
            MatchMode::Exact => {
                name == self.needle
                    || REPO_PREFIXES
                        .iter()
                        .any(|p| name.strip_prefix(p) == Some(self.needle.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_becomes_double_hyphen() {
        let id = ModelId::parse("Norm/nougat-latex-base").unwrap();
        assert_eq!(
            id.pattern(MatchMode::Substring).as_str(),
            "Norm--nougat-latex-base"
        );
    }

    #[test]
    fn every_separator_is_replaced() {
        let id = ModelId::parse("a/b/c").unwrap();
        assert_eq!(id.pattern(MatchMode::Substring).as_str(), "a--b--c");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        assert!(ModelId::parse("").is_err());
        assert!(ModelId::parse("   ").is_err());
        assert!(ModelId::parse("/").is_err());
    }

    #[test]
    fn substring_mode_is_loose() {
        let p = ModelId::parse("Org/Name").unwrap().pattern(MatchMode::Substring);
        assert!(p.matches("models--Org--Name"));
        assert!(p.matches("models--Org--Name-v2"));
        assert!(!p.matches("models--Org--OtherName"));
    }

    #[test]
    fn exact_mode_matches_only_hub_folder_names() {
        let p = ModelId::parse("Org/Name").unwrap().pattern(MatchMode::Exact);
        assert!(p.matches("models--Org--Name"));
        assert!(p.matches("datasets--Org--Name"));
        assert!(p.matches("Org--Name"));
        assert!(!p.matches("models--Org--Name-v2"));
        assert!(!p.matches("models--Org--OtherName"));
    }

    #[test]
    fn from_str_round_trips_display() {
        let id: ModelId = " Org/Name ".parse().unwrap();
        assert_eq!(id.to_string(), "Org/Name");
    }
}

// 🚦 Status Normalizer - Synonyms as Data
// Maps free-text condition tokens ("excellent", "needs repair", "хорошо", "3")
// onto exactly three canonical levels.

use crate::error::InputError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CANONICAL STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    /// Needs repair
    Poor,

    /// Usable, nothing urgent
    Average,

    /// Fully serviced
    Good,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 3] = [
        CanonicalStatus::Poor,
        CanonicalStatus::Average,
        CanonicalStatus::Good,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Poor => "poor",
            CanonicalStatus::Average => "average",
            CanonicalStatus::Good => "good",
        }
    }

    /// Position in the condition ordering: Poor(1) < Average(2) < Good(3)
    pub fn rank(&self) -> u8 {
        match self {
            CanonicalStatus::Poor => 1,
            CanonicalStatus::Average => 2,
            CanonicalStatus::Good => 3,
        }
    }

    /// Comma-separated list of canonical values, for error messages
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse of the stored form ("poor" / "average" / "good")
impl FromStr for CanonicalStatus {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poor" => Ok(CanonicalStatus::Poor),
            "average" => Ok(CanonicalStatus::Average),
            "good" => Ok(CanonicalStatus::Good),
            other => Err(InputError::UnknownStatus {
                raw: other.to_string(),
                allowed: CanonicalStatus::allowed_values(),
            }),
        }
    }
}

// ============================================================================
// SYNONYM TABLE
// ============================================================================

const BUILTIN_SYNONYMS: &[(&str, CanonicalStatus)] = &[
    // Poor
    ("poor", CanonicalStatus::Poor),
    ("bad", CanonicalStatus::Poor),
    ("broken", CanonicalStatus::Poor),
    ("damaged", CanonicalStatus::Poor),
    ("worn", CanonicalStatus::Poor),
    ("needs repair", CanonicalStatus::Poor),
    ("needs service", CanonicalStatus::Poor),
    ("1", CanonicalStatus::Poor),
    ("плохо", CanonicalStatus::Poor),
    ("плохое", CanonicalStatus::Poor),
    ("плохой", CanonicalStatus::Poor),
    ("требует ремонта", CanonicalStatus::Poor),
    // Average
    ("average", CanonicalStatus::Average),
    ("avg", CanonicalStatus::Average),
    ("ok", CanonicalStatus::Average),
    ("okay", CanonicalStatus::Average),
    ("fair", CanonicalStatus::Average),
    ("normal", CanonicalStatus::Average),
    ("medium", CanonicalStatus::Average),
    ("satisfactory", CanonicalStatus::Average),
    ("2", CanonicalStatus::Average),
    ("средне", CanonicalStatus::Average),
    ("среднее", CanonicalStatus::Average),
    ("средний", CanonicalStatus::Average),
    ("нормально", CanonicalStatus::Average),
    ("удовлетворительно", CanonicalStatus::Average),
    // Good
    ("good", CanonicalStatus::Good),
    ("great", CanonicalStatus::Good),
    ("excellent", CanonicalStatus::Good),
    ("fine", CanonicalStatus::Good),
    ("perfect", CanonicalStatus::Good),
    ("new", CanonicalStatus::Good),
    ("3", CanonicalStatus::Good),
    ("хорошо", CanonicalStatus::Good),
    ("хорошее", CanonicalStatus::Good),
    ("хороший", CanonicalStatus::Good),
    ("отлично", CanonicalStatus::Good),
    ("отличное", CanonicalStatus::Good),
];

static BUILTIN_TABLE: Lazy<HashMap<String, CanonicalStatus>> = Lazy::new(|| {
    BUILTIN_SYNONYMS
        .iter()
        .map(|(token, status)| (token.to_string(), *status))
        .collect()
});

fn normalize_token(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// STATUS NORMALIZER
// ============================================================================

#[derive(Debug, Clone)]
pub struct StatusNormalizer {
    synonyms: HashMap<String, CanonicalStatus>,
}

impl StatusNormalizer {
    /// Normalizer with the built-in synonym table
    pub fn new() -> Self {
        StatusNormalizer {
            synonyms: BUILTIN_TABLE.clone(),
        }
    }

    /// Built-in table extended with extra synonyms (e.g. from config)
    pub fn with_synonyms<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = (S, CanonicalStatus)>,
        S: AsRef<str>,
    {
        let mut normalizer = StatusNormalizer::new();
        for (token, status) in extra {
            normalizer.add_synonym(token.as_ref(), status);
        }
        normalizer
    }

    /// Register a synonym; later registrations override earlier ones
    pub fn add_synonym(&mut self, token: &str, status: CanonicalStatus) {
        let key = normalize_token(token);
        if !key.is_empty() {
            self.synonyms.insert(key, status);
        }
    }

    /// Map a raw status token onto a canonical status
    pub fn normalize(&self, raw: &str) -> Result<CanonicalStatus, InputError> {
        self.synonyms
            .get(&normalize_token(raw))
            .copied()
            .ok_or_else(|| InputError::UnknownStatus {
                raw: raw.trim().to_string(),
                allowed: CanonicalStatus::allowed_values(),
            })
    }

    pub fn synonym_count(&self) -> usize {
        self.synonyms.len()
    }
}

impl Default for StatusNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_values_normalize_to_themselves() {
        let normalizer = StatusNormalizer::new();

        for status in CanonicalStatus::ALL {
            assert_eq!(normalizer.normalize(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_synonyms_are_case_insensitive() {
        let normalizer = StatusNormalizer::new();

        assert_eq!(normalizer.normalize("GOOD").unwrap(), CanonicalStatus::Good);
        assert_eq!(normalizer.normalize("  Excellent ").unwrap(), CanonicalStatus::Good);
        assert_eq!(normalizer.normalize("Needs   Repair").unwrap(), CanonicalStatus::Poor);
        assert_eq!(normalizer.normalize("Хорошо").unwrap(), CanonicalStatus::Good);
        assert_eq!(normalizer.normalize("средне").unwrap(), CanonicalStatus::Average);
        assert_eq!(normalizer.normalize("2").unwrap(), CanonicalStatus::Average);
    }

    #[test]
    fn test_unknown_status_lists_allowed_values() {
        let normalizer = StatusNormalizer::new();

        let err = normalizer.normalize("sparkly").unwrap_err();
        let message = err.to_string();

        assert!(message.contains("sparkly"));
        assert!(message.contains("poor, average, good"));
    }

    #[test]
    fn test_extra_synonyms() {
        let normalizer = StatusNormalizer::with_synonyms(vec![
            ("Mint", CanonicalStatus::Good),
            ("so-so", CanonicalStatus::Average),
        ]);

        assert_eq!(normalizer.normalize("mint").unwrap(), CanonicalStatus::Good);
        assert_eq!(normalizer.normalize("SO-SO").unwrap(), CanonicalStatus::Average);
        assert_eq!(normalizer.synonym_count(), BUILTIN_SYNONYMS.len() + 2);
    }

    #[test]
    fn test_rank_ordering() {
        assert!(CanonicalStatus::Poor < CanonicalStatus::Average);
        assert!(CanonicalStatus::Average < CanonicalStatus::Good);
        assert_eq!(CanonicalStatus::Good.rank(), 3);
        assert_eq!("average".parse::<CanonicalStatus>().unwrap(), CanonicalStatus::Average);
        assert!("Average".parse::<CanonicalStatus>().is_err());
    }
}

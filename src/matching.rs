// 🔍 Vehicle Resolver - free-text name → registry row
// Four stages, first hit wins: Exact, Case-Insensitive, Fuzzy, Keyword
//
// Keyword overlap only ever produces suggestions here; `search` is the
// separate lookup path where keyword hits count as results.

use crate::config::MatchingConfig;
use crate::normalize::{keyword_tokens, normalize_name, similarity};
use crate::registry::{VehicleRecord, VehicleRegistry};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Confidence assigned to a case-insensitive exact match
pub const CASE_INSENSITIVE_CONFIDENCE: f64 = 0.95;

/// Upper bound on alternatives, whatever the config asks for
pub const MAX_ALTERNATIVES: usize = 3;

// ============================================================================
// MATCH TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Byte-equal after trimming
    Exact,

    /// Equal ignoring case
    CaseInsensitive,

    /// Similarity above the configured threshold
    Fuzzy,

    /// Shared keywords (suggestions only)
    Keyword,

    /// Another row sharing the matched name, picked by duplicate criteria
    Duplicate,

    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::CaseInsensitive => "case-insensitive",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Keyword => "keyword",
            MatchType::Duplicate => "duplicate",
            MatchType::None => "none",
        }
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub record: VehicleRecord,
    pub score: f64,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub query: String,
    pub found: bool,
    pub record: Option<VehicleRecord>,
    pub match_type: MatchType,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    /// Next-best candidates, best first
    pub alternatives: Vec<Candidate>,

    /// Every registry row sharing the matched row's normalized name (≥ 2, or empty)
    pub duplicates: Vec<VehicleRecord>,
}

impl MatchResult {
    fn not_found(query: &str, alternatives: Vec<Candidate>) -> Self {
        MatchResult {
            query: query.to_string(),
            found: false,
            record: None,
            match_type: MatchType::None,
            confidence: 0.0,
            alternatives,
            duplicates: Vec::new(),
        }
    }

    fn found(query: &str, record: VehicleRecord, match_type: MatchType, confidence: f64) -> Self {
        MatchResult {
            query: query.to_string(),
            found: true,
            record: Some(record),
            match_type,
            confidence,
            alternatives: Vec::new(),
            duplicates: Vec::new(),
        }
    }

    /// Names of the alternatives, for "did you mean" messages
    pub fn suggestion_names(&self) -> Vec<String> {
        self.alternatives
            .iter()
            .map(|c| c.record.name.clone())
            .collect()
    }

    pub fn has_duplicates(&self) -> bool {
        self.duplicates.len() > 1
    }

    pub fn summary(&self) -> String {
        match &self.record {
            Some(record) => format!(
                "'{}' → '{}' (#{}, {}, {:.0}% confidence)",
                self.query,
                record.name,
                record.id,
                self.match_type.as_str(),
                self.confidence * 100.0
            ),
            None => format!("'{}' → not found", self.query),
        }
    }
}

// ============================================================================
// VEHICLE RESOLVER
// ============================================================================

pub struct VehicleResolver<'a, R: VehicleRegistry + ?Sized> {
    registry: &'a R,
    config: MatchingConfig,
}

impl<'a, R: VehicleRegistry + ?Sized> VehicleResolver<'a, R> {
    /// Resolver with default thresholds
    pub fn new(registry: &'a R) -> Self {
        Self::with_config(registry, MatchingConfig::default())
    }

    pub fn with_config(registry: &'a R, config: MatchingConfig) -> Self {
        VehicleResolver { registry, config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Resolve a raw vehicle name against the registry
    pub fn resolve(&self, raw_name: &str) -> Result<MatchResult> {
        let query = raw_name.trim();
        if query.is_empty() {
            return Ok(MatchResult::not_found(query, Vec::new()));
        }

        // Stage 1: Exact
        if let Some(record) = self.registry.find_by_exact_name(query)?.into_iter().next() {
            debug!(query, id = record.id, "exact match");
            let result = MatchResult::found(query, record, MatchType::Exact, 1.0);
            return self.attach_duplicates(result);
        }

        // Stage 2: Case-insensitive
        if let Some(record) = self
            .registry
            .find_by_case_insensitive_name(query)?
            .into_iter()
            .next()
        {
            debug!(query, id = record.id, "case-insensitive match");
            let result = MatchResult::found(
                query,
                record,
                MatchType::CaseInsensitive,
                CASE_INSENSITIVE_CONFIDENCE,
            );
            return self.attach_duplicates(result);
        }

        let vehicles = self.registry.get_all()?;

        // Stage 3: Fuzzy
        let mut fuzzy = self.fuzzy_candidates(query, &vehicles);
        if !fuzzy.is_empty() {
            let best = fuzzy.remove(0);
            debug!(query, id = best.record.id, score = best.score, "fuzzy match");

            let mut result =
                MatchResult::found(query, best.record, MatchType::Fuzzy, best.score);
            fuzzy.truncate(self.max_alternatives());
            result.alternatives = fuzzy;
            return Ok(self.with_duplicates(result, &vehicles));
        }

        // Stage 4: Keyword (suggestions only)
        let mut keywords = self.keyword_candidates(query, &vehicles);
        keywords.truncate(self.max_alternatives());
        debug!(query, suggestions = keywords.len(), "no match");

        Ok(MatchResult::not_found(query, keywords))
    }

    /// Independent search: fuzzy and keyword hits both count as results
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let vehicles = self.registry.get_all()?;
        let mut hits = self.fuzzy_candidates(query, &vehicles);

        for candidate in self.keyword_candidates(query, &vehicles) {
            if !hits.iter().any(|h| h.record.id == candidate.record.id) {
                hits.push(candidate);
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    /// Registry rows at or above the fuzzy threshold, best first (stable)
    fn fuzzy_candidates(&self, query: &str, vehicles: &[VehicleRecord]) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = vehicles
            .iter()
            .map(|v| Candidate {
                score: similarity(query, &v.name),
                record: v.clone(),
                match_type: MatchType::Fuzzy,
            })
            .filter(|c| c.score >= self.config.fuzzy_threshold)
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }

    /// Registry rows sharing keywords with the query, best first (stable)
    fn keyword_candidates(&self, query: &str, vehicles: &[VehicleRecord]) -> Vec<Candidate> {
        let query_tokens = keyword_tokens(query, &self.config.stop_words);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<Candidate> = vehicles
            .iter()
            .filter_map(|v| {
                let tokens = keyword_tokens(&v.name, &self.config.stop_words);
                let shared = query_tokens.iter().filter(|t| tokens.contains(t)).count();
                if shared == 0 {
                    return None;
                }

                let score = shared as f64 / query_tokens.len().max(tokens.len()) as f64;
                Some(Candidate {
                    record: v.clone(),
                    score,
                    match_type: MatchType::Keyword,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }

    fn max_alternatives(&self) -> usize {
        self.config.max_alternatives.min(MAX_ALTERNATIVES)
    }

    fn attach_duplicates(&self, result: MatchResult) -> Result<MatchResult> {
        let vehicles = self.registry.get_all()?;
        Ok(self.with_duplicates(result, &vehicles))
    }

    fn with_duplicates(&self, mut result: MatchResult, vehicles: &[VehicleRecord]) -> MatchResult {
        if let Some(record) = &result.record {
            let key = normalize_name(&record.name);
            let duplicates: Vec<VehicleRecord> = vehicles
                .iter()
                .filter(|v| normalize_name(&v.name) == key)
                .cloned()
                .collect();

            if duplicates.len() > 1 {
                debug!(query = %result.query, count = duplicates.len(), "duplicate registry rows");
                result.duplicates = duplicates;
            }
        }
        result
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use crate::status::CanonicalStatus;
    use std::cell::Cell;

    fn garage() -> InMemoryRegistry {
        InMemoryRegistry::from_vehicles(&[
            ("BMW 4-Series", CanonicalStatus::Good),
            ("Audi RS6", CanonicalStatus::Average),
            ("Mercedes G63AMG", CanonicalStatus::Good),
            ("Porsche 911 Turbo", CanonicalStatus::Poor),
            ("Porsche Cayenne", CanonicalStatus::Average),
        ])
    }

    #[test]
    fn test_exact_match() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("  Audi RS6 ").unwrap();

        assert!(result.found);
        assert_eq!(result.match_type, MatchType::Exact);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.record.unwrap().id, 2);
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_case_insensitive_match() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("bmw 4-series").unwrap();

        assert!(result.found);
        assert_eq!(result.match_type, MatchType::CaseInsensitive);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.record.unwrap().name, "BMW 4-Series");
    }

    #[test]
    fn test_fuzzy_match() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("Mercedes G63").unwrap();

        assert!(result.found);
        assert_eq!(result.match_type, MatchType::Fuzzy);
        assert!(result.confidence > 0.7);
        assert!((result.confidence - similarity("Mercedes G63", "Mercedes G63AMG")).abs() < 1e-9);
        assert_eq!(result.record.unwrap().name, "Mercedes G63AMG");
    }

    #[test]
    fn test_fuzzy_alternatives_and_stable_ties() {
        let registry = InMemoryRegistry::from_vehicles(&[
            ("Lada Vesta", CanonicalStatus::Good),
            ("Lada Vesti", CanonicalStatus::Good),
            ("Lada Vesto", CanonicalStatus::Good),
            ("Lada Vestu", CanonicalStatus::Good),
            ("Lada Vesty", CanonicalStatus::Good),
        ]);
        let resolver = VehicleResolver::new(&registry);

        // All five are one edit away: registry order breaks the tie
        let result = resolver.resolve("Lada Vestx").unwrap();

        assert!(result.found);
        assert_eq!(result.record.as_ref().unwrap().name, "Lada Vesta");
        let alternatives = result.suggestion_names();
        assert_eq!(alternatives, vec!["Lada Vesti", "Lada Vesto", "Lada Vestu"]);
    }

    #[test]
    fn test_fuzzy_threshold_is_configurable() {
        let registry = garage();
        let config = MatchingConfig {
            fuzzy_threshold: 0.9,
            ..MatchingConfig::default()
        };
        let resolver = VehicleResolver::with_config(&registry, config);

        let result = resolver.resolve("Mercedes G63").unwrap();
        assert!(!result.found);
    }

    #[test]
    fn test_keyword_fallback_only_suggests() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("Porsche Panamera").unwrap();

        assert!(!result.found);
        assert_eq!(result.match_type, MatchType::None);
        assert!(result.record.is_none());
        assert_eq!(result.alternatives.len(), 2);
        assert!(result
            .alternatives
            .iter()
            .all(|c| c.match_type == MatchType::Keyword));
        // "porsche cayenne" shares 1 of 2 tokens, "porsche 911 turbo" 1 of 3
        assert_eq!(result.alternatives[0].record.name, "Porsche Cayenne");
        assert!((result.alternatives[0].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_similar_entries() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("Toyota Supra").unwrap();

        assert!(!result.found);
        assert!(result.alternatives.len() <= 3);
        assert_eq!(result.summary(), "'Toyota Supra' → not found");
    }

    #[test]
    fn test_empty_query() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("   ").unwrap();
        assert!(!result.found);
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_duplicates_are_surfaced() {
        let registry = InMemoryRegistry::from_vehicles(&[
            ("BMW 4-Series", CanonicalStatus::Good),
            ("Audi RS6", CanonicalStatus::Average),
            ("bmw 4-series", CanonicalStatus::Poor),
        ]);
        let resolver = VehicleResolver::new(&registry);

        let result = resolver.resolve("BMW 4-Series").unwrap();

        assert_eq!(result.match_type, MatchType::Exact);
        assert!(result.has_duplicates());
        assert_eq!(
            result.duplicates.iter().map(|v| v.id).collect::<Vec<_>>(),
            vec![1, 3]
        );

        let unique = resolver.resolve("Audi RS6").unwrap();
        assert!(unique.duplicates.is_empty());
    }

    #[test]
    fn test_search_treats_keyword_hits_as_results() {
        let registry = garage();
        let resolver = VehicleResolver::new(&registry);

        let hits = resolver.search("porsche", 5).unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.record.name.starts_with("Porsche")));
        assert!(resolver.search("", 5).unwrap().is_empty());
    }

    #[test]
    fn test_alternatives_never_exceed_three() {
        let registry = InMemoryRegistry::from_vehicles(&[
            ("Lada Vesta", CanonicalStatus::Good),
            ("Lada Vesti", CanonicalStatus::Good),
            ("Lada Vesto", CanonicalStatus::Good),
            ("Lada Vestu", CanonicalStatus::Good),
            ("Lada Vesty", CanonicalStatus::Good),
            ("Lada Vestr", CanonicalStatus::Good),
            ("Lada Vests", CanonicalStatus::Good),
            ("Lada Vestq", CanonicalStatus::Good),
        ]);
        let config = MatchingConfig {
            max_alternatives: 10,
            ..MatchingConfig::default()
        };
        let resolver = VehicleResolver::with_config(&registry, config);

        let fuzzy = resolver.resolve("Lada Vestx").unwrap();
        assert!(fuzzy.found);
        assert_eq!(fuzzy.alternatives.len(), MAX_ALTERNATIVES);

        let keyword = resolver.resolve("Lada Granta").unwrap();
        assert!(!keyword.found);
        assert_eq!(keyword.alternatives.len(), MAX_ALTERNATIVES);
    }

    /// Registry that counts name lookups
    struct CountingRegistry {
        inner: InMemoryRegistry,
        exact_lookups: Cell<usize>,
        case_insensitive_lookups: Cell<usize>,
    }

    impl VehicleRegistry for CountingRegistry {
        fn get_all(&self) -> Result<Vec<VehicleRecord>> {
            self.inner.get_all()
        }

        fn find_by_exact_name(&self, name: &str) -> Result<Vec<VehicleRecord>> {
            self.exact_lookups.set(self.exact_lookups.get() + 1);
            self.inner.find_by_exact_name(name)
        }

        fn find_by_case_insensitive_name(&self, name: &str) -> Result<Vec<VehicleRecord>> {
            self.case_insensitive_lookups
                .set(self.case_insensitive_lookups.get() + 1);
            self.inner.find_by_case_insensitive_name(name)
        }

        fn update_status(&self, id: i64, status: CanonicalStatus) -> Result<VehicleRecord> {
            self.inner.update_status(id, status)
        }
    }

    #[test]
    fn test_name_stages_use_registry_lookups() {
        let registry = CountingRegistry {
            inner: garage(),
            exact_lookups: Cell::new(0),
            case_insensitive_lookups: Cell::new(0),
        };
        let resolver = VehicleResolver::new(&registry);

        let exact = resolver.resolve("Audi RS6").unwrap();
        assert_eq!(exact.match_type, MatchType::Exact);
        assert_eq!(registry.exact_lookups.get(), 1);
        assert_eq!(registry.case_insensitive_lookups.get(), 0);

        let ci = resolver.resolve("audi rs6").unwrap();
        assert_eq!(ci.match_type, MatchType::CaseInsensitive);
        assert_eq!(registry.exact_lookups.get(), 2);
        assert_eq!(registry.case_insensitive_lookups.get(), 1);
    }
}

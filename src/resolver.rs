// src/resolver.rs
use crate::config::{
    BriefConfig, DEFAULT_MAX_QUERY_CHARS, DEFAULT_PRIMARY_THRESHOLD, DEFAULT_REFERENCE_THRESHOLD,
};
use crate::similarity::{Similarity, WeightedRatio};
use crate::symbols::TickerTable;
use log::debug;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "ticker", rename_all = "snake_case")]
pub enum ResolvedTicker {
    Ticker(String),
    Unresolved,
}

impl ResolvedTicker {
    pub fn ticker(&self) -> Option<&str> {
        match self {
            ResolvedTicker::Ticker(t) => Some(t),
            ResolvedTicker::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedTicker::Ticker(_))
    }
}

/// Minimum scores a match has to strictly exceed, per tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub primary: f64,
    pub reference: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_THRESHOLD,
            reference: DEFAULT_REFERENCE_THRESHOLD,
        }
    }
}

impl From<&BriefConfig> for Thresholds {
    fn from(config: &BriefConfig) -> Self {
        config.thresholds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Primary,
    Reference,
}

/// A match that cleared its tier's cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerMatch {
    pub name: String,
    pub ticker: String,
    pub score: f64,
    pub tier: Tier,
}

#[derive(Clone)]
pub struct TickerResolver {
    primary: Arc<TickerTable>,
    reference: Arc<TickerTable>,
    thresholds: Thresholds,
    similarity: Arc<dyn Similarity>,
    max_query_chars: usize,
}

impl TickerResolver {
    pub fn new(primary: TickerTable, reference: TickerTable) -> Self {
        Self {
            primary: Arc::new(primary),
            reference: Arc::new(reference),
            thresholds: Thresholds::default(),
            similarity: Arc::new(WeightedRatio),
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_similarity<S: Similarity + 'static>(mut self, similarity: S) -> Self {
        self.similarity = Arc::new(similarity);
        self
    }

    /// Characters past this limit are ignored when scoring.
    pub fn with_max_query_chars(mut self, max_query_chars: usize) -> Self {
        self.max_query_chars = max_query_chars.max(1);
        self
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn resolve(&self, query: &str) -> ResolvedTicker {
        match self.find_match(query) {
            Some(m) => ResolvedTicker::Ticker(m.ticker),
            None => ResolvedTicker::Unresolved,
        }
    }

    /// Same as [`resolve`](Self::resolve) but keeps the matched name, score and tier.
    pub fn find_match(&self, query: &str) -> Option<TickerMatch> {
        let query: String = query
            .chars()
            .take(self.max_query_chars)
            .collect::<String>()
            .to_lowercase();

        let tiers = [
            (Tier::Primary, &self.primary, self.thresholds.primary),
            (Tier::Reference, &self.reference, self.thresholds.reference),
        ];

        for (tier, table, cutoff) in tiers {
            if let Some((name, ticker, score)) = self.best_match(&query, table) {
                if score > cutoff {
                    debug!(
                        "Matched '{}' → '{}' → '{}' ({:?}, score: {:.1})",
                        query, name, ticker, tier, score
                    );
                    return Some(TickerMatch {
                        name: name.to_string(),
                        ticker: ticker.to_string(),
                        score,
                        tier,
                    });
                }
                debug!(
                    "Best {:?} candidate '{}' scored {:.1}, not above {}",
                    tier, name, score, cutoff
                );
            }
        }

        None
    }

    fn best_match<'t>(&self, query: &str, table: &'t TickerTable) -> Option<(&'t str, &'t str, f64)> {
        let mut best: Option<(&str, &str, f64)> = None;
        for (name, ticker) in table.iter() {
            let score = self.similarity.score(query, name);
            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((name, ticker, score));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::primary_table;

    /// Scores 100 for equal strings, 80 when one contains the other, else 0.
    struct ContainsStub;

    impl Similarity for ContainsStub {
        fn score(&self, a: &str, b: &str) -> f64 {
            if a == b {
                100.0
            } else if a.contains(b) || b.contains(a) {
                80.0
            } else {
                0.0
            }
        }
    }

    fn reference() -> TickerTable {
        [
            ("apple hospitality reit", "APLE"),
            ("nvidia corporation", "NVDA"),
            ("ford motor company", "F"),
            ("intel corporation", "INTC"),
        ]
        .into_iter()
        .collect()
    }

    fn resolver() -> TickerResolver {
        TickerResolver::new(primary_table(), reference())
    }

    #[test]
    fn exact_primary_names_resolve() {
        let r = resolver();
        for (name, ticker) in primary_table().iter() {
            assert_eq!(r.resolve(name), ResolvedTicker::Ticker(ticker.to_string()));
        }
        assert_eq!(r.resolve("Apple"), ResolvedTicker::Ticker("AAPL".into()));
    }

    #[test]
    fn typo_resolves_through_primary_tier() {
        let m = resolver().find_match("aple").unwrap();
        assert_eq!(m.ticker, "AAPL");
        assert_eq!(m.tier, Tier::Primary);
    }

    #[test]
    fn spoken_sentence_resolves() {
        assert_eq!(
            resolver().resolve("How's Tesla doing today?"),
            ResolvedTicker::Ticker("TSLA".into())
        );
    }

    #[test]
    fn falls_back_to_reference_table() {
        let m = resolver().find_match("nvidia corporation").unwrap();
        assert_eq!(m.ticker, "NVDA");
        assert_eq!(m.tier, Tier::Reference);
    }

    #[test]
    fn nonsense_is_unresolved() {
        let r = resolver();
        for q in ["", "   ", "?!#", "12345", "qzxv wpfk"] {
            assert_eq!(r.resolve(q), ResolvedTicker::Unresolved, "query {:?}", q);
        }
    }

    #[test]
    fn primary_tier_takes_precedence() {
        // "apple" is an exact primary hit and a contained reference hit.
        let r = resolver().with_similarity(ContainsStub);
        assert_eq!(r.resolve("apple"), ResolvedTicker::Ticker("AAPL".into()));
    }

    #[test]
    fn thresholds_are_strict() {
        let r = resolver().with_similarity(ContainsStub);
        // 80 does not clear 85 on the primary tier, but clears 70 on reference.
        let m = r.find_match("intel").unwrap();
        assert_eq!(m.tier, Tier::Reference);
        assert_eq!(m.ticker, "INTC");

        let strict = resolver()
            .with_similarity(ContainsStub)
            .with_thresholds(Thresholds { primary: 85.0, reference: 80.0 });
        assert_eq!(strict.resolve("intel"), ResolvedTicker::Unresolved);
    }

    #[test]
    fn ties_go_to_first_inserted_name() {
        let table: TickerTable = [("beta", "B"), ("alpha", "A")].into_iter().collect();
        let r = TickerResolver::new(table, TickerTable::new()).with_similarity(ContainsStub);
        // both names are contained in the query and score 80
        let r = r.with_thresholds(Thresholds { primary: 70.0, reference: 70.0 });
        assert_eq!(r.resolve("alpha beta"), ResolvedTicker::Ticker("B".into()));
    }

    #[test]
    fn equal_primary_scores_follow_table_order() {
        // "apple" and "amazon" both score 90 inside this sentence
        let r = resolver();
        let m = r.find_match("apple or amazon stock").unwrap();
        assert_eq!(m.ticker, "AAPL");
        assert!((m.score - 90.0).abs() < 1e-9, "got {}", m.score);
        assert_eq!(
            r.resolve("amazon or apple stock"),
            ResolvedTicker::Ticker("AAPL".into())
        );
    }

    /// Records the longest query it was asked to score.
    #[derive(Default)]
    struct LengthRecorder {
        longest: std::sync::Mutex<usize>,
    }

    impl Similarity for Arc<LengthRecorder> {
        fn score(&self, a: &str, _b: &str) -> f64 {
            let mut longest = self.longest.lock().unwrap();
            *longest = (*longest).max(a.chars().count());
            0.0
        }
    }

    #[test]
    fn long_queries_are_cut_before_scoring() {
        let recorder = Arc::new(LengthRecorder::default());
        let r = resolver()
            .with_max_query_chars(16)
            .with_similarity(recorder.clone());
        assert_eq!(r.resolve(&"é".repeat(10_000)), ResolvedTicker::Unresolved);
        assert_eq!(*recorder.longest.lock().unwrap(), 16);
    }

    #[test]
    fn only_the_leading_characters_are_matched() {
        let r = resolver()
            .with_similarity(ContainsStub)
            .with_thresholds(Thresholds { primary: 70.0, reference: 70.0 })
            .with_max_query_chars(40);
        let padding = "please ".repeat(1_000);
        assert_eq!(
            r.resolve(&format!("tesla {}", padding)),
            ResolvedTicker::Ticker("TSLA".into())
        );
        assert_eq!(r.resolve(&format!("{}tesla", padding)), ResolvedTicker::Unresolved);
    }

    #[test]
    fn huge_query_resolves_quickly() {
        let query = "zq ".repeat(300_000);
        let started = std::time::Instant::now();
        assert_eq!(resolver().resolve(&query), ResolvedTicker::Unresolved);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn empty_tables_never_match() {
        let r = TickerResolver::new(TickerTable::new(), TickerTable::new());
        assert_eq!(r.resolve("apple"), ResolvedTicker::Unresolved);
    }

    #[test]
    fn resolution_is_idempotent() {
        let r = resolver();
        for q in ["aple", "ford motor", "what about intel", "xyz"] {
            assert_eq!(r.resolve(q), r.resolve(q));
        }
    }

    #[test]
    fn result_ticker_comes_from_a_table() {
        let r = resolver();
        let primary = primary_table();
        let reference = reference();
        for q in ["apple", "nvidia", "ford", "intel corp", "amazon prime"] {
            if let ResolvedTicker::Ticker(t) = r.resolve(q) {
                assert!(
                    primary.iter().any(|(_, v)| v == t) || reference.iter().any(|(_, v)| v == t),
                    "{} not in tables",
                    t
                );
            }
        }
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_value(ResolvedTicker::Ticker("AAPL".into())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ticker", "ticker": "AAPL"}));
        let json = serde_json::to_value(ResolvedTicker::Unresolved).unwrap();
        assert_eq!(json, serde_json::json!({"status": "unresolved"}));
    }
}

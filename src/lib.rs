// src/lib.rs
pub mod brief;
pub mod config;
pub mod error;
pub mod llm;
pub mod market_data;
pub mod resolver;
pub mod server;
pub mod similarity;
pub mod symbols;

// Optional re-exports
pub use brief::{BriefGenerator, BriefOutcome};
pub use config::BriefConfig;
pub use error::BriefError;
pub use market_data::{QuoteProvider, QuoteSnapshot};
pub use llm::LanguageModel;
pub use resolver::{ResolvedTicker, Thresholds, TickerResolver};
pub use server::AppState;
pub use similarity::{Similarity, WeightedRatio};
pub use symbols::TickerTable;

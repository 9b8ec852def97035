// src/config.rs
use crate::error::{BriefError, Result};
use crate::resolver::Thresholds;
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "mistralai/devstral-small:free";
pub const DEFAULT_QUOTE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
pub const DEFAULT_TICKERS_CSV: &str = "data/tickers.csv";
pub const DEFAULT_PRIMARY_THRESHOLD: f64 = 85.0;
pub const DEFAULT_REFERENCE_THRESHOLD: f64 = 70.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_CHARS: usize = 280;
pub const DEFAULT_MAX_QUERY_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct BriefConfig {
    pub llm_api_key: String,
    pub llm_url: String,
    pub llm_model: String,
    pub quote_url: String,
    pub tickers_csv: PathBuf,
    pub thresholds: Thresholds,
    pub timeout: Duration,
    pub max_chars: usize,
    pub max_query_chars: usize,
}

impl BriefConfig {
    /// Builds a config with every optional setting at its default.
    pub fn new(llm_api_key: String) -> Result<Self> {
        if llm_api_key.trim().is_empty() {
            return Err(BriefError::Config("OPENROUTER_API_KEY is empty".into()));
        }
        Ok(Self {
            llm_api_key,
            llm_url: DEFAULT_LLM_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            tickers_csv: PathBuf::from(DEFAULT_TICKERS_CSV),
            thresholds: Thresholds::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_chars: DEFAULT_MAX_CHARS,
            max_query_chars: DEFAULT_MAX_QUERY_CHARS,
        })
    }

    /// Reads the process environment. A missing credential is fatal here so
    /// that it never surfaces as a per-query failure.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENROUTER_API_KEY")
            .ok_or_else(|| BriefError::Config("Missing OPENROUTER_API_KEY".into()))?;
        let mut config = Self::new(api_key)?;

        if let Some(url) = lookup("OPENROUTER_API_URL") {
            config.llm_url = url;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Some(url) = lookup("QUOTE_API_URL") {
            config.quote_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("TICKERS_CSV") {
            config.tickers_csv = PathBuf::from(path);
        }

        config.thresholds = Thresholds::from_lookup(&lookup)?;
        config.timeout = Duration::from_secs(parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_TIMEOUT_SECS,
        ));
        config.max_chars = parse_or(&lookup, "BRIEF_MAX_CHARS", DEFAULT_MAX_CHARS);
        config.max_query_chars = parse_or(&lookup, "MAX_QUERY_CHARS", DEFAULT_MAX_QUERY_CHARS);

        config.validate()?;

        info!(
            "Config loaded (model: {}, thresholds: {}/{}, timeout: {}s, csv: {})",
            config.llm_model,
            config.thresholds.primary,
            config.thresholds.reference,
            config.timeout.as_secs(),
            config.tickers_csv.display()
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("OPENROUTER_API_URL", &self.llm_url),
            ("QUOTE_API_URL", &self.quote_url),
        ] {
            Url::parse(value)
                .map_err(|e| BriefError::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        self.thresholds.validate()?;

        if self.max_chars == 0 {
            return Err(BriefError::Config("BRIEF_MAX_CHARS must be positive".into()));
        }
        if self.max_query_chars == 0 {
            return Err(BriefError::Config("MAX_QUERY_CHARS must be positive".into()));
        }

        Ok(())
    }
}

impl Thresholds {
    /// Reads `PRIMARY_MATCH_THRESHOLD` and `REFERENCE_MATCH_THRESHOLD`. Used on
    /// its own by callers that need no credential.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let thresholds = Self {
            primary: parse_or(lookup, "PRIMARY_MATCH_THRESHOLD", DEFAULT_PRIMARY_THRESHOLD),
            reference: parse_or(
                lookup,
                "REFERENCE_MATCH_THRESHOLD",
                DEFAULT_REFERENCE_THRESHOLD,
            ),
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("PRIMARY_MATCH_THRESHOLD", self.primary),
            ("REFERENCE_MATCH_THRESHOLD", self.reference),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(BriefError::Config(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}

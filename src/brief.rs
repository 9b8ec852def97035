// src/brief.rs

use crate::config::{BriefConfig, DEFAULT_MAX_CHARS};
use crate::error::Result;
use crate::llm::{LanguageModel, OpenRouterClient};
use crate::market_data::{QuoteProvider, QuoteSnapshot, YahooQuoteProvider};
use crate::resolver::{ResolvedTicker, Thresholds, TickerResolver};
use crate::symbols::{load_reference_table_from_path, primary_table};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

pub const UNRESOLVED_MESSAGE: &str = "Could not find a relevant stock ticker from your query.";

static HEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").expect("heading pattern is valid"));

pub fn quote_unavailable_message(ticker: &str) -> String {
    format!("Couldn't retrieve real-time stock data for `{}`.", ticker)
}

pub fn generation_error_message(reason: &str) -> String {
    format!("LLM Error: {}", reason)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BriefOutcome {
    Unresolved,
    QuoteUnavailable {
        ticker: String,
    },
    GenerationFailed {
        ticker: String,
        quote: QuoteSnapshot,
        reason: String,
    },
    Generated {
        ticker: String,
        quote: QuoteSnapshot,
        text: String,
    },
}

impl BriefOutcome {
    pub fn ticker(&self) -> Option<&str> {
        match self {
            BriefOutcome::Unresolved => None,
            BriefOutcome::QuoteUnavailable { ticker }
            | BriefOutcome::GenerationFailed { ticker, .. }
            | BriefOutcome::Generated { ticker, .. } => Some(ticker),
        }
    }

    /// The user-facing text, trimmed and cut to `max_chars` characters.
    pub fn message(&self, max_chars: usize) -> String {
        let full = match self {
            BriefOutcome::Unresolved => UNRESOLVED_MESSAGE.to_string(),
            BriefOutcome::QuoteUnavailable { ticker } => quote_unavailable_message(ticker),
            BriefOutcome::GenerationFailed { reason, .. } => generation_error_message(reason),
            BriefOutcome::Generated { text, .. } => text.clone(),
        };
        truncate_chars(full.trim(), max_chars).to_string()
    }
}

/// Cuts on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Strips markdown heading markers so a speech engine does not read them out.
pub fn clean_for_speech(text: &str) -> String {
    HEADING_MARKER.replace_all(text, "").trim().to_string()
}

pub fn build_prompt(quote: &QuoteSnapshot) -> String {
    let ticker = &quote.ticker;
    format!(
        "You are a professional financial assistant analyzing the stock '{ticker}'.\n\n\
         Here is the most recent real-time market data:\n\
         - Ticker Symbol: {ticker}\n\
         - Current Price: ${current:.2}\n\
         - Previous Close Price: ${previous:.2}\n\n\
         Using this data, provide a clear and insightful market brief covering the following points:\n\
         1. **Price Movement**: Describe how the price has changed since the previous close. Mention any noticeable short-term trend or volatility.\n\
         2. **Investor Sentiment**: Indicate if the sentiment appears bullish, bearish, or neutral, and explain why.\n\
         3. **Risk Assessment**: Highlight any potential short-term risks, macroeconomic pressures, or concerns investors should be aware of.\n\
         4. **Outlook**: Offer both short-term (1-2 weeks) and long-term (3-6 months) expectations, including key factors or events to watch.\n\
         5. **Investment Recommendation**: Based on the above, suggest whether a general investor should **Buy**, **Hold**, or **Sell** this stock right now. Justify your recommendation briefly, assuming a moderate risk tolerance.\n\n\
         Be specific, avoid financial jargon, and write in a professional yet beginner-friendly tone. Avoid generic or vague statements.",
        ticker = ticker,
        current = quote.current,
        previous = quote.previous_close,
    )
}

#[derive(Clone)]
pub struct BriefGenerator {
    resolver: TickerResolver,
    quotes: Arc<dyn QuoteProvider>,
    llm: Arc<dyn LanguageModel>,
    max_chars: usize,
}

impl BriefGenerator {
    pub fn new(
        resolver: TickerResolver,
        quotes: Arc<dyn QuoteProvider>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            resolver,
            quotes,
            llm,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Startup wiring: loads both ticker tables and builds the HTTP collaborators.
    pub fn from_config(config: &BriefConfig) -> Result<Self> {
        let reference = load_reference_table_from_path(&config.tickers_csv)?;
        let resolver = TickerResolver::new(primary_table(), reference)
            .with_thresholds(Thresholds::from(config))
            .with_max_query_chars(config.max_query_chars);
        let quotes = Arc::new(YahooQuoteProvider::new(config)?);
        let llm = Arc::new(OpenRouterClient::new(config)?);
        Ok(Self::new(resolver, quotes, llm).with_max_chars(config.max_chars))
    }

    pub fn resolver(&self) -> &TickerResolver {
        &self.resolver
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub async fn generate(&self, query: &str) -> BriefOutcome {
        let ticker = match self.resolver.resolve(query) {
            ResolvedTicker::Ticker(ticker) => ticker,
            ResolvedTicker::Unresolved => {
                info!("No ticker found for query {:?}", query);
                return BriefOutcome::Unresolved;
            }
        };

        let quote = match self.quotes.fetch_quote(&ticker).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Quote unavailable for {}: {}", ticker, e);
                return BriefOutcome::QuoteUnavailable { ticker };
            }
        };

        let prompt = build_prompt(&quote);
        match self.llm.complete(&prompt).await {
            Ok(text) => {
                let text = truncate_chars(text.trim(), self.max_chars).to_string();
                info!("Brief generated for {} ({} chars)", ticker, text.chars().count());
                BriefOutcome::Generated {
                    ticker,
                    quote,
                    text,
                }
            }
            Err(e) => {
                warn!("Brief generation failed for {}: {}", ticker, e);
                BriefOutcome::GenerationFailed {
                    ticker,
                    quote,
                    reason: e.to_string(),
                }
            }
        }
    }

    pub async fn build_brief(&self, query: &str) -> String {
        self.generate(query).await.message(self.max_chars)
    }
}

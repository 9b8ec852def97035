// src/symbols/stock_symbol.rs

use indexmap::IndexMap;

/// Immutable company-name → ticker mapping.
///
/// Keys are always stored lowercased and trimmed. Names keep the position of
/// their first insertion; inserting a name that is already present replaces
/// the ticker in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerTable {
    entries: IndexMap<String, String>,
}

impl TickerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Iterates names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: &str, ticker: &str) {
        self.entries
            .insert(name.trim().to_lowercase(), ticker.trim().to_string());
    }
}

impl<N, T> FromIterator<(N, T)> for TickerTable
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        let mut table = TickerTable::new();
        for (name, ticker) in iter {
            table.insert(name.as_ref(), ticker.as_ref());
        }
        table
    }
}

/// Well-known company names mapped to their primary listing symbols.
const KNOWN_NAME_TO_SYMBOL: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("amazon", "AMZN"),
    ("google", "GOOGL"),
    ("meta", "META"),
    ("tesla", "TSLA"),
];

/// The curated table checked before the reference dataset.
pub fn primary_table() -> TickerTable {
    KNOWN_NAME_TO_SYMBOL.iter().copied().collect()
}

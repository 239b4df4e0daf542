//! Domain primitives: TimeMs, Symbol.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, negative if `earlier` is later.
    pub fn millis_since(&self, earlier: TimeMs) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Asset symbol (e.g., "BTC", "ETH"), always trimmed and upper-cased.
///
/// Lookups are case-insensitive because every key goes through [`Symbol::parse`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize a raw symbol. Returns `None` when nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Symbol(normalized))
        }
    }

    /// Get the symbol as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize and deduplicate symbols, dropping blanks, keeping first-seen order.
pub fn normalize_symbols<I, S>(symbols: I) -> Vec<Symbol>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    symbols
        .into_iter()
        .filter_map(|s| Symbol::parse(s.as_ref()))
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        assert_eq!(Symbol::parse(" btc ").unwrap().as_str(), "BTC");
        assert_eq!(Symbol::parse("Eth"), Symbol::parse("ETH"));
        assert_eq!(Symbol::parse("   "), None);
        assert_eq!(Symbol::parse(""), None);
    }

    #[test]
    fn test_normalize_symbols_dedupes() {
        let symbols = normalize_symbols(["btc", "ETH", " BTC", "", "eth", "sol"]);
        let names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn test_symbol_serializes_as_string() {
        let json = serde_json::to_string(&Symbol::parse("btc").unwrap()).unwrap();
        assert_eq!(json, "\"BTC\"");
    }

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
        assert_eq!(t2.millis_since(t1), 1000);
        assert_eq!(t1.millis_since(t2), -1000);
    }
}

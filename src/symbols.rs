use crate::models::AssetQuote;
use std::collections::BTreeSet;
use std::fmt;

/// Uppercase symbols to forward. Empty means no filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSymbols {
    symbols: BTreeSet<String>,
}

impl TargetSymbols {
    /// Build a target set from raw tokens.
    /// Each token may be a single symbol or a comma-separated list.
    pub fn normalize<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = tokens
            .into_iter()
            .flat_map(|token| {
                token
                    .as_ref()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_uppercase)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { symbols }
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Keep only quotes whose symbol is targeted, preserving input order.
    /// An empty target set passes every quote through.
    pub fn filter(&self, quotes: &[AssetQuote]) -> FilterOutcome {
        if self.is_empty() {
            return FilterOutcome {
                quotes: quotes.to_vec(),
                found: BTreeSet::new(),
                missing: BTreeSet::new(),
            };
        }

        let mut retained = Vec::new();
        let mut found = BTreeSet::new();

        for quote in quotes {
            let symbol = quote.symbol.trim().to_uppercase();
            if self.symbols.contains(&symbol) {
                retained.push(quote.clone());
                found.insert(symbol);
            }
        }

        let missing = self.symbols.difference(&found).cloned().collect();

        FilterOutcome {
            quotes: retained,
            found,
            missing,
        }
    }
}

impl fmt::Display for TargetSymbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join(&self.symbols))
    }
}

/// Result of filtering one snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub quotes: Vec<AssetQuote>,
    /// Requested symbols present in the snapshot
    pub found: BTreeSet<String>,
    /// Requested symbols absent from the snapshot
    pub missing: BTreeSet<String>,
}

pub fn join(symbols: &BTreeSet<String>) -> String {
    symbols.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(symbol: &str, price: f64) -> AssetQuote {
        AssetQuote {
            id: symbol.to_lowercase(),
            symbol: symbol.to_string(),
            name: symbol.to_uppercase(),
            price,
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_comma_list_and_discrete_tokens_normalize_alike() {
        let from_list = TargetSymbols::normalize(["btc, eth"]);
        let from_tokens = TargetSymbols::normalize(["BTC", "ETH"]);

        assert_eq!(from_list, from_tokens);
        assert_eq!(from_list.to_string(), "BTC, ETH");
    }

    #[test]
    fn test_normalize_merges_and_dedupes() {
        let targets = TargetSymbols::normalize(["sol", " btc ,,", "", "BTC,Ada"]);

        assert_eq!(targets.to_string(), "ADA, BTC, SOL");
        assert!(TargetSymbols::normalize([" , ", ""]).is_empty());
    }

    #[test]
    fn test_filter_reports_found_and_missing() {
        let quotes = vec![quote("btc", 65000.0), quote("eth", 3000.0), quote("sol", 150.0)];
        let targets = TargetSymbols::normalize(["BTC", "ADA"]);

        let outcome = targets.filter(&quotes);

        assert_eq!(outcome.quotes, vec![quote("btc", 65000.0)]);
        assert_eq!(outcome.found, set(&["BTC"]));
        assert_eq!(outcome.missing, set(&["ADA"]));
        // input untouched
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].symbol, "btc");
    }

    #[test]
    fn test_filter_preserves_input_order() {
        let quotes = vec![quote("sol", 150.0), quote("btc", 65000.0), quote("eth", 3000.0)];
        let targets = TargetSymbols::normalize(["eth,sol"]);

        let symbols: Vec<_> = targets
            .filter(&quotes)
            .quotes
            .into_iter()
            .map(|q| q.symbol)
            .collect();

        assert_eq!(symbols, vec!["sol", "eth"]);
    }

    #[test]
    fn test_empty_targets_pass_through() {
        let quotes = vec![quote("eth", 3000.0), quote("btc", 65000.0)];
        let outcome = TargetSymbols::default().filter(&quotes);

        assert_eq!(outcome.quotes, quotes);
        assert!(outcome.found.is_empty());
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn test_no_matches_yields_empty_result() {
        let quotes = vec![quote("btc", 65000.0)];
        let outcome = TargetSymbols::normalize(["doge"]).filter(&quotes);

        assert!(outcome.quotes.is_empty());
        assert_eq!(outcome.missing, set(&["DOGE"]));
    }
}

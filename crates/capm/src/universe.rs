//! Symbol sets to analyse.

use crate::error::{CapmError, Result};
use capm_returns::plain_identifier;
use serde::{Deserialize, Serialize};

/// Assets analysed when none are given.
pub const DEFAULT_ASSETS: [&str; 4] = ["AAPL", "IBM", "MSFT", "INTC"];

/// Market index regressed on when none is given.
pub const DEFAULT_MARKET: &str = "^GSPC";

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

/// A list of assets plus the market index they are measured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSet {
    assets: Vec<String>,
    market: String,
}

impl SymbolSet {
    /// Create a symbol set.
    ///
    /// Tickers are trimmed and upper-cased; repeats, and the market appearing
    /// among the assets, are dropped.
    ///
    /// # Errors
    /// `Config` if the market or every asset is blank.
    pub fn new<S: AsRef<str>>(assets: &[S], market: &str) -> Result<Self> {
        let market = normalize(market);
        if market.is_empty() {
            return Err(CapmError::Config("market symbol is empty".to_string()));
        }

        let mut cleaned: Vec<String> = Vec::with_capacity(assets.len());
        for asset in assets {
            let asset = normalize(asset.as_ref());
            if !asset.is_empty() && asset != market && !cleaned.contains(&asset) {
                cleaned.push(asset);
            }
        }
        if cleaned.is_empty() {
            return Err(CapmError::Config("no asset symbols given".to_string()));
        }

        Ok(Self {
            assets: cleaned,
            market,
        })
    }

    /// Asset tickers, in request order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Market ticker as quoted, e.g. `^GSPC`.
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Column name the market ends up under after cleaning, e.g. `GSPC`.
    pub fn market_column(&self) -> String {
        plain_identifier(&self.market)
    }
}

impl Default for SymbolSet {
    fn default() -> Self {
        Self {
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
            market: DEFAULT_MARKET.to_string(),
        }
    }
}

impl Universe for SymbolSet {
    /// Assets followed by the market.
    fn symbols(&self) -> Vec<String> {
        let mut symbols = self.assets.clone();
        symbols.push(self.market.clone());
        symbols
    }
}

fn normalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

//! Cleaning of raw price tables.

use crate::error::Result;
use crate::prices::PriceTable;
use crate::table::DateTable;
use tracing::debug;

/// Turn a ticker into a plain column identifier.
///
/// Index tickers lose their caret (`^GSPC` → `GSPC`); any other character
/// that is not ASCII alphanumeric becomes an underscore (`BRK.B` → `BRK_B`).
pub fn plain_identifier(ticker: &str) -> String {
    ticker
        .trim_start_matches('^')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Drop incomplete dates, then rename every ticker to its plain identifier.
pub fn clean_prices(raw: &PriceTable) -> Result<PriceTable> {
    let mut table = raw.drop_missing()?;
    for symbol in raw.symbols() {
        let plain = plain_identifier(&symbol);
        if plain != symbol {
            debug!(from = %symbol, to = %plain, "renaming ticker");
            table = table.rename_symbol(&symbol, &plain)?;
        }
    }
    Ok(table)
}

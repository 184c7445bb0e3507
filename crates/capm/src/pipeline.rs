//! From raw prices and a risk-free series to fitted regressions.
//!
//! The pipeline is offline: acquisition happens elsewhere and hands over a
//! long quotes frame (or a [`PriceTable`]) and a [`RateSeries`].

use crate::config::AnalysisConfig;
use crate::error::{CapmError, Result};
use crate::universe::{SymbolSet, Universe};
use capm_model::{CapmEstimator, CapmFit};
use capm_returns::{
    CorrelationMatrix, DailyRiskFree, DateTable, ExcessReturnTable, PriceTable, RateSeries,
    ReturnTable, SummaryStatistics, clean_prices, correlation_matrix, describe,
};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::{debug, info};

/// Every intermediate table of one analysis, plus the fits.
#[derive(Debug, Clone)]
pub struct CapmAnalysis {
    /// Cleaned prices, index tickers renamed
    pub prices: PriceTable,
    /// Simple returns
    pub returns: ReturnTable,
    /// Daily risk-free rate over the return dates
    pub risk_free: DailyRiskFree,
    /// Returns minus the risk-free rate
    pub excess: ExcessReturnTable,
    /// Market column the assets were regressed on
    pub market: String,
    /// One regression per asset
    pub fits: Vec<CapmFit>,
}

impl CapmAnalysis {
    /// Descriptive statistics of the cleaned prices.
    pub fn price_statistics(&self) -> Result<Vec<SummaryStatistics>> {
        Ok(describe(&self.prices)?)
    }

    /// Pairwise correlations of the cleaned prices.
    pub fn price_correlation(&self) -> Result<CorrelationMatrix> {
        Ok(correlation_matrix(&self.prices)?)
    }

    /// First and last date of the regression sample.
    pub fn period(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let dates = self.excess.dates()?;
        Ok(dates.first().copied().zip(dates.last().copied()))
    }
}

/// Runs the cleaning, transformation and modelling stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
    universe: SymbolSet,
}

impl Pipeline {
    /// Validate the configuration and build a pipeline.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let universe = config.universe()?;
        Ok(Self { config, universe })
    }

    /// Settings in use.
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Assets and market.
    pub const fn universe(&self) -> &SymbolSet {
        &self.universe
    }

    /// Pivot long quotes into a raw price table over the universe.
    ///
    /// A symbol with no quotes is an error.
    pub fn raw_prices(&self, quotes: &DataFrame) -> Result<PriceTable> {
        Ok(PriceTable::from_quotes(
            quotes,
            &self.universe.symbols(),
            self.config.price_field,
        )?)
    }

    /// Drop incomplete dates and rename index tickers.
    pub fn clean(&self, raw: &PriceTable) -> Result<PriceTable> {
        let prices = clean_prices(raw)?;
        debug!(
            raw_rows = raw.height(),
            clean_rows = prices.height(),
            "cleaned prices"
        );
        Ok(prices)
    }

    /// Daily risk-free rate from the first return date up to the window end,
    /// with trailing days past the last return trimmed.
    pub fn daily_risk_free(&self, rates: &RateSeries, returns: &ReturnTable) -> Result<DailyRiskFree> {
        let dates = returns.dates()?;
        let (Some(first), Some(last)) = (dates.first().copied(), dates.last().copied()) else {
            return Err(CapmError::Config("return table is empty".to_string()));
        };

        let mut daily = rates
            .restrict(first, self.config.end.max(last))?
            .to_daily(self.config.term_days)?;
        while daily.dates()?.last().is_some_and(|d| *d > last) {
            daily = daily.drop_last()?;
        }
        Ok(daily)
    }

    /// Run every offline stage on a raw price table.
    pub fn run(&self, raw: &PriceTable, rates: &RateSeries) -> Result<CapmAnalysis> {
        let prices = self.clean(raw)?;
        let returns = ReturnTable::from_prices(&prices)?;
        let risk_free = self.daily_risk_free(rates, &returns)?;
        let excess = ExcessReturnTable::compute(&returns, &risk_free, self.config.alignment)?;

        let market = self.universe.market_column();
        let fits = CapmEstimator::new(market.as_str())
            .with_confidence_level(self.config.confidence_level)
            .fit(&excess)?;

        info!(
            assets = fits.len(),
            observations = excess.height(),
            market = %market,
            "analysis complete"
        );

        Ok(CapmAnalysis {
            prices,
            returns,
            risk_free,
            excess,
            market,
            fits,
        })
    }

    /// Run every offline stage on a long quotes frame.
    pub fn run_quotes(&self, quotes: &DataFrame, rates: &RateSeries) -> Result<CapmAnalysis> {
        let raw = self.raw_prices(quotes)?;
        self.run(&raw, rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capm_returns::{AlignmentPolicy, RateUnit};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, d).unwrap()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            symbols: vec!["AAPL".to_string(), "IBM".to_string()],
            start: date(3, 24),
            end: date(4, 1),
            ..Default::default()
        }
    }

    fn raw_prices() -> PriceTable {
        PriceTable::from_columns(
            &[date(3, 24), date(3, 25), date(3, 26), date(3, 29), date(3, 30), date(3, 31)],
            &[
                ("AAPL", vec![Some(120.09), Some(120.59), Some(121.21), Some(121.39), Some(119.90), Some(122.15)]),
                ("IBM", vec![Some(130.46), Some(133.56), Some(136.38), None, Some(135.86), Some(133.26)]),
                ("^GSPC", vec![Some(3881.37), Some(3909.52), Some(3974.54), Some(3971.09), Some(3958.55), Some(3972.89)]),
            ],
        )
        .unwrap()
    }

    fn rates() -> RateSeries {
        RateSeries::from_observations(
            &[date(3, 24), date(3, 25), date(3, 26), date(3, 29), date(3, 30), date(3, 31), date(4, 1)],
            vec![Some(0.02), Some(0.02), Some(0.02), Some(0.02), Some(0.02), Some(0.03), Some(0.02)],
            RateUnit::Percent,
        )
        .unwrap()
    }

    #[test]
    fn test_run() {
        let analysis = Pipeline::new(config()).unwrap().run(&raw_prices(), &rates()).unwrap();

        assert_eq!(analysis.prices.symbols(), vec!["AAPL", "IBM", "GSPC"]);
        assert_eq!(analysis.prices.height(), 5);
        assert_eq!(analysis.returns.height(), 4);
        // 29 March has a rate but no return after cleaning
        assert_eq!(analysis.risk_free.len(), 5);
        assert_eq!(analysis.risk_free.dates().unwrap().last(), Some(&date(3, 31)));
        assert_eq!(analysis.excess.dates().unwrap(), analysis.returns.dates().unwrap());
        assert_eq!(analysis.market, "GSPC");
        assert_eq!(analysis.fits.len(), 2);
        assert_eq!(analysis.fits[0].symbol, "AAPL");
        assert_eq!(analysis.period().unwrap(), Some((date(3, 25), date(3, 31))));

        let excess = analysis.excess.values("IBM").unwrap();
        let expected = (133.26 - 135.86) / 135.86 - 0.03 / 100.0 / 90.0;
        assert_relative_eq!(excess[3], expected, epsilon = 1e-15);
    }

    #[test]
    fn test_strict_alignment_after_trimming() {
        let config = AnalysisConfig {
            alignment: AlignmentPolicy::Strict,
            ..config()
        };
        let pipeline = Pipeline::new(config).unwrap();

        // The gap on 29 March leaves a rate date without a return.
        assert!(matches!(
            pipeline.run(&raw_prices(), &rates()),
            Err(CapmError::Returns(_))
        ));

        let complete = PriceTable::from_columns(
            &[date(3, 24), date(3, 25), date(3, 26), date(3, 29), date(3, 30), date(3, 31)],
            &[
                ("AAPL", vec![Some(120.09), Some(120.59), Some(121.21), Some(121.39), Some(119.90), Some(122.15)]),
                ("IBM", vec![Some(130.46), Some(133.56), Some(136.38), Some(135.50), Some(135.86), Some(133.26)]),
                ("^GSPC", vec![Some(3881.37), Some(3909.52), Some(3974.54), Some(3971.09), Some(3958.55), Some(3972.89)]),
            ],
        )
        .unwrap();
        let analysis = pipeline.run(&complete, &rates()).unwrap();
        assert_eq!(analysis.excess.height(), analysis.returns.height());
        assert_eq!(analysis.risk_free.dates().unwrap(), analysis.returns.dates().unwrap());
    }

    #[test]
    fn test_price_statistics() {
        let analysis = Pipeline::new(config()).unwrap().run(&raw_prices(), &rates()).unwrap();
        let stats = analysis.price_statistics().unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[1].count, 5);

        let corr = analysis.price_correlation().unwrap();
        assert_eq!(corr.symbols, vec!["AAPL", "IBM", "GSPC"]);
    }

    #[test]
    fn test_missing_market_column() {
        let raw = PriceTable::from_columns(
            &[date(3, 30), date(3, 31)],
            &[("AAPL", vec![Some(119.90), Some(122.15)])],
        )
        .unwrap();
        let result = Pipeline::new(config()).unwrap().run(&raw, &rates());
        assert!(matches!(result, Err(CapmError::Model(_))));
    }
}

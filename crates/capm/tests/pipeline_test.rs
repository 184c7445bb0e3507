//! End-to-end test of the offline pipeline on a long quotes frame.

use approx::assert_relative_eq;
use capm::{AnalysisConfig, CapmError, Pipeline};
use capm::returns::{DateTable, PriceField, RateSeries, RateUnit};
use chrono::NaiveDate;
use polars::prelude::*;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, m, d).unwrap()
}

/// Long frame shaped like the Yahoo provider's output.
fn quotes(rows: &[(&str, NaiveDate, f64, f64)]) -> DataFrame {
    let df = DataFrame::new(vec![
        Series::new(
            "symbol".into(),
            rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "date".into(),
            rows.iter().map(|r| r.1.to_string()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new("close".into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()).into(),
        Series::new(
            "adjusted_close".into(),
            rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        )
        .into(),
    ])
    .unwrap();

    df.lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()
        .unwrap()
}

fn sample() -> DataFrame {
    let days = [date(1, 4), date(1, 5), date(1, 6), date(1, 7), date(1, 8)];
    let aapl = [129.41, 131.01, 126.60, 130.92, 132.05];
    let msft = [217.69, 217.90, 212.25, 218.29, 219.62];
    let gspc = [3700.65, 3726.86, 3748.14, 3803.79, 3824.68];

    let mut rows = Vec::new();
    for i in 0..days.len() {
        rows.push(("AAPL", days[i], aapl[i], aapl[i] * 0.99));
        // MSFT has no quote on 6 January
        if i != 2 {
            rows.push(("MSFT", days[i], msft[i], msft[i] * 0.98));
        }
        rows.push(("^GSPC", days[i], gspc[i], gspc[i]));
    }
    quotes(&rows)
}

fn rates() -> RateSeries {
    RateSeries::from_observations(
        &[date(1, 4), date(1, 5), date(1, 6), date(1, 7), date(1, 8), date(1, 11)],
        vec![Some(0.09), Some(0.09), None, Some(0.09), Some(0.08), Some(0.08)],
        RateUnit::Percent,
    )
    .unwrap()
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
        start: date(1, 4),
        end: date(1, 11),
        ..Default::default()
    }
}

#[test]
fn test_quotes_to_fits() {
    let pipeline = Pipeline::new(config()).unwrap();
    let analysis = pipeline.run_quotes(&sample(), &rates()).unwrap();

    // 6 January is dropped for the missing MSFT quote
    assert_eq!(
        analysis.prices.dates().unwrap(),
        vec![date(1, 4), date(1, 5), date(1, 7), date(1, 8)]
    );
    assert_eq!(analysis.returns.height(), 3);
    assert_eq!(
        analysis.excess.dates().unwrap(),
        vec![date(1, 5), date(1, 7), date(1, 8)]
    );

    let gspc = analysis.excess.values("GSPC").unwrap();
    assert_relative_eq!(
        gspc[1],
        (3803.79 - 3726.86) / 3726.86 - 0.09 / 100.0 / 90.0,
        epsilon = 1e-15
    );

    assert_eq!(analysis.fits.len(), 2);
    assert_eq!(analysis.fits[1].symbol, "MSFT");
    assert_eq!(analysis.fits[1].fit.nobs, 3);
}

#[test]
fn test_adjusted_close() {
    let config = AnalysisConfig {
        price_field: PriceField::AdjustedClose,
        ..config()
    };
    let analysis = Pipeline::new(config)
        .unwrap()
        .run_quotes(&sample(), &rates())
        .unwrap();

    let aapl = analysis.prices.values("AAPL").unwrap();
    assert_relative_eq!(aapl[0], 129.41 * 0.99, epsilon = 1e-12);
}

#[test]
fn test_missing_symbol_is_an_error() {
    let config = AnalysisConfig {
        symbols: vec!["AAPL".to_string(), "TSLA".to_string()],
        ..config()
    };
    let result = Pipeline::new(config).unwrap().run_quotes(&sample(), &rates());
    assert!(matches!(result, Err(CapmError::Returns(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let config = AnalysisConfig {
        end: date(1, 1),
        ..config()
    };
    assert!(matches!(Pipeline::new(config), Err(CapmError::Config(_))));
}

//! capm CLI binary.
//!
//! Fetches prices and a risk-free rate, then fits single-factor CAPM
//! regressions of each asset on the market.

mod integration;

use capm::{AnalysisConfig, CapmAnalysis, Pipeline, Universe};
use capm_data::fred::FredClient;
use capm_data::yahoo::quotes::YahooQuoteProvider;
use capm_output::{
    CapmSummary, ExportFormat, Exporter, ReportBuilder, TableExport, correlation_table,
    fit_records, statistics_table,
};
use capm_returns::{
    AlignmentPolicy, DateTable, PriceField, PriceTable, correlation_matrix, describe,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use integration::cache_manager;
use integration::data_pipeline::{
    FetchConfig, cache_stats, fetch_quotes, fetch_rates, print_cache_info,
};
use polars::prelude::DataFrame;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration as StdDuration;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "capm=info,capm_data=warn";

#[derive(Parser)]
#[command(name = "capm")]
#[command(about = "CAPM alpha and beta from daily excess returns", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Universe, window and cache flags shared by the data commands.
#[derive(Args, Debug, Clone, Default)]
struct WindowArgs {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset tickers, comma separated
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Market index ticker
    #[arg(long)]
    market: Option<String>,

    /// First date of the window (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End of the window (YYYY-MM-DD); prices stop the day before
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Use adjusted close instead of close
    #[arg(long)]
    adjusted: bool,

    /// Disable caching (always fetch fresh data)
    #[arg(long)]
    no_cache: bool,

    /// Force refresh cached data
    #[arg(long)]
    refresh: bool,
}

impl WindowArgs {
    const fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            use_cache: !self.no_cache,
            force_refresh: self.refresh,
        }
    }
}

/// Risk-free and regression flags of `analyze`.
#[derive(Args, Debug, Clone, Default)]
struct ModelArgs {
    /// FRED series used as the risk-free rate
    #[arg(long)]
    series: Option<String>,

    /// Term of the risk-free instrument in days
    #[arg(long)]
    term_days: Option<u32>,

    /// Fail unless return and risk-free dates match exactly
    #[arg(long)]
    strict: bool,

    /// Coverage of the reported confidence intervals
    #[arg(long)]
    confidence: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit alpha and beta of every asset against the market
    Analyze {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// Write the fitted regressions to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export format (csv, json or pretty-json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Write the excess-return table to this file
        #[arg(long)]
        excess: Option<PathBuf>,

        /// Write a JSON report of the whole run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Fetch and clean prices, then describe them
    Prices {
        #[command(flatten)]
        window: WindowArgs,

        /// Write the cleaned price table to this file
        #[arg(long)]
        export: Option<PathBuf>,

        /// Export format (csv, json or pretty-json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Search FRED for candidate risk-free series
    Search {
        /// Search text, e.g. "treasury bill"
        text: String,

        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Inspect or clear the local data cache
    Cache {
        /// Show cache statistics
        #[arg(long)]
        stats: bool,

        /// Remove every cached quote and rate
        #[arg(long)]
        clear: bool,

        /// Remove cached quotes of one symbol
        #[arg(long)]
        clear_symbol: Option<String>,

        /// Remove cached observations of one series
        #[arg(long)]
        clear_series: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            window,
            model,
            export,
            format,
            excess,
            report,
        } => {
            let config = build_config(&window, &model)?;
            let outputs = Outputs {
                format: format.parse()?,
                export,
                excess,
                report,
            };
            analyze(config, window.fetch_config(), &outputs).await?;
        }
        Commands::Prices {
            window,
            export,
            format,
        } => {
            let config = build_config(&window, &ModelArgs::default())?;
            let format: ExportFormat = format.parse()?;
            show_prices(config, window.fetch_config(), export.as_deref(), format).await?;
        }
        Commands::Search { text, limit } => {
            search_series(&text, limit).await?;
        }
        Commands::Cache {
            stats,
            clear,
            clear_symbol,
            clear_series,
        } => {
            manage_cache(stats, clear, clear_symbol, clear_series)?;
        }
    }

    Ok(())
}

/// Load the configuration file (or defaults), then apply command-line overrides.
fn build_config(
    window: &WindowArgs,
    model: &ModelArgs,
) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config = match &window.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    if !window.symbols.is_empty() {
        config.symbols = window.symbols.clone();
    }
    if let Some(market) = &window.market {
        config.market = market.clone();
    }
    if let Some(start) = window.start {
        config.start = start;
    }
    if let Some(end) = window.end {
        config.end = end;
    }
    if window.adjusted {
        config.price_field = PriceField::AdjustedClose;
    }
    if let Some(series) = &model.series {
        config.risk_free_series = series.clone();
    }
    if let Some(term_days) = model.term_days {
        config.term_days = term_days;
    }
    if model.strict {
        config.alignment = AlignmentPolicy::Strict;
    }
    if let Some(confidence) = model.confidence {
        config.confidence_level = confidence;
    }

    config.validate()?;
    Ok(config)
}

/// Files requested by `analyze`.
struct Outputs {
    format: ExportFormat,
    export: Option<PathBuf>,
    excess: Option<PathBuf>,
    report: Option<PathBuf>,
}

fn print_header(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{:^62}║", title);
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

fn print_setup(pipeline: &Pipeline, fetch: FetchConfig) {
    let config = pipeline.config();
    let universe = pipeline.universe();

    println!("Assets: {}", universe.assets().join(", "));
    println!("Market: {}", universe.market());
    println!("Window: {} to {}", config.start, config.end);
    println!("Price:  {:?}", config.price_field);

    if fetch.use_cache {
        print_cache_info();
        if fetch.force_refresh {
            println!("  Mode: Force refresh (re-fetching all data)");
        }
    } else {
        println!("  Cache: Disabled");
    }
    println!();
}

/// Download quotes for the whole universe behind a progress bar.
async fn download_quotes(
    pipeline: &Pipeline,
    fetch: FetchConfig,
) -> Result<DataFrame, Box<dyn std::error::Error>> {
    let config = pipeline.config();
    let symbols = pipeline.universe().symbols();
    let cache = fetch.open_cache();
    let provider = YahooQuoteProvider::new()?;

    let pb = ProgressBar::new(symbols.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(StdDuration::from_millis(100));
    pb.set_message("Fetching quotes...");

    match fetch_quotes(
        &provider,
        cache.as_ref(),
        &symbols,
        config.start,
        config.end,
        fetch,
        Some(&pb),
    )
    .await
    {
        Ok(quotes) => {
            pb.finish_with_message(format!(
                "Fetched {} symbols ({} rows)",
                symbols.len(),
                quotes.height()
            ));
            Ok(quotes)
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(format!("Failed to fetch quotes: {}", e).into())
        }
    }
}

fn step(message: &str) -> std::io::Result<()> {
    print!("{}...", message);
    std::io::stdout().flush()
}

async fn analyze(
    config: AnalysisConfig,
    fetch: FetchConfig,
    outputs: &Outputs,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config)?;
    print_header(&format!(
        "CAPM ANALYSIS VS {}",
        pipeline.universe().market()
    ));
    print_setup(&pipeline, fetch);

    let quotes = download_quotes(&pipeline, fetch).await?;
    let config = pipeline.config();

    step(&format!("Fetching risk-free rate ({})", config.risk_free_series))?;
    let client = FredClient::from_env()?;
    let cache = fetch.open_cache();
    let rates = match fetch_rates(
        &client,
        cache.as_ref(),
        &config.risk_free_series,
        config.start,
        config.end,
        config.rate_unit,
        fetch,
    )
    .await
    {
        Ok(rates) => {
            println!(" ✓");
            rates
        }
        Err(e) => {
            println!(" ✗");
            return Err(format!("Failed to fetch {}: {}", config.risk_free_series, e).into());
        }
    };

    step("Fitting regressions")?;
    let raw = pipeline.raw_prices(&quotes)?;
    let analysis = match pipeline.run(&raw, &rates) {
        Ok(analysis) => {
            println!(" ✓ ({} observations)", analysis.excess.height());
            analysis
        }
        Err(e) => {
            println!(" ✗");
            return Err(e.into());
        }
    };

    print_analysis(&analysis)?;
    write_outputs(&pipeline, &analysis, outputs)?;

    println!("\n════════════════════════════════════════════════════════════════\n");
    Ok(())
}

fn print_analysis(analysis: &CapmAnalysis) -> Result<(), Box<dyn std::error::Error>> {
    print!(
        "{}",
        statistics_table("Price Statistics", &analysis.price_statistics()?)
    );
    print!(
        "{}",
        correlation_table("Price Correlation", &analysis.price_correlation()?)
    );

    let mut summary = CapmSummary::new(analysis.market.as_str(), &analysis.fits);
    if let Some((start, end)) = analysis.period()? {
        summary = summary.with_period(start, end);
    }
    print!("{}", summary.to_ascii_table());
    Ok(())
}

fn write_outputs(
    pipeline: &Pipeline,
    analysis: &CapmAnalysis,
    outputs: &Outputs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &outputs.export {
        fit_records(&analysis.fits).export_to_file(path, outputs.format)?;
        println!("\nFits written to {}", path.display());
    }

    if let Some(path) = &outputs.excess {
        TableExport::from_table("excess_returns", &analysis.excess)?
            .export_to_file(path, outputs.format)?;
        println!("Excess returns written to {}", path.display());
    }

    if let Some(path) = &outputs.report {
        let mut builder = ReportBuilder::new()
            .market(analysis.market.as_str())
            .observations(analysis.excess.height())
            .parameters(serde_json::to_value(pipeline.config())?)
            .statistics(analysis.price_statistics()?)
            .correlation(&analysis.price_correlation()?)
            .fits(&analysis.fits);
        if let Some((start, end)) = analysis.period()? {
            builder = builder.period(start, end);
        }
        builder.build()?.write_to_file(path)?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

async fn show_prices(
    config: AnalysisConfig,
    fetch: FetchConfig,
    export: Option<&Path>,
    format: ExportFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config)?;
    print_header("PRICE HISTORY");
    print_setup(&pipeline, fetch);

    let quotes = download_quotes(&pipeline, fetch).await?;

    step("Cleaning prices")?;
    let raw = pipeline.raw_prices(&quotes)?;
    let prices: PriceTable = pipeline.clean(&raw)?;
    println!(" ✓ ({} of {} dates kept)", prices.height(), raw.height());

    print!("{}", statistics_table("Price Statistics", &describe(&prices)?));
    print!(
        "{}",
        correlation_table("Price Correlation", &correlation_matrix(&prices)?)
    );

    if let Some(path) = export {
        TableExport::from_table("prices", &prices)?.export_to_file(path, format)?;
        println!("\nPrices written to {}", path.display());
    }

    Ok(())
}

async fn search_series(text: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let client = FredClient::from_env()?;
    let results = client.search(text, limit).await?;

    println!("\nFRED series matching \"{}\"", text);
    println!("{}", "=".repeat(96));
    println!(
        "{:<16} {:>5} {:<10} {:<24} {}",
        "Series", "Pop.", "Frequency", "Units", "Title"
    );
    println!("{}", "-".repeat(96));
    for info in &results {
        println!(
            "{:<16} {:>5} {:<10} {:<24} {}",
            info.id,
            info.popularity,
            truncate(&info.frequency, 10),
            truncate(&info.units, 24),
            info.title
        );
    }
    println!("{}", "=".repeat(96));
    println!("{} series", results.len());

    Ok(())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

fn manage_cache(
    stats: bool,
    clear: bool,
    clear_symbol: Option<String>,
    clear_series: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache = cache_manager::open_cache()?;

    if clear {
        cache.clear_all()?;
        println!("Cache cleared.");
    }
    if let Some(symbol) = clear_symbol {
        let symbol = symbol.trim().to_uppercase();
        cache.clear_symbol(&symbol)?;
        println!("Cleared cached quotes for {}.", symbol);
    }
    if let Some(series) = clear_series {
        let series = series.trim().to_uppercase();
        cache.clear_series(&series)?;
        println!("Cleared cached observations for {}.", series);
    }

    let nothing_requested = !clear && !stats;
    if stats || nothing_requested {
        println!("Cache location: {}", cache_manager::cache_path().display());
        if let Some(stats) = cache_stats() {
            println!("  Quotes: {} rows for {} symbols", stats.total_quotes, stats.unique_symbols);
            println!("  Rates:  {} rows for {} series", stats.total_rates, stats.unique_series);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "capm",
            "analyze",
            "--symbols",
            "nvda,amd",
            "--start",
            "2022-01-03",
            "--end",
            "2022-07-01",
            "--strict",
            "--format",
            "json",
        ])
        .unwrap();

        let Commands::Analyze {
            window,
            model,
            format,
            ..
        } = cli.command
        else {
            panic!("expected analyze");
        };
        assert_eq!(window.symbols, vec!["nvda", "amd"]);
        assert_eq!(format, "json");

        let config = build_config(&window, &model).unwrap();
        assert_eq!(config.symbols, vec!["nvda", "amd"]);
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2022, 1, 3).unwrap());
        assert_eq!(config.alignment, AlignmentPolicy::Strict);
        assert_eq!(config.market, "^GSPC");
        assert_eq!(config.price_field, PriceField::Close);
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&WindowArgs::default(), &ModelArgs::default()).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_build_config_overrides() {
        let window = WindowArgs {
            market: Some("^DJI".to_string()),
            adjusted: true,
            ..Default::default()
        };
        let model = ModelArgs {
            series: Some("DTB3".to_string()),
            term_days: Some(91),
            confidence: Some(0.9),
            ..Default::default()
        };
        let config = build_config(&window, &model).unwrap();
        assert_eq!(config.market, "^DJI");
        assert_eq!(config.price_field, PriceField::AdjustedClose);
        assert_eq!(config.risk_free_series, "DTB3");
        assert_eq!(config.term_days, 91);
        assert_eq!(config.confidence_level, 0.9);
    }

    #[test]
    fn test_build_config_rejects_inverted_window() {
        let window = WindowArgs {
            start: NaiveDate::from_ymd_opt(2021, 4, 1),
            end: NaiveDate::from_ymd_opt(2021, 1, 1),
            ..Default::default()
        };
        assert!(build_config(&window, &ModelArgs::default()).is_err());
    }

    #[test]
    fn test_window_fetch_config() {
        let window = WindowArgs {
            no_cache: true,
            ..Default::default()
        };
        let fetch = window.fetch_config();
        assert!(!fetch.use_cache);
        assert!(!fetch.force_refresh);
    }

    #[test]
    fn test_cli_parses_cache_and_search() {
        let cli = Cli::try_parse_from(["capm", "cache", "--clear-symbol", "aapl"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache { clear_symbol: Some(ref s), .. } if s == "aapl"
        ));

        let cli = Cli::try_parse_from(["capm", "search", "treasury bill", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::Search { limit: 5, .. }));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Daily", 10), "Daily");
        assert_eq!(truncate("Percent per annum", 8), "Percent…");
    }
}

//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::catalog_adapter::CatalogAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::analysis::{self, AnalysisConfig, AnalysisRequest, lookback_start};
use crate::domain::backtest::BacktestConfig;
use crate::domain::catalog::{DEFAULT_EQUITY_SUFFIX, Market, qualify_symbol};
use crate::domain::config_validation::{DataProvider, validate_analysis_config};
use crate::domain::error::EngineError;
use crate::domain::fibonacci::SwingConfig;
use crate::domain::market_data::MarketData;
use crate::domain::report::AnalysisReport;
use crate::domain::resample::CandleInterval;
use crate::domain::scan::{self, DetailReport, ScanConfig, ScanReport, parse_codes};
use crate::domain::signal::SignalConfig;
use crate::domain::source::Source;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "rhythmsphere",
    about = "Heikin-Ashi Fibonacci cycle signals and backtests"
)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and backtest for one symbol
    Analyze {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "equity")]
        source: Source,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the current buy signal for one symbol
    Signal {
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "equity")]
        source: Source,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Check buy signals across a catalog or a code list
    Scan {
        #[arg(long, requires = "market", conflicts_with = "codes")]
        catalog: Option<PathBuf>,
        #[arg(long)]
        market: Option<Market>,
        #[arg(long, required_unless_present = "catalog")]
        codes: Option<String>,
        /// Source for --codes when no --market is given
        #[arg(long)]
        source: Option<Source>,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Backtest every symbol with a buy signal
        #[arg(long)]
        detail: bool,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Data-source settings from the `[data]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub provider: DataProvider,
    pub csv_dir: PathBuf,
    pub equity_suffix: String,
    pub crypto_interval: CandleInterval,
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Command::Analyze {
            symbol,
            source,
            start,
            end,
            config,
            output,
        } => run_analyze(
            &symbol,
            source,
            start,
            end,
            config.as_deref(),
            output.as_deref(),
        ),
        Command::Signal {
            symbol,
            source,
            as_of,
            config,
        } => run_signal(&symbol, source, as_of, config.as_deref()),
        Command::Scan {
            catalog,
            market,
            codes,
            source,
            as_of,
            detail,
            config,
        } => run_scan(
            catalog.as_deref(),
            market,
            codes.as_deref(),
            source,
            as_of,
            detail,
            config.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug,rhythmsphere=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,rhythmsphere=info"))
    };

    // a second init (tests dispatching twice) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, EngineError> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            FileConfigAdapter::from_file(p)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

fn positive_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, EngineError> {
    let raw = config.get_int(section, key, i64::try_from(default).unwrap_or(i64::MAX));
    match usize::try_from(raw) {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(EngineError::invalid(section, key, format!("{key} must be a positive integer"))),
    }
}

/// Validated configuration to [`AnalysisConfig`]; absent keys take defaults.
pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, EngineError> {
    validate_analysis_config(config)?;

    let defaults = AnalysisConfig::default();
    let signal_defaults = SignalConfig::default();
    let timeout_default = defaults.scan.timeout.as_millis() as i64;
    let timeout_ms = config.get_int("scan", "timeout_ms", timeout_default);

    Ok(AnalysisConfig {
        lookback_days: config.get_int("analysis", "lookback_days", defaults.lookback_days),
        swing: SwingConfig {
            half_width: positive_usize(config, "swing", "half_width", defaults.swing.half_width)?,
        },
        signal: SignalConfig {
            trigger_ratio: config.get_double("signal", "trigger_ratio", signal_defaults.trigger_ratio),
            lookback_bars: positive_usize(
                config,
                "signal",
                "lookback_bars",
                signal_defaults.lookback_bars,
            )?,
            require_bullish: config.get_bool(
                "signal",
                "require_bullish",
                signal_defaults.require_bullish,
            ),
            exit_bearish_bars: positive_usize(
                config,
                "signal",
                "exit_bearish_bars",
                signal_defaults.exit_bearish_bars,
            )?,
            exit_on_level_break: config.get_bool(
                "signal",
                "exit_on_level_break",
                signal_defaults.exit_on_level_break,
            ),
        },
        backtest: BacktestConfig {
            commission_pct: config.get_double("backtest", "commission_pct", 0.0),
            slippage_pct: config.get_double("backtest", "slippage_pct", 0.0),
            mark_to_market: config.get_bool("backtest", "mark_to_market", false),
        },
        scan: ScanConfig {
            concurrency: positive_usize(config, "scan", "concurrency", defaults.scan.concurrency)?,
            timeout: std::time::Duration::from_millis(timeout_ms.max(1) as u64),
        },
    })
}

pub fn build_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, EngineError> {
    let provider = match config.get_string("data", "provider") {
        Some(raw) => raw
            .parse::<DataProvider>()
            .map_err(|reason| EngineError::invalid("data", "provider", reason))?,
        None => DataProvider::Http,
    };
    let crypto_interval = match config.get_string("data", "crypto_interval") {
        Some(raw) => raw
            .parse::<CandleInterval>()
            .map_err(|reason| EngineError::invalid("data", "crypto_interval", reason))?,
        None => CandleInterval::Day,
    };

    Ok(DataSettings {
        provider,
        csv_dir: PathBuf::from(
            config
                .get_string("data", "csv_dir")
                .unwrap_or_else(|| "./data".to_string()),
        ),
        equity_suffix: config
            .get_string("data", "equity_suffix")
            .unwrap_or_else(|| DEFAULT_EQUITY_SUFFIX.to_string()),
        crypto_interval,
    })
}

pub fn build_market_data(settings: &DataSettings) -> Result<MarketData, EngineError> {
    match settings.provider {
        DataProvider::Csv => Ok(MarketData::single(Arc::new(CsvAdapter::new(
            settings.csv_dir.clone(),
        )))),
        #[cfg(feature = "http")]
        DataProvider::Http => {
            use crate::adapters::upbit_adapter::UpbitAdapter;
            use crate::adapters::yahoo_adapter::YahooAdapter;

            Ok(MarketData::new(
                Arc::new(YahooAdapter::new()?),
                Arc::new(UpbitAdapter::new(settings.crypto_interval)?),
            ))
        }
        #[cfg(not(feature = "http"))]
        DataProvider::Http => Err(EngineError::invalid(
            "data",
            "provider",
            "http provider requires the http feature",
        )),
    }
}

/// Fetchable symbols for a scan, paired with the label printed for each.
pub fn resolve_symbols(
    catalog: Option<&Path>,
    market: Option<Market>,
    codes: Option<&str>,
    source: Source,
    equity_suffix: &str,
) -> Result<Vec<(String, String)>, EngineError> {
    let mut resolved: Vec<(String, String)> = Vec::new();

    match (catalog, codes) {
        (Some(path), _) => {
            let market = market.ok_or_else(|| {
                EngineError::invalid("scan", "market", "--market is required with --catalog")
            })?;
            for entry in CatalogAdapter::load(path, market.layout())? {
                resolved.push((market.qualify(&entry.ticker, equity_suffix), entry.label()));
            }
        }
        (None, Some(list)) => {
            let codes =
                parse_codes(list).map_err(|e| EngineError::invalid("scan", "codes", e.to_string()))?;
            for code in codes {
                resolved.push((qualify_symbol(&code, source, equity_suffix), code));
            }
        }
        (None, None) => {
            return Err(EngineError::invalid(
                "scan",
                "codes",
                "either --catalog or --codes is required",
            ));
        }
    }

    // catalogs may list one instrument twice
    let mut seen = std::collections::HashSet::new();
    resolved.retain(|(symbol, _)| seen.insert(symbol.clone()));
    Ok(resolved)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn run_analyze(
    symbol: &str,
    source: Source,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<ExitCode, EngineError> {
    let adapter = load_config(config_path)?;
    let config = build_analysis_config(&adapter)?;
    let settings = build_data_settings(&adapter)?;
    let data = build_market_data(&settings)?;

    let end = end.unwrap_or_else(today);
    let start = match start {
        Some(start) => start,
        None => lookback_start(end, config.lookback_days)?,
    };
    let request = AnalysisRequest {
        symbol: qualify_symbol(symbol, source, &settings.equity_suffix),
        source,
        start,
        end,
    };

    eprintln!(
        "Analyzing {} ({}) from {} to {}",
        request.symbol, request.source, request.start, request.end
    );
    let report = analysis::run(&data, &request, &config)?;
    print_summary(&report);
    println!(
        "{} {}",
        report.request.symbol,
        if report.buy_signal { "BUY" } else { "NONE" }
    );

    if let Some(path) = output {
        JsonReportAdapter::new().write(&report, path)?;
        eprintln!("\nReport written to: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn print_summary(report: &AnalysisReport) {
    let m = &report.result.metrics;
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Bars:               {}", report.bars.len());
    eprintln!("Total Return:       {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized Return:  {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:       {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:       {:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:       {}", m.total_trades);
    if m.total_trades > 0 {
        eprintln!("Win Rate:           {:.1}%", m.win_rate * 100.0);
        eprintln!("Avg Trade Return:   {:.2}%", m.avg_trade_return * 100.0);
        eprintln!("Avg Holding Days:   {:.1}", m.avg_holding_days);
    }

    eprintln!("\n=== Current Cycle ===");
    eprintln!("Swings confirmed:   {}", report.swings.len());
    if let Some(est) = &report.cycle_estimate {
        eprintln!(
            "Cycle:              {:.1} bars, {} bars since anchor ({:.0}%), {:?}",
            est.mean_period_bars,
            est.bars_since_anchor,
            est.phase * 100.0,
            est.direction
        );
    }
    for level in &report.levels {
        eprintln!("  {:>5.3}  {:.4}", level.ratio, level.price);
    }
}

fn run_signal(
    symbol: &str,
    source: Source,
    as_of: Option<NaiveDate>,
    config_path: Option<&Path>,
) -> Result<ExitCode, EngineError> {
    let adapter = load_config(config_path)?;
    let config = build_analysis_config(&adapter)?;
    let settings = build_data_settings(&adapter)?;
    let data = build_market_data(&settings)?;

    let symbol = qualify_symbol(symbol, source, &settings.equity_suffix);
    let as_of = as_of.unwrap_or_else(today);
    let signal = analysis::check_buy_signal(&data, &symbol, source, as_of, &config)?;
    println!("{} {}", symbol, if signal { "BUY" } else { "NONE" });
    Ok(ExitCode::SUCCESS)
}

fn run_scan(
    catalog: Option<&Path>,
    market: Option<Market>,
    codes: Option<&str>,
    source: Option<Source>,
    as_of: Option<NaiveDate>,
    detail: bool,
    config_path: Option<&Path>,
) -> Result<ExitCode, EngineError> {
    let adapter = load_config(config_path)?;
    let config = build_analysis_config(&adapter)?;
    let settings = build_data_settings(&adapter)?;
    let data = Arc::new(build_market_data(&settings)?);

    let source = market
        .map(|m| m.source())
        .or(source)
        .unwrap_or(Source::Equity);
    let targets = resolve_symbols(catalog, market, codes, source, &settings.equity_suffix)?;
    if targets.is_empty() {
        eprintln!("error: no symbols to scan");
        return Ok(ExitCode::from(2));
    }

    let symbols: Vec<String> = targets.iter().map(|(s, _)| s.clone()).collect();
    let as_of = as_of.unwrap_or_else(today);
    eprintln!(
        "Scanning {} symbols ({}) as of {} with concurrency {}...",
        symbols.len(),
        source,
        as_of,
        config.scan.concurrency
    );

    let report = scan::scan_symbols(Arc::clone(&data), &symbols, source, as_of, &config)?;
    print_scan(&report, &targets);

    if detail && !report.signals.is_empty() {
        let details = scan::detail_signals(&data, &report.signals, source, as_of, &config);
        print_details(&details, &targets);
    }

    if report.evaluated == 0 {
        if let Some(first) = report.failures.first() {
            return Ok((&first.error).into());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn label_of<'a>(targets: &'a [(String, String)], symbol: &'a str) -> &'a str {
    targets
        .iter()
        .find(|(s, _)| s == symbol)
        .map(|(_, label)| label.as_str())
        .unwrap_or(symbol)
}

fn print_scan(report: &ScanReport, targets: &[(String, String)]) {
    for symbol in &report.signals {
        println!("{}\t{}", symbol, label_of(targets, symbol));
    }

    eprintln!("\n=== Scan Summary ===");
    eprintln!("Evaluated:    {}", report.evaluated);
    eprintln!("Buy signals:  {}", report.signals.len());
    eprintln!("Failures:     {}", report.failures.len());
    for failure in &report.failures {
        eprintln!(
            "  {} [{}]: {}",
            label_of(targets, &failure.symbol),
            failure.error.kind(),
            failure.error
        );
    }
}

fn print_details(details: &DetailReport, targets: &[(String, String)]) {
    for report in &details.reports {
        eprintln!(
            "\n##### {} ({} to {}) #####",
            label_of(targets, &report.request.symbol),
            report.request.start,
            report.request.end
        );
        print_summary(report);
    }
    for failure in &details.failures {
        eprintln!(
            "\nDetail for {} failed [{}]: {}",
            label_of(targets, &failure.symbol),
            failure.error.kind(),
            failure.error
        );
    }
}

fn run_validate(config_path: &Path) -> Result<ExitCode, EngineError> {
    let adapter = load_config(Some(config_path))?;
    let config = build_analysis_config(&adapter)?;
    let settings = build_data_settings(&adapter)?;

    eprintln!("\nAnalysis:");
    eprintln!("  lookback_days:       {}", config.lookback_days);
    eprintln!("  half_width:          {}", config.swing.half_width);
    eprintln!("\nSignal:");
    eprintln!("  trigger_ratio:       {}", config.signal.trigger_ratio);
    eprintln!("  lookback_bars:       {}", config.signal.lookback_bars);
    eprintln!("  require_bullish:     {}", config.signal.require_bullish);
    eprintln!("  exit_bearish_bars:   {}", config.signal.exit_bearish_bars);
    eprintln!("  exit_on_level_break: {}", config.signal.exit_on_level_break);
    eprintln!("\nBacktest:");
    eprintln!("  commission_pct:      {}", config.backtest.commission_pct);
    eprintln!("  slippage_pct:        {}", config.backtest.slippage_pct);
    eprintln!("  mark_to_market:      {}", config.backtest.mark_to_market);
    eprintln!("\nScan:");
    eprintln!("  concurrency:         {}", config.scan.concurrency);
    eprintln!("  timeout_ms:          {}", config.scan.timeout.as_millis());
    eprintln!("\nData:");
    eprintln!("  provider:            {:?}", settings.provider);
    eprintln!("  csv_dir:             {}", settings.csv_dir.display());
    eprintln!("  equity_suffix:       {}", settings.equity_suffix);
    eprintln!("  crypto_interval:     {}", settings.crypto_interval);

    eprintln!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}

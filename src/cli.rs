//! CLI definition and dispatch.

use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::order_csv_adapter::OrderCsvAdapter;
use crate::adapters::risk_report_adapter::{self, RiskReportAdapter};
use crate::adapters::score_csv_adapter::ScoreCsvAdapter;
use crate::domain::config::TradingConfig;
use crate::domain::config_validation::validate_config;
use crate::domain::error::NeutraderError;
use crate::domain::order::OrderPrice;
use crate::domain::pipeline::{run_pipeline, PipelineResult};
use crate::domain::universe::{load_market_snapshot, parse_symbols};
use crate::ports::data_port::BarProvider;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "neutrader",
    about = "Benchmark-relative scoring and market-neutral order generation"
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score, select and allocate; write orders and reports
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of SYMBOL.csv bar files
        #[arg(short, long)]
        data: PathBuf,
        /// Scoring date (YYYY-MM-DD); defaults to the latest common date
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Override [model] total_budget
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        orders: Option<PathBuf>,
        #[arg(long)]
        scores: Option<PathBuf>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the score table without allocating
    Score {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Build and validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "neutrader=info",
        1 => "neutrader=debug",
        _ => "neutrader=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            as_of,
            budget,
            orders,
            scores,
            report,
        } => run_allocation(&config, &data, as_of, budget, orders, scores, report),
        Command::Score {
            config,
            data,
            as_of,
        } => run_score(&config, &data, as_of),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data } => run_list_symbols(&data),
    }
}

fn fail(err: NeutraderError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, NeutraderError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Parse and validate, applying a command-line budget override first.
pub fn build_config(
    adapter: &FileConfigAdapter,
    budget_override: Option<f64>,
) -> Result<TradingConfig, NeutraderError> {
    let mut config = TradingConfig::from_port(adapter)?;
    if let Some(budget) = budget_override {
        config = config.with_total_budget(budget);
    }
    validate_config(&config)?;
    Ok(config)
}

/// Configured symbols, or every symbol the provider has apart from the
/// benchmark.
pub fn resolve_symbols(
    config: &TradingConfig,
    benchmark: &str,
    provider: &dyn BarProvider,
) -> Result<Vec<String>, NeutraderError> {
    let symbols = match &config.symbols {
        Some(list) => parse_symbols(&list.join(","))
            .map_err(|e| NeutraderError::invalid("universe", "symbols", e.to_string()))?,
        None => provider.list_symbols()?,
    };
    Ok(symbols.into_iter().filter(|s| s != benchmark).collect())
}

fn require_benchmark(config: &TradingConfig) -> Result<String, NeutraderError> {
    config
        .benchmark
        .clone()
        .ok_or_else(|| NeutraderError::ConfigMissing {
            section: "universe".into(),
            key: "benchmark".into(),
        })
}

/// Stages shared by `run` and `score`: config, universe, data, pipeline.
pub fn execute(
    config_path: &Path,
    data_dir: &Path,
    as_of: Option<NaiveDate>,
    budget_override: Option<f64>,
) -> Result<PipelineResult, NeutraderError> {
    let adapter = load_config(config_path)?;
    let config = build_config(&adapter, budget_override)?;
    let benchmark = require_benchmark(&config)?;

    let provider = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = resolve_symbols(&config, &benchmark, &provider)?;
    if symbols.is_empty() {
        return Err(NeutraderError::NoData {
            symbol: "universe".into(),
        });
    }

    let end_date = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let load = load_market_snapshot(
        &provider,
        &symbols,
        &benchmark,
        end_date,
        config.lookback_days,
    );

    let mut result = run_pipeline(&load.snapshot, &config, as_of)?;
    let mut skipped = load.skipped;
    skipped.append(&mut result.skipped);
    result.skipped = skipped;

    for flag in &result.flags {
        warn!(%flag, "run flag");
    }
    Ok(result)
}

fn run_allocation(
    config_path: &Path,
    data_dir: &Path,
    as_of: Option<NaiveDate>,
    budget: Option<f64>,
    orders_path: Option<PathBuf>,
    scores_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> ExitCode {
    let result = match execute(config_path, data_dir, as_of, budget) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let outputs: [(Option<PathBuf>, &dyn ReportPort); 3] = [
        (orders_path, &OrderCsvAdapter),
        (scores_path, &ScoreCsvAdapter),
        (report_path.clone(), &RiskReportAdapter),
    ];
    for (path, writer) in outputs {
        if let Some(path) = path {
            if let Err(e) = writer.write(&result, &path.to_string_lossy()) {
                return fail(e);
            }
            eprintln!("Written: {}", path.display());
        }
    }

    for order in result.orders() {
        let price = match order.price {
            OrderPrice::Market { .. } => "MARKET".to_string(),
            OrderPrice::Limit(p) => format!("{p}"),
        };
        println!(
            "{} {} L{} {} x {} (score {:+.2})",
            order.side, order.symbol, order.level, price, order.quantity, order.score
        );
    }
    if report_path.is_none() {
        eprint!("\n{}", risk_report_adapter::render(&result));
    }

    ExitCode::SUCCESS
}

fn run_score(config_path: &Path, data_dir: &Path, as_of: Option<NaiveDate>) -> ExitCode {
    let result = match execute(config_path, data_dir, as_of, None) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    println!(
        "{:<8} {:>7} {:>10} {:>9} {:>9} {:>6}",
        "symbol", "score", "close", "return%", "excess%", "osc"
    );
    let mut scores = result.scores.scores.clone();
    scores.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.symbol.cmp(&b.symbol)));
    for s in &scores {
        let pct = |v: Option<f64>| {
            v.map(|x| format!("{:+.2}", x * 100.0))
                .unwrap_or_else(|| "-".into())
        };
        println!(
            "{:<8} {:>+7.2} {:>10.2} {:>9} {:>9} {:>6}",
            s.symbol,
            s.value,
            s.close,
            pct(s.period_return),
            pct(s.excess_return),
            s.oscillator
                .map(|o| format!("{o:.1}"))
                .unwrap_or_else(|| "-".into())
        );
    }
    eprintln!(
        "\n{} scored on {} (benchmark {}), {} skipped",
        scores.len(),
        result.as_of,
        result.benchmark_symbol,
        result.skipped.len()
    );
    for skip in &result.skipped {
        eprintln!("  skipped {}: {}", skip.symbol, skip.reason);
    }

    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let config = match build_config(&adapter, None) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let levels: Vec<String> = config
        .price_levels
        .iter()
        .map(|l| {
            if l.is_market {
                "market".to_string()
            } else {
                format!("{}", l.offset)
            }
        })
        .collect();
    let (low, high) = config.profile.bounds(config.ema_periods.len());

    eprintln!("Model:");
    eprintln!("  total budget:      {:.2}", config.total_budget);
    eprintln!("  side budget:       {:.2}", config.side_budget());
    eprintln!("  per-instrument:    {:.2}", config.position_target());
    eprintln!("  max per side:      {}", config.max_position_per_side);
    eprintln!("Execution:");
    eprintln!(
        "  lots:              {} (<= {}), {} above",
        config.lot_size_normal, config.price_break, config.lot_size_expensive
    );
    eprintln!("  levels:            {}", levels.join(", "));
    eprintln!("Scoring:");
    eprintln!("  profile:           {}", config.profile.name);
    eprintln!("  score range:       [{low}, {high}]");
    eprintln!(
        "  EMA periods:       {}",
        config
            .ema_periods
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!(
        "  oscillator:        {} bars, {}/{}",
        config.oscillator_period, config.profile.oversold, config.profile.overbought
    );
    eprintln!("Universe:");
    eprintln!(
        "  benchmark:         {}",
        config.benchmark.as_deref().unwrap_or("(not set)")
    );
    eprintln!(
        "  symbols:           {}",
        config
            .symbols
            .as_ref()
            .map(|s| s.join(", "))
            .unwrap_or_else(|| "(all in data directory)".into())
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let provider = CsvAdapter::new(data_dir.to_path_buf());
    match provider.list_symbols() {
        Ok(symbols) => {
            if symbols.is_empty() {
                eprintln!("No symbols found in {}", data_dir.display());
            }
            for symbol in &symbols {
                println!("{}", symbol);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

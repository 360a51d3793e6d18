//! CLI orchestration tests against real INI and CSV files on disk.
//!
//! Tests cover:
//! - Config loading and validation (load_config, build_config)
//! - Universe resolution (resolve_symbols)
//! - The shared execute stages over a CSV data directory
//! - `run`, `score`, `validate` and `list-symbols` dispatch and exit codes
//! - Output files written by the report adapters

mod common;

use clap::Parser;
use common::*;
use neutrader::adapters::file_config_adapter::FileConfigAdapter;
use neutrader::cli::{self, Cli};
use neutrader::domain::error::NeutraderError;
use neutrader::domain::pipeline::RunFlag;
use neutrader::domain::universe::SkipReason;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn code_of(code: ExitCode) -> String {
    format!("{:?}", code)
}

fn assert_success(code: ExitCode) {
    assert_eq!(code_of(code), code_of(ExitCode::SUCCESS));
}

fn assert_exit(code: ExitCode, expected: u8) {
    assert_eq!(code_of(code), code_of(ExitCode::from(expected)));
}

const VALID_INI: &str = r#"
[model]
total_budget = 100000
max_position_per_side = 15
lookback_days = 60
max_exposure_fraction = 0.30
target_exposure_per_position = 15000

[execution]
lot_size_normal = 100
lot_size_expensive = 10
price_break = 50
price_precision = 2
price_levels = market, 0.005, 0.01, 0.015

[indicators]
ema_periods = 3, 5, 10, 15, 20
oscillator_period = 10
overbought = 70
oversold = 30

[scoring]
profile = averaged

[selection]
dynamic_margin = 0.5
buy_quality_threshold = 1.5
sell_quality_threshold = -1.5

[universe]
benchmark = ibov
symbols = PETR4, VALE3, ITUB4, BBDC4, WEGE3
"#;

/// Data directory with every series from the sample provider.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let provider = sample_provider();
    for (symbol, bars) in &provider.data {
        write_csv(dir.path(), symbol, bars);
    }
    dir
}

fn path(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

mod config_loading {
    use super::*;

    #[test]
    fn build_config_reads_every_section() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        let config = cli::build_config(&adapter, None).unwrap();

        assert_eq!(config.total_budget, 100_000.0);
        assert_eq!(config.price_levels.len(), 4);
        assert!(config.price_levels[0].is_market);
        assert_eq!(config.ema_periods, vec![3, 5, 10, 15, 20]);
        assert_eq!(config.benchmark.as_deref(), Some("IBOV"));
        assert_eq!(config.symbols.as_ref().unwrap().len(), 5);
    }

    #[test]
    fn budget_override_applies_before_validation() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();

        let config = cli::build_config(&adapter, Some(250_000.0)).unwrap();
        assert_eq!(config.side_budget(), 125_000.0);

        let err = cli::build_config(&adapter, Some(-1.0)).unwrap_err();
        assert!(matches!(err, NeutraderError::ConfigInvalid { ref key, .. } if key == "total_budget"));
    }

    #[test]
    fn missing_file_is_config_parse_error() {
        let err = cli::load_config(Path::new("/nonexistent/neutrader.ini")).unwrap_err();
        assert!(matches!(err, NeutraderError::ConfigParse { .. }));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let ini = VALID_INI.replace("oversold = 30", "oversold = 80");
        let file = write_temp_ini(&ini);
        let adapter = cli::load_config(file.path()).unwrap();
        let err = cli::build_config(&adapter, None).unwrap_err();
        assert!(matches!(err, NeutraderError::ConfigInvalid { .. }));
    }
}

mod symbol_resolution {
    use super::*;

    fn config_from(ini: &str) -> neutrader::domain::config::TradingConfig {
        let adapter = FileConfigAdapter::from_string(ini).unwrap();
        cli::build_config(&adapter, None).unwrap()
    }

    #[test]
    fn configured_symbols_win() {
        let config = config_from("[universe]\nbenchmark = IBOV\nsymbols = petr4, vale3\n");
        let provider = sample_provider();
        let symbols = cli::resolve_symbols(&config, "IBOV", &provider).unwrap();
        assert_eq!(symbols, vec!["PETR4", "VALE3"]);
    }

    #[test]
    fn falls_back_to_provider_without_benchmark() {
        let config = config_from("[universe]\nbenchmark = IBOV\n");
        let provider = sample_provider();
        let symbols = cli::resolve_symbols(&config, "IBOV", &provider).unwrap();
        assert_eq!(symbols, vec!["BBDC4", "ITUB4", "PETR4", "VALE3", "WEGE3"]);
    }

    #[test]
    fn benchmark_in_symbol_list_is_dropped() {
        let config = config_from("[universe]\nbenchmark = IBOV\nsymbols = IBOV, PETR4\n");
        let provider = sample_provider();
        let symbols = cli::resolve_symbols(&config, "IBOV", &provider).unwrap();
        assert_eq!(symbols, vec!["PETR4"]);
    }
}

mod execute_stages {
    use super::*;

    #[test]
    fn execute_runs_full_pipeline_from_disk() {
        let file = write_temp_ini(VALID_INI);
        let data = data_dir();

        let result = cli::execute(
            file.path(),
            data.path(),
            Some(last_date()),
            None,
        )
        .unwrap();

        assert_eq!(result.as_of, last_date());
        assert_eq!(result.allocation.buys.len(), 2);
        assert_eq!(result.allocation.sells.len(), 2);
        assert!(result.flags.is_empty());
    }

    #[test]
    fn loader_skips_come_first() {
        let ini = VALID_INI.replace(
            "symbols = PETR4, VALE3, ITUB4, BBDC4, WEGE3",
            "symbols = PETR4, VALE3, ITUB4, BBDC4, WEGE3, GONE3",
        );
        let file = write_temp_ini(&ini);
        let data = data_dir();

        let result = cli::execute(
            file.path(),
            data.path(),
            Some(last_date()),
            None,
        )
        .unwrap();

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].symbol, "GONE3");
        assert!(matches!(result.skipped[0].reason, SkipReason::FetchFailed { .. }));
        assert_eq!(result.allocation.buys.len(), 2);
    }

    #[test]
    fn missing_benchmark_file_is_flagged_not_fatal() {
        let ini = VALID_INI.replace("benchmark = ibov", "benchmark = BVSP");
        let file = write_temp_ini(&ini);
        let data = data_dir();

        let result = cli::execute(
            file.path(),
            data.path(),
            Some(last_date()),
            None,
        )
        .unwrap();

        assert!(result.orders().is_empty());
        assert!(result.has_flag(&RunFlag::MissingBenchmarkData {
            symbol: "BVSP".into()
        }));
    }

    #[test]
    fn missing_benchmark_key_is_config_error() {
        let file = write_temp_ini("[universe]\nsymbols = PETR4\n");
        let data = data_dir();
        let err = cli::execute(
            file.path(),
            data.path(),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, NeutraderError::ConfigMissing { ref key, .. } if key == "benchmark"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn run_writes_all_outputs() {
        let file = write_temp_ini(VALID_INI);
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let orders = out.path().join("orders.csv");
        let scores = out.path().join("scores.csv");
        let report = out.path().join("nested").join("risk.txt");

        let cli = Cli::try_parse_from([
            "neutrader",
            "run",
            "--config",
            &path(file.path()),
            "--data",
            &path(data.path()),
            "--as-of",
            "2024-03-26",
            "--orders",
            &path(&orders),
            "--scores",
            &path(&scores),
            "--report",
            &path(&report),
        ])
        .unwrap();
        assert_success(cli::run(cli));

        let orders_csv = fs::read_to_string(&orders).unwrap();
        let mut lines = orders_csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,symbol,side,level,type,price,quantity,exposure,score"
        );
        // four levels for each of four positions
        assert_eq!(lines.count(), 16);

        let scores_csv = fs::read_to_string(&scores).unwrap();
        assert_eq!(scores_csv.lines().count(), 6);
        assert!(scores_csv.contains("WEGE3"));

        let text = fs::read_to_string(&report).unwrap();
        assert!(text.starts_with("RISK REPORT 2024-03-26"));
        assert!(!text.contains("WARNING"));
    }

    #[test]
    fn score_command_succeeds() {
        let file = write_temp_ini(VALID_INI);
        let data = data_dir();
        let cli = Cli::try_parse_from([
            "neutrader",
            "score",
            "-c",
            &path(file.path()),
            "-d",
            &path(data.path()),
            "--as-of",
            "2024-03-26",
        ])
        .unwrap();
        assert_success(cli::run(cli));
    }

    #[test]
    fn validate_exit_codes() {
        let good = write_temp_ini(VALID_INI);
        let cli = Cli::try_parse_from(["neutrader", "validate", "-c", &path(good.path())]).unwrap();
        assert_success(cli::run(cli));

        let bad = write_temp_ini("[model]\ntotal_budget = lots\n");
        let cli = Cli::try_parse_from(["neutrader", "validate", "-c", &path(bad.path())]).unwrap();
        assert_exit(cli::run(cli), 2);
    }

    #[test]
    fn list_symbols_on_missing_dir_is_data_error() {
        let cli = Cli::try_parse_from(["neutrader", "list-symbols", "-d", "/nonexistent/bars"])
            .unwrap();
        assert_exit(cli::run(cli), 3);
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["neutrader", "validate", "-c", "x.ini", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn bad_as_of_is_rejected_by_parser() {
        let parsed = Cli::try_parse_from([
            "neutrader",
            "score",
            "-c",
            "x.ini",
            "-d",
            "data",
            "--as-of",
            "26/03/2024",
        ]);
        assert!(parsed.is_err());
    }
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::Backtest;
use crate::domain::config_validation::{
    parse_backtest_config, parse_sig_figs, unknown_keys, validate_backtest_config,
    validate_strategy_config, warn_unknown_keys,
};
use crate::domain::error::SectorlsError;
use crate::domain::metrics::{compute_statistics, MetricMap, METRIC_ORDER};
use crate::domain::strategy::{MomentumSectorLongShort, Strategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_FOLDER: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "sectorls", about = "Sector momentum long/short equity backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Log progress from the engine, not just warnings
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and print summary statistics
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Data folder, overrides [data] folder
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// CSV file for the return series, overrides [output] returns_csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Summarize a data folder
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
        } => run_backtest(&config, data.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

fn fail(err: SectorlsError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

/// Folder from the command line, then `[data] folder`, then `./data`.
pub fn resolve_data_folder(data_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    if let Some(path) = data_override {
        return path.to_path_buf();
    }
    config
        .get_string("data", "folder")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FOLDER))
}

pub fn resolve_output(output_override: Option<&Path>, config: &dyn ConfigPort) -> Option<PathBuf> {
    if let Some(path) = output_override {
        return Some(path.to_path_buf());
    }
    config
        .get_string("output", "returns_csv")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> ExitCode {
    match backtest_pipeline(config_path, data_override, output_override) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

fn backtest_pipeline(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
) -> Result<(), SectorlsError> {
    // Stage 1: Load and validate config before touching any data
    eprintln!("Loading config from {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    warn_unknown_keys(&adapter);
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    let bt_config = parse_backtest_config(&adapter)?;
    let sig_figs = parse_sig_figs(&adapter)?;

    // Stage 2: Build strategy
    let mut strategy = MomentumSectorLongShort::new();
    strategy.set_parameters(&adapter)?;
    eprintln!("Loading strategy: {}", strategy.name());

    // Stage 3: Load data
    let folder = resolve_data_folder(data_override, &adapter);
    eprintln!("Loading data from {}", folder.display());
    let data_port = CsvAdapter::load(&folder)?;
    let panel = data_port.get_prices()?;
    eprintln!(
        "  {} securities, {} dates",
        panel.security_count(),
        panel.date_count()
    );

    // Stage 4: Run backtest
    eprintln!(
        "Running backtest: {} rebalancing, window {}, {} bps",
        bt_config.trading_frequency, bt_config.window, bt_config.transaction_cost_bps
    );
    let mut backtest = Backtest::new(vec![Box::new(strategy)]);
    let returns = backtest.run_backtest(&panel, &bt_config)?;

    // Stage 5: Statistics to stdout
    let stats = compute_statistics(&returns.all(), sig_figs, bt_config.risk_free_rate);
    print!("{}", format_statistics(&stats));

    // Stage 6: Return series dump
    if let Some(output) = resolve_output(output_override, &adapter) {
        CsvReportAdapter::new().write(returns, &output)?;
        eprintln!("\nReturns written to: {}", output.display());
    }
    Ok(())
}

/// One block per series, metrics in display order.
pub fn format_statistics(stats: &BTreeMap<String, MetricMap>) -> String {
    let width = METRIC_ORDER.iter().map(|m| m.len()).max().unwrap_or(0) + 2;
    let mut out = String::new();
    for (name, metrics) in stats {
        let _ = writeln!(out, "\n=== {name} ===");
        for metric in METRIC_ORDER {
            if let Some(value) = metrics.get(metric) {
                let label = format!("{metric}:");
                let _ = writeln!(out, "{label:<width$}{value}");
            }
        }
    }
    out
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match parse_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let sig_figs = match parse_sig_figs(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let mut strategy = MomentumSectorLongShort::new();
    if let Err(e) = strategy.set_parameters(&adapter) {
        return fail(e);
    }

    let end = bt_config
        .end_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "end of data".to_string());
    let params = strategy.params();

    eprintln!("\nBacktest:");
    eprintln!("  period:          {} to {}", bt_config.start_date, end);
    eprintln!("  frequency:       {}", bt_config.trading_frequency);
    eprintln!("  window:          {} periods", bt_config.window);
    eprintln!("  cost:            {} bps", bt_config.transaction_cost_bps);
    eprintln!("  gross exposure:  {}", bt_config.gross_exposure);
    eprintln!("  risk-free rate:  {}", bt_config.risk_free_rate);
    eprintln!("  sig figs:        {}", sig_figs);

    eprintln!("\nStrategy: {}", strategy.name());
    eprintln!("  selection:       {:?}", params.selection);
    eprintln!("  momentum:        {:?}", params.measure);
    eprintln!("  aggregation:     {:?}", params.aggregation);
    eprintln!("  legs:            {:?}", params.legs);
    if params.invert_long || params.invert_short {
        eprintln!(
            "  inverted:        long {}, short {}",
            params.invert_long, params.invert_short
        );
    }

    let ignored = unknown_keys(&adapter);
    if !ignored.is_empty() {
        eprintln!("\nIgnored keys:");
        for (section, key) in &ignored {
            eprintln!("  [{section}] {key}");
        }
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(folder: &Path) -> ExitCode {
    let adapter = match CsvAdapter::load(folder) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };
    let panel = adapter.panel();
    let sectors = panel.sector_map();
    let sector_count = sectors
        .values()
        .collect::<std::collections::BTreeSet<_>>()
        .len();

    match (panel.first_date(), panel.last_date()) {
        (Some(first), Some(last)) => {
            println!("{} dates, {} to {}", panel.date_count(), first, last)
        }
        _ => println!("no dates"),
    }
    println!("{} securities in {} sectors", panel.security_count(), sector_count);

    let members: Vec<usize> = (0..panel.date_count())
        .map(|t| {
            (0..panel.security_count())
                .filter(|&s| panel.is_present(t, s))
                .count()
        })
        .collect();
    if let (Some(min), Some(max)) = (members.iter().min(), members.iter().max()) {
        println!("index members per date: {} to {}", min, max);
    }
    ExitCode::SUCCESS
}

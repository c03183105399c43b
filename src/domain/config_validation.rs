//! Configuration parsing and validation.
//!
//! Every key is read as a string and parsed strictly, so a malformed value
//! is a config error rather than a silent fallback to the default. All of
//! this runs before any data is loaded.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SectorlsError;
use crate::domain::frequency::TradingFrequency;
use crate::domain::signal::{MomentumParams, SectorSelection};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_SIG_FIGS: usize = 4;
const MAX_SIG_FIGS: usize = 15;

const KNOWN_KEYS: &[(&str, &[&str])] = &[
    ("data", &["folder"]),
    (
        "backtest",
        &[
            "start_date",
            "end_date",
            "transaction_cost_bps",
            "trading_frequency",
            "window",
            "gross_exposure",
            "risk_free_rate",
            "max_gap_days",
            "sig_figs",
        ],
    ),
    (
        "strategy",
        &[
            "name",
            "num_sectors",
            "sector_quantile",
            "momentum",
            "aggregation",
            "legs",
            "invert_long",
            "invert_short",
        ],
    ),
    ("output", &["returns_csv"]),
];

/// Keys in known sections that nothing reads, as `(section, key)`.
pub fn unknown_keys(config: &dyn ConfigPort) -> Vec<(String, String)> {
    KNOWN_KEYS
        .iter()
        .flat_map(|(section, known)| {
            config
                .keys(section)
                .into_iter()
                .filter(|key| !known.contains(&key.as_str()))
                .map(|key| (section.to_string(), key))
        })
        .collect()
}

/// Logs a warning per unrecognized key.
pub fn warn_unknown_keys(config: &dyn ConfigPort) {
    for (section, key) in unknown_keys(config) {
        tracing::warn!(section = %section, key = %key, "unrecognized config key is ignored");
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SectorlsError> {
    parse_backtest_config(config)?;
    parse_sig_figs(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SectorlsError> {
    parse_strategy_params(config).map(|_| ())
}

/// Builds the `[backtest]` section into a validated config.
pub fn parse_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SectorlsError> {
    let defaults = BacktestConfig::default();

    let trading_frequency = parse_optional::<TradingFrequency>(
        config,
        "backtest",
        "trading_frequency",
        "one of D, W, 2W, M",
    )?
    .unwrap_or(defaults.trading_frequency);

    let start_date = match config.get_string("backtest", "start_date") {
        Some(s) if !s.trim().is_empty() => parse_date(&s, "start_date")?,
        _ => {
            return Err(SectorlsError::ConfigMissing {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
            });
        }
    };
    let end_date = match config.get_string("backtest", "end_date") {
        Some(s) if !s.trim().is_empty() => Some(parse_date(&s, "end_date")?),
        _ => None,
    };

    let parsed = BacktestConfig {
        transaction_cost_bps: parse_optional(
            config,
            "backtest",
            "transaction_cost_bps",
            "a number of basis points",
        )?
        .unwrap_or(defaults.transaction_cost_bps),
        trading_frequency,
        start_date,
        end_date,
        window: parse_optional(config, "backtest", "window", "a whole number of periods")?
            .unwrap_or_else(|| trading_frequency.default_window()),
        gross_exposure: parse_optional(config, "backtest", "gross_exposure", "a number")?
            .unwrap_or(defaults.gross_exposure),
        risk_free_rate: parse_optional(config, "backtest", "risk_free_rate", "a number")?
            .unwrap_or(defaults.risk_free_rate),
        max_gap_days: parse_optional(config, "backtest", "max_gap_days", "a whole number of days")?
            .unwrap_or(defaults.max_gap_days),
    };
    parsed.validate()?;
    Ok(parsed)
}

/// Significant figures used for the statistics table.
pub fn parse_sig_figs(config: &dyn ConfigPort) -> Result<usize, SectorlsError> {
    let value = parse_optional(config, "backtest", "sig_figs", "a whole number")?
        .unwrap_or(DEFAULT_SIG_FIGS);
    if !(1..=MAX_SIG_FIGS).contains(&value) {
        return Err(SectorlsError::config_invalid(
            "backtest",
            "sig_figs",
            format!("sig_figs must be between 1 and {MAX_SIG_FIGS}"),
        ));
    }
    Ok(value)
}

/// Builds the `[strategy]` section into momentum parameters.
pub fn parse_strategy_params(config: &dyn ConfigPort) -> Result<MomentumParams, SectorlsError> {
    let count: Option<usize> =
        parse_optional(config, "strategy", "num_sectors", "a whole number of sectors")?;
    let quantile: Option<f64> =
        parse_optional(config, "strategy", "sector_quantile", "a fraction")?;

    let selection = match (count, quantile) {
        (Some(_), Some(_)) => {
            return Err(SectorlsError::config_invalid(
                "strategy",
                "sector_quantile",
                "set either num_sectors or sector_quantile, not both",
            ));
        }
        (Some(0), None) => {
            return Err(SectorlsError::config_invalid(
                "strategy",
                "num_sectors",
                "num_sectors must be at least 1",
            ));
        }
        (Some(k), None) => SectorSelection::Count(k),
        (None, Some(q)) if !(q > 0.0 && q <= 0.5) => {
            return Err(SectorlsError::config_invalid(
                "strategy",
                "sector_quantile",
                "sector_quantile must be in (0, 0.5]",
            ));
        }
        (None, Some(q)) => SectorSelection::Quantile(q),
        (None, None) => SectorSelection::default(),
    };

    let defaults = MomentumParams::default();
    Ok(MomentumParams {
        selection,
        measure: parse_optional(config, "strategy", "momentum", "mean or cumulative")?
            .unwrap_or(defaults.measure),
        aggregation: parse_optional(config, "strategy", "aggregation", "mean or median")?
            .unwrap_or(defaults.aggregation),
        legs: parse_optional(config, "strategy", "legs", "one of L, S, LS, ALL")?
            .unwrap_or(defaults.legs),
        invert_long: parse_flag(config, "strategy", "invert_long")?.unwrap_or(defaults.invert_long),
        invert_short: parse_flag(config, "strategy", "invert_short")?
            .unwrap_or(defaults.invert_short),
    })
}

/// Boolean keys accept true/false, yes/no and 1/0.
fn parse_flag(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<bool>, SectorlsError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "true" | "yes" | "1" => Ok(Some(true)),
        "false" | "no" | "0" => Ok(Some(false)),
        other => Err(SectorlsError::config_invalid(
            section,
            key,
            format!("expected true or false, got '{other}'"),
        )),
    }
}

fn parse_optional<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, SectorlsError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(|e| {
        SectorlsError::config_invalid(section, key, format!("expected {expected}, got '{raw}' ({e})"))
    })
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, SectorlsError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        SectorlsError::config_invalid(
            "backtest",
            field,
            format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}

//! Performance statistics over return series.

use crate::domain::frequency::TradingFrequency;
use crate::domain::series::StrategyResults;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

pub const TOTAL_RETURN: &str = "Total Return (%)";
pub const ANNUALIZED_RETURN: &str = "Annualized Return (%)";
pub const ANNUALIZED_VOLATILITY: &str = "Annualized Volatility (%)";
pub const SHARPE_RATIO: &str = "Annualized Sharpe Ratio";
pub const SKEWNESS: &str = "Skewness";
pub const MAX_DRAWDOWN: &str = "Max Drawdown (%)";
pub const AVERAGE_TURNOVER: &str = "Average Turnover (%)";

/// Display order of the metric columns.
pub const METRIC_ORDER: [&str; 7] = [
    TOTAL_RETURN,
    ANNUALIZED_RETURN,
    ANNUALIZED_VOLATILITY,
    SHARPE_RATIO,
    SKEWNESS,
    MAX_DRAWDOWN,
    AVERAGE_TURNOVER,
];

/// Standard deviations below this are treated as zero.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

pub type MetricMap = BTreeMap<&'static str, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub periods: usize,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub skewness: f64,
    /// Worst peak-to-trough loss as a non-positive fraction.
    pub max_drawdown: f64,
    pub average_turnover: Option<f64>,
}

impl Statistics {
    pub fn compute(
        returns: &[f64],
        turnover: Option<&[f64]>,
        frequency: TradingFrequency,
        risk_free_rate: f64,
    ) -> Self {
        let periods_per_year = frequency.periods_per_year() as f64;
        let n = returns.len();

        let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
        let total_return = growth - 1.0;

        let annualized_return = if n == 0 {
            0.0
        } else if growth <= 0.0 {
            -1.0
        } else {
            growth.powf(periods_per_year / n as f64) - 1.0
        };

        let annualized_volatility = sample_std(returns) * periods_per_year.sqrt();

        let sharpe_ratio = if annualized_volatility > MIN_STD_THRESHOLD && annualized_volatility.is_finite() {
            (annualized_return - risk_free_rate) / annualized_volatility
        } else {
            f64::NAN
        };

        let average_turnover = turnover.map(|t| {
            if t.is_empty() {
                0.0
            } else {
                t.iter().sum::<f64>() / t.len() as f64
            }
        });

        Statistics {
            periods: n,
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            skewness: skewness(returns),
            max_drawdown: max_drawdown(returns),
            average_turnover,
        }
    }

    /// Presentation values: percentages scaled by 100, rounded to `sig_figs`.
    pub fn to_map(&self, sig_figs: usize) -> MetricMap {
        let mut map = MetricMap::new();
        map.insert(TOTAL_RETURN, round_sig(self.total_return * 100.0, sig_figs));
        map.insert(
            ANNUALIZED_RETURN,
            round_sig(self.annualized_return * 100.0, sig_figs),
        );
        map.insert(
            ANNUALIZED_VOLATILITY,
            round_sig(self.annualized_volatility * 100.0, sig_figs),
        );
        map.insert(SHARPE_RATIO, round_sig(self.sharpe_ratio, sig_figs));
        map.insert(SKEWNESS, round_sig(self.skewness, sig_figs));
        map.insert(MAX_DRAWDOWN, round_sig(self.max_drawdown * 100.0, sig_figs));
        if let Some(t) = self.average_turnover {
            map.insert(AVERAGE_TURNOVER, round_sig(t * 100.0, sig_figs));
        }
        map
    }
}

/// Statistics for every series, restricted to the dates all series share.
pub fn compute_statistics(
    series: &BTreeMap<String, StrategyResults>,
    sig_figs: usize,
    risk_free_rate: f64,
) -> BTreeMap<String, MetricMap> {
    let common = common_dates(series.values());
    series
        .iter()
        .map(|(name, results)| {
            let aligned = results.restrict_to(&common);
            let stats = Statistics::compute(
                &aligned.returns.values(),
                Some(&aligned.turnover.values()),
                aligned.trading_frequency,
                risk_free_rate,
            );
            (name.clone(), stats.to_map(sig_figs))
        })
        .collect()
}

fn common_dates<'a>(
    mut series: impl Iterator<Item = &'a StrategyResults>,
) -> BTreeSet<NaiveDate> {
    let Some(first) = series.next() else {
        return BTreeSet::new();
    };
    let mut common: BTreeSet<NaiveDate> = first.returns.dates().collect();
    for results in series {
        let dates: BTreeSet<NaiveDate> = results.returns.dates().collect();
        common.retain(|d| dates.contains(d));
    }
    common
}

/// Round to `sig_figs` significant figures. Zero and non-finite values pass through.
pub fn round_sig(value: f64, sig_figs: usize) -> f64 {
    if value == 0.0 || !value.is_finite() || sig_figs == 0 {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let exponent = sig_figs as i32 - 1 - magnitude;
    if exponent >= 0 {
        let factor = 10f64.powi(exponent);
        (value * factor).round() / factor
    } else {
        let factor = 10f64.powi(-exponent);
        (value / factor).round() * factor
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Population (biased) skewness.
fn skewness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    if m2.sqrt() < MIN_STD_THRESHOLD {
        return f64::NAN;
    }
    m3 / m2.powf(1.5)
}

/// Worst drawdown of the compounded wealth path, starting from 1.0.
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut wealth = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in returns {
        wealth *= 1.0 + r;
        if wealth > peak {
            peak = wealth;
        } else if peak > 0.0 {
            worst = worst.min((wealth - peak) / peak);
        }
    }
    worst
}

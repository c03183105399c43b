//! Equal-weighted index benchmark and calendar alignment.

use crate::domain::backtest::BacktestConfig;
use crate::domain::engine::calculate_returns_resampled;
use crate::domain::error::SectorlsError;
use crate::domain::panel::SecurityPanel;
use crate::domain::series::StrategyResults;
use crate::domain::weights::WeightVector;
use chrono::NaiveDate;
use std::collections::BTreeSet;

pub const BENCHMARK_NAME: &str = "Benchmark";

/// Equal weights over the index members of every period end.
pub fn benchmark_weights(resampled: &SecurityPanel) -> Vec<WeightVector> {
    let columns = resampled.columns();
    resampled
        .dates()
        .iter()
        .enumerate()
        .filter_map(|(t, &date)| {
            let members: Vec<usize> = (0..columns.len())
                .filter(|&s| resampled.is_present(t, s))
                .collect();
            if members.is_empty() {
                return None;
            }
            let weight = 1.0 / members.len() as f64;
            let mut wv = WeightVector::new(date);
            for s in members {
                wv.set(&columns[s].id, weight);
            }
            Some(wv)
        })
        .collect()
}

/// Benchmark returns on the trading calendar, paying the same costs as a strategy.
pub fn get_benchmark_returns(
    panel: &SecurityPanel,
    config: &BacktestConfig,
) -> Result<StrategyResults, SectorlsError> {
    let resampled = panel.resample(config.trading_frequency);
    let weights = benchmark_weights(&resampled);
    let (returns, turnover) = calculate_returns_resampled(&weights, &resampled, config)?;
    Ok(StrategyResults {
        returns,
        turnover,
        trading_frequency: config.trading_frequency,
    })
}

/// A strategy and the benchmark restricted to their shared dates.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedReturns {
    pub strategy: StrategyResults,
    pub benchmark: StrategyResults,
}

impl AlignedReturns {
    pub fn len(&self) -> usize {
        self.strategy.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategy.returns.is_empty()
    }
}

/// Inner join on return dates. Zero overlap is an error.
pub fn align(
    name: &str,
    strategy: &StrategyResults,
    benchmark: &StrategyResults,
) -> Result<AlignedReturns, SectorlsError> {
    let benchmark_dates: BTreeSet<NaiveDate> = benchmark.returns.dates().collect();
    let common: BTreeSet<NaiveDate> = strategy
        .returns
        .dates()
        .filter(|d| benchmark_dates.contains(d))
        .collect();

    if common.is_empty() {
        return Err(SectorlsError::Alignment {
            strategy: name.to_string(),
        });
    }

    Ok(AlignedReturns {
        strategy: strategy.restrict_to(&common),
        benchmark: benchmark.restrict_to(&common),
    })
}

//! Backtest configuration and orchestration.
//!
//! [`Backtest`] runs every strategy and the benchmark against one panel and
//! one immutable [`BacktestConfig`], then aligns each strategy leg with the
//! benchmark calendar.

use crate::domain::benchmark::{align, get_benchmark_returns, AlignedReturns, BENCHMARK_NAME};
use crate::domain::error::SectorlsError;
use crate::domain::frequency::TradingFrequency;
use crate::domain::panel::SecurityPanel;
use crate::domain::series::StrategyResults;
use crate::domain::strategy::Strategy;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const DEFAULT_MAX_GAP_DAYS: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub transaction_cost_bps: f64,
    pub trading_frequency: TradingFrequency,
    pub start_date: NaiveDate,
    /// Defaults to the last date in the panel.
    pub end_date: Option<NaiveDate>,
    /// Momentum lookback in resampled periods.
    pub window: usize,
    /// Cap on the sum of absolute weights.
    pub gross_exposure: f64,
    pub risk_free_rate: f64,
    /// Largest tolerated calendar gap between consecutive panel dates.
    pub max_gap_days: i64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            transaction_cost_bps: 0.0,
            trading_frequency: TradingFrequency::Monthly,
            start_date: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or_default(),
            end_date: None,
            window: TradingFrequency::Monthly.default_window(),
            gross_exposure: 1.0,
            risk_free_rate: 0.0,
            max_gap_days: DEFAULT_MAX_GAP_DAYS,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), SectorlsError> {
        if !self.transaction_cost_bps.is_finite() || self.transaction_cost_bps < 0.0 {
            return Err(SectorlsError::config_invalid(
                "backtest",
                "transaction_cost_bps",
                "transaction_cost_bps must be non-negative",
            ));
        }
        if let Some(end) = self.end_date
            && end < self.start_date
        {
            return Err(SectorlsError::config_invalid(
                "backtest",
                "end_date",
                "end_date must not be before start_date",
            ));
        }
        if self.window < 2 {
            return Err(SectorlsError::config_invalid(
                "backtest",
                "window",
                "window must be at least 2 periods",
            ));
        }
        // each sleeve carries gross / 2, which may sit on a single security
        if !(self.gross_exposure > 0.0 && self.gross_exposure <= 2.0) {
            return Err(SectorlsError::config_invalid(
                "backtest",
                "gross_exposure",
                "gross_exposure must be in (0, 2]",
            ));
        }
        if !(self.risk_free_rate > -1.0 && self.risk_free_rate < 1.0) {
            return Err(SectorlsError::config_invalid(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be an annual rate strictly between -1 and 1",
            ));
        }
        if self.max_gap_days < 1 {
            return Err(SectorlsError::config_invalid(
                "backtest",
                "max_gap_days",
                "max_gap_days must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Every series of a completed run, keyed by `"<strategy> - <leg>"`.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReturns {
    pub benchmark: StrategyResults,
    pub strategies: BTreeMap<String, StrategyResults>,
}

impl BacktestReturns {
    /// A strategy series and the benchmark on their shared dates.
    pub fn aligned(&self, key: &str) -> Result<AlignedReturns, SectorlsError> {
        let strategy = self.strategies.get(key).ok_or_else(|| SectorlsError::Alignment {
            strategy: key.to_string(),
        })?;
        align(key, strategy, &self.benchmark)
    }

    /// All series including the benchmark, for statistics and reporting.
    pub fn all(&self) -> BTreeMap<String, StrategyResults> {
        let mut all = self.strategies.clone();
        all.insert(BENCHMARK_NAME.to_string(), self.benchmark.clone());
        all
    }
}

pub struct Backtest {
    strategies: Vec<Box<dyn Strategy>>,
    returns: Option<BacktestReturns>,
}

impl Backtest {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self {
            strategies,
            returns: None,
        }
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Runs the benchmark and every strategy. Fails fast on invalid config,
    /// panel gaps, data integrity problems, or a strategy leg that shares no
    /// dates with the benchmark.
    pub fn run_backtest(
        &mut self,
        panel: &SecurityPanel,
        config: &BacktestConfig,
    ) -> Result<&BacktestReturns, SectorlsError> {
        self.returns = None;
        config.validate()?;
        panel.check_gaps(config.max_gap_days)?;

        let benchmark = get_benchmark_returns(panel, config)?;
        tracing::info!(periods = benchmark.returns.len(), "benchmark computed");

        let mut strategies = BTreeMap::new();
        for strategy in &mut self.strategies {
            strategy.generate_signals(panel, config)?;
            strategy.calculate_returns(panel, config)?;
            for (leg, results) in strategy.get_results() {
                let key = format!("{} - {}", strategy.name(), leg);
                let aligned = align(&key, results, &benchmark)?;
                tracing::info!(series = %key, periods = aligned.len(), "strategy leg aligned");
                strategies.insert(key, aligned.strategy);
            }
        }

        Ok(self.returns.insert(BacktestReturns {
            benchmark,
            strategies,
        }))
    }

    /// Returns of the last successful run.
    pub fn get_returns(&self) -> Option<&BacktestReturns> {
        self.returns.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        let c = BacktestConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.window, 11);
        assert_eq!(c.start_date, d(1980, 1, 1));
        assert!(c.end_date.is_none());
    }

    #[test]
    fn negative_cost_rejected() {
        let c = BacktestConfig {
            transaction_cost_bps: -1.0,
            ..BacktestConfig::default()
        };
        let err = c.validate().unwrap_err();
        assert!(matches!(err, SectorlsError::ConfigInvalid { ref key, .. } if key == "transaction_cost_bps"));
    }

    #[test]
    fn end_before_start_rejected() {
        let c = BacktestConfig {
            start_date: d(2020, 1, 1),
            end_date: Some(d(2019, 12, 31)),
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn window_below_two_rejected() {
        let c = BacktestConfig {
            window: 1,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn gross_exposure_bounds() {
        for bad in [0.0, -1.0, 2.5, f64::NAN] {
            let c = BacktestConfig {
                gross_exposure: bad,
                ..BacktestConfig::default()
            };
            assert!(c.validate().is_err(), "gross_exposure {bad} accepted");
        }
        let c = BacktestConfig {
            gross_exposure: 2.0,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn negative_risk_free_rate_is_valid() {
        let c = BacktestConfig {
            risk_free_rate: -0.005,
            ..BacktestConfig::default()
        };
        assert!(c.validate().is_ok());
        for bad in [-1.0, 1.0, f64::NAN] {
            let c = BacktestConfig {
                risk_free_rate: bad,
                ..BacktestConfig::default()
            };
            assert!(c.validate().is_err(), "risk_free_rate {bad} accepted");
        }
    }

    #[test]
    fn run_without_strategies_keeps_benchmark() {
        use crate::domain::panel::SecurityColumn;
        let panel = SecurityPanel::new(
            vec![d(2020, 1, 31), d(2020, 2, 29)],
            vec![SecurityColumn {
                id: "A".into(),
                sector: "X".into(),
                prices: vec![Some(10.0), Some(11.0)],
                presence: vec![true, true],
            }],
        )
        .unwrap();
        let config = BacktestConfig {
            max_gap_days: 31,
            ..BacktestConfig::default()
        };
        let mut backtest = Backtest::new(Vec::new());
        let returns = backtest.run_backtest(&panel, &config).unwrap();
        assert!(returns.strategies.is_empty());
        assert_eq!(returns.benchmark.returns.len(), 1);
        assert!(backtest.get_returns().is_some());
    }
}

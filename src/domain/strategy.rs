//! Strategy interface and the sector momentum long/short strategy.

use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::parse_strategy_params;
use crate::domain::engine::calculate_returns_resampled;
use crate::domain::error::SectorlsError;
use crate::domain::panel::SecurityPanel;
use crate::domain::series::StrategyResults;
use crate::domain::signal::{generate_signals_resampled, MomentumParams, SignalSet};
use crate::domain::weights::{Leg, WeightVector};
use crate::ports::config_port::ConfigPort;
use std::collections::BTreeMap;

pub const DEFAULT_STRATEGY_NAME: &str = "Momentum Sector Long-Short Strategy";

/// A pluggable strategy driven by the backtest orchestrator.
///
/// `generate_signals` must run before `calculate_returns`; both take the
/// same panel and config for one run.
pub trait Strategy {
    fn name(&self) -> &str;

    /// Replaces the strategy parameters and drops any cached results.
    fn set_parameters(&mut self, options: &dyn ConfigPort) -> Result<(), SectorlsError>;

    fn generate_signals(
        &mut self,
        panel: &SecurityPanel,
        config: &BacktestConfig,
    ) -> Result<(), SectorlsError>;

    fn calculate_returns(
        &mut self,
        panel: &SecurityPanel,
        config: &BacktestConfig,
    ) -> Result<(), SectorlsError>;

    /// Results per reported leg of the last `calculate_returns` call.
    fn get_results(&self) -> &BTreeMap<Leg, StrategyResults>;
}

/// Ranks sectors by trailing momentum, goes long the top sleeve and short
/// the bottom sleeve with equal weights inside each.
#[derive(Debug, Clone)]
pub struct MomentumSectorLongShort {
    name: String,
    params: MomentumParams,
    signals: Option<(BacktestConfig, SignalSet)>,
    results: BTreeMap<Leg, StrategyResults>,
}

impl MomentumSectorLongShort {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_STRATEGY_NAME, MomentumParams::default())
    }

    pub fn with_params(name: impl Into<String>, params: MomentumParams) -> Self {
        Self {
            name: name.into(),
            params,
            signals: None,
            results: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &MomentumParams {
        &self.params
    }

    /// Signals of the last `generate_signals` call.
    pub fn signals(&self) -> Option<&SignalSet> {
        self.signals.as_ref().map(|(_, s)| s)
    }

    fn clear_cache(&mut self) {
        self.signals = None;
        self.results.clear();
    }
}

impl Default for MomentumSectorLongShort {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for MomentumSectorLongShort {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_parameters(&mut self, options: &dyn ConfigPort) -> Result<(), SectorlsError> {
        let params = parse_strategy_params(options)?;
        if let Some(name) = options.get_string("strategy", "name") {
            let name = name.trim();
            if !name.is_empty() {
                self.name = name.to_string();
            }
        }
        self.params = params;
        self.clear_cache();
        Ok(())
    }

    fn generate_signals(
        &mut self,
        panel: &SecurityPanel,
        config: &BacktestConfig,
    ) -> Result<(), SectorlsError> {
        self.clear_cache();
        let resampled = panel.resample(config.trading_frequency);
        let signals = generate_signals_resampled(&resampled, config, &self.params)?;
        tracing::debug!(
            strategy = %self.name,
            rebalances = signals.weights.len(),
            skipped = signals.skipped.len(),
            "signals generated"
        );
        self.signals = Some((config.clone(), signals));
        Ok(())
    }

    fn calculate_returns(
        &mut self,
        panel: &SecurityPanel,
        config: &BacktestConfig,
    ) -> Result<(), SectorlsError> {
        let cached = matches!(&self.signals, Some((built_for, _)) if built_for == config);
        if !cached {
            self.generate_signals(panel, config)?;
        }
        let Some((_, signals)) = &self.signals else {
            return Ok(());
        };

        let resampled = panel.resample(config.trading_frequency);
        let mut results = BTreeMap::new();
        for leg in self.params.legs.legs() {
            let weights: Vec<WeightVector> = signals
                .weights
                .iter()
                .map(|wv| {
                    wv.leg(leg)
                        .inverted(self.params.invert_long, self.params.invert_short)
                })
                .collect();
            let (returns, turnover) = calculate_returns_resampled(&weights, &resampled, config)?;
            results.insert(
                leg,
                StrategyResults {
                    returns,
                    turnover,
                    trading_frequency: config.trading_frequency,
                },
            );
        }
        self.results = results;
        Ok(())
    }

    fn get_results(&self) -> &BTreeMap<Leg, StrategyResults> {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::frequency::TradingFrequency;
    use crate::domain::panel::SecurityColumn;
    use crate::domain::signal::SectorSelection;
    use crate::domain::weights::LegSelection;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn scenario_panel() -> SecurityPanel {
        let column = |id: &str, sector: &str, prices: [f64; 3]| SecurityColumn {
            id: id.into(),
            sector: sector.into(),
            prices: prices.iter().map(|p| Some(*p)).collect(),
            presence: vec![true; 3],
        };
        SecurityPanel::new(
            vec![d(2020, 1, 31), d(2020, 2, 29), d(2020, 3, 31)],
            vec![
                column("A1", "A", [100.0, 110.0, 99.0]),
                column("B1", "B", [100.0, 95.0, 105.0]),
            ],
        )
        .unwrap()
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            window: 2,
            start_date: d(2000, 1, 1),
            max_gap_days: 31,
            ..BacktestConfig::default()
        }
    }

    fn one_sector_each_side() -> MomentumSectorLongShort {
        MomentumSectorLongShort::with_params(
            "Momentum",
            MomentumParams {
                selection: SectorSelection::Count(1),
                ..MomentumParams::default()
            },
        )
    }

    #[test]
    fn reports_every_leg_by_default() {
        let mut strategy = one_sector_each_side();
        strategy.generate_signals(&scenario_panel(), &config()).unwrap();
        strategy.calculate_returns(&scenario_panel(), &config()).unwrap();

        let results = strategy.get_results();
        assert_eq!(
            results.keys().copied().collect::<Vec<_>>(),
            vec![Leg::Long, Leg::Short, Leg::Combined]
        );

        let combined = &results[&Leg::Combined];
        assert_eq!(combined.returns.len(), 1);
        assert_relative_eq!(
            combined.returns.values()[0],
            0.5 * -0.10 - 0.5 * (105.0 / 95.0 - 1.0),
            epsilon = 1e-12
        );

        let long = &results[&Leg::Long];
        let short = &results[&Leg::Short];
        assert_relative_eq!(
            long.returns.values()[0] + short.returns.values()[0],
            combined.returns.values()[0],
            epsilon = 1e-12
        );
        assert_eq!(combined.trading_frequency, TradingFrequency::Monthly);
    }

    #[test]
    fn calculate_returns_generates_missing_signals() {
        let mut strategy = one_sector_each_side();
        strategy.calculate_returns(&scenario_panel(), &config()).unwrap();
        assert!(strategy.signals().is_some());
        assert!(!strategy.get_results().is_empty());
    }

    #[test]
    fn set_parameters_clears_cache_and_renames() {
        let mut strategy = one_sector_each_side();
        strategy.calculate_returns(&scenario_panel(), &config()).unwrap();

        let options =
            FileConfigAdapter::from_string("[strategy]\nname = Narrow\nnum_sectors = 1\nlegs = LS\n")
                .unwrap();
        strategy.set_parameters(&options).unwrap();

        assert_eq!(strategy.name(), "Narrow");
        assert_eq!(strategy.params().legs, LegSelection::Combined);
        assert!(strategy.signals().is_none());
        assert!(strategy.get_results().is_empty());

        strategy.calculate_returns(&scenario_panel(), &config()).unwrap();
        assert_eq!(strategy.get_results().len(), 1);
    }

    #[test]
    fn invalid_parameters_leave_strategy_unchanged() {
        let mut strategy = one_sector_each_side();
        let options = FileConfigAdapter::from_string("[strategy]\nlegs = sideways\n").unwrap();
        assert!(strategy.set_parameters(&options).is_err());
        assert_eq!(strategy.name(), "Momentum");
    }

    #[test]
    fn changed_config_regenerates_signals() {
        let mut strategy = one_sector_each_side();
        strategy.generate_signals(&scenario_panel(), &config()).unwrap();
        let costly = BacktestConfig {
            transaction_cost_bps: 100.0,
            ..config()
        };
        strategy.calculate_returns(&scenario_panel(), &costly).unwrap();
        let combined = &strategy.get_results()[&Leg::Combined];
        // first rebalance trades from a flat book: turnover 1.0 at 100 bps
        assert_relative_eq!(
            combined.returns.values()[0],
            0.5 * -0.10 - 0.5 * (105.0 / 95.0 - 1.0) - 0.01,
            epsilon = 1e-12
        );
    }

    #[test]
    fn inverted_sleeves_negate_their_returns() {
        let mut plain = one_sector_each_side();
        plain.calculate_returns(&scenario_panel(), &config()).unwrap();

        let mut flipped = MomentumSectorLongShort::with_params(
            "Momentum",
            MomentumParams {
                selection: SectorSelection::Count(1),
                invert_long: true,
                invert_short: true,
                ..MomentumParams::default()
            },
        );
        flipped.calculate_returns(&scenario_panel(), &config()).unwrap();

        for leg in [Leg::Long, Leg::Short, Leg::Combined] {
            let a = plain.get_results()[&leg].returns.values()[0];
            let b = flipped.get_results()[&leg].returns.values()[0];
            assert_relative_eq!(a, -b, epsilon = 1e-12);
        }
        // signals themselves stay dollar-neutral
        let signals = flipped.signals().unwrap();
        assert!(signals.weights[0].net_exposure().abs() < 1e-12);
    }

    #[test]
    fn inverting_only_the_long_sleeve() {
        let mut strategy = MomentumSectorLongShort::with_params(
            "Momentum",
            MomentumParams {
                selection: SectorSelection::Count(1),
                invert_long: true,
                ..MomentumParams::default()
            },
        );
        strategy.calculate_returns(&scenario_panel(), &config()).unwrap();
        let results = strategy.get_results();
        // A was long at +10% momentum, now shorted: -0.5 x -10%
        assert_relative_eq!(results[&Leg::Long].returns.values()[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(
            results[&Leg::Short].returns.values()[0],
            -0.5 * (105.0 / 95.0 - 1.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            results[&Leg::Combined].returns.values()[0],
            0.05 - 0.5 * (105.0 / 95.0 - 1.0),
            epsilon = 1e-12
        );
    }

    /// Strategies other than sector momentum plug into the same trait.
    struct AlwaysLongFirst {
        results: BTreeMap<Leg, StrategyResults>,
    }

    impl Strategy for AlwaysLongFirst {
        fn name(&self) -> &str {
            "Always Long"
        }

        fn set_parameters(&mut self, _options: &dyn ConfigPort) -> Result<(), SectorlsError> {
            Ok(())
        }

        fn generate_signals(
            &mut self,
            _panel: &SecurityPanel,
            _config: &BacktestConfig,
        ) -> Result<(), SectorlsError> {
            Ok(())
        }

        fn calculate_returns(
            &mut self,
            panel: &SecurityPanel,
            config: &BacktestConfig,
        ) -> Result<(), SectorlsError> {
            let resampled = panel.resample(config.trading_frequency);
            let weights: Vec<WeightVector> = resampled
                .dates()
                .iter()
                .map(|&date| {
                    let mut wv = WeightVector::new(date);
                    wv.set(&resampled.columns()[0].id, 1.0);
                    wv
                })
                .collect();
            let (returns, turnover) = calculate_returns_resampled(&weights, &resampled, config)?;
            self.results.insert(
                Leg::Long,
                StrategyResults {
                    returns,
                    turnover,
                    trading_frequency: config.trading_frequency,
                },
            );
            Ok(())
        }

        fn get_results(&self) -> &BTreeMap<Leg, StrategyResults> {
            &self.results
        }
    }

    #[test]
    fn custom_strategy_runs_through_backtest() {
        use crate::domain::backtest::Backtest;

        let mut backtest = Backtest::new(vec![
            Box::new(AlwaysLongFirst {
                results: BTreeMap::new(),
            }),
            Box::new(one_sector_each_side()),
        ]);
        let returns = backtest.run_backtest(&scenario_panel(), &config()).unwrap();

        let always = &returns.strategies["Always Long - Long"];
        assert_relative_eq!(always.returns.values()[0], 0.10, epsilon = 1e-12);
        assert_eq!(returns.strategies.len(), 4);
        assert!(returns.strategies.contains_key("Momentum - Combined"));
    }
}

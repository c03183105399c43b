//! Cross-sectional sector momentum signals.
//!
//! Look-ahead policy: the weights set at rebalance date T (a resampled
//! period end) are scored from the `window - 1` sector returns ending at T,
//! i.e. the `window` most recent price observations up to and including T.
//! All of them are realized by T's close. Those weights then earn the return
//! over (T, T+1], so the period being traded never feeds its own signal.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SectorlsError;
use crate::domain::frequency::TradingFrequency;
use crate::domain::panel::SecurityPanel;
use crate::domain::weights::{LegSelection, WeightVector};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::str::FromStr;

/// How many sectors go into each sleeve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectorSelection {
    /// Fixed number of sectors per sleeve.
    Count(usize),
    /// Fraction of the scored sectors per sleeve, at least one.
    Quantile(f64),
}

impl SectorSelection {
    /// Sleeve size for `available` scored sectors; never more than half.
    pub fn sleeve_size(self, available: usize) -> usize {
        let requested = match self {
            SectorSelection::Count(k) => k,
            SectorSelection::Quantile(q) => ((available as f64 * q).floor() as usize).max(1),
        };
        requested.min(available / 2)
    }
}

impl Default for SectorSelection {
    fn default() -> Self {
        SectorSelection::Quantile(0.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MomentumMeasure {
    /// Arithmetic mean of the trailing sector returns.
    #[default]
    Mean,
    /// Compounded trailing sector return.
    Cumulative,
}

impl MomentumMeasure {
    fn score(self, returns: &[f64]) -> f64 {
        match self {
            MomentumMeasure::Mean => returns.iter().sum::<f64>() / returns.len() as f64,
            MomentumMeasure::Cumulative => returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0,
        }
    }
}

impl FromStr for MomentumMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(MomentumMeasure::Mean),
            "cumulative" => Ok(MomentumMeasure::Cumulative),
            other => Err(format!("unknown momentum measure '{other}', expected mean or cumulative")),
        }
    }
}

/// How constituent returns combine into a sector return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorAggregation {
    #[default]
    Mean,
    Median,
}

impl SectorAggregation {
    fn aggregate(self, values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            SectorAggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            SectorAggregation::Median => {
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    Some((values[mid - 1] + values[mid]) / 2.0)
                } else {
                    Some(values[mid])
                }
            }
        }
    }
}

impl FromStr for SectorAggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" => Ok(SectorAggregation::Mean),
            "median" => Ok(SectorAggregation::Median),
            other => Err(format!("unknown sector aggregation '{other}', expected mean or median")),
        }
    }
}

/// Parameters of the sector momentum long/short strategy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MomentumParams {
    pub selection: SectorSelection,
    pub measure: MomentumMeasure,
    pub aggregation: SectorAggregation,
    pub legs: LegSelection,
    /// Trade the long sleeve short. Breaks dollar neutrality of priced legs.
    pub invert_long: bool,
    /// Trade the short sleeve long. Breaks dollar neutrality of priced legs.
    pub invert_short: bool,
}

/// Weight vectors for every rebalance date that produced a signal. These are
/// always the dollar-neutral ranking book; sleeve inversion is applied when
/// a leg is priced.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSet {
    pub trading_frequency: TradingFrequency,
    pub weights: Vec<WeightVector>,
    /// In-range period ends without a signal.
    pub skipped: Vec<NaiveDate>,
}

/// Sector return series on a resampled calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorReturns {
    pub sectors: Vec<String>,
    /// Security indices per sector, in panel order.
    pub members: Vec<Vec<usize>>,
    /// `returns[sector][t]` is the return over (t - 1, t].
    pub returns: Vec<Vec<Option<f64>>>,
}

impl SectorReturns {
    /// A constituent counts toward period t only if it was in the index at t - 1.
    pub fn compute(panel: &SecurityPanel, aggregation: SectorAggregation) -> Self {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, column) in panel.columns().iter().enumerate() {
            groups.entry(column.sector.as_str()).or_default().push(idx);
        }

        let n = panel.date_count();
        let mut sectors = Vec::with_capacity(groups.len());
        let mut members = Vec::with_capacity(groups.len());
        let mut returns = Vec::with_capacity(groups.len());

        for (sector, securities) in groups {
            let mut series = vec![None; n];
            let mut buf = Vec::with_capacity(securities.len());
            for (t, slot) in series.iter_mut().enumerate().skip(1) {
                buf.clear();
                buf.extend(
                    securities
                        .iter()
                        .filter(|&&s| panel.is_present(t - 1, s))
                        .filter_map(|&s| panel.period_return(t, s)),
                );
                *slot = aggregation.aggregate(&mut buf);
            }
            sectors.push(sector.to_string());
            members.push(securities);
            returns.push(series);
        }

        Self {
            sectors,
            members,
            returns,
        }
    }

    /// Momentum of every sector at period `t` over `window - 1` trailing
    /// returns ending at `t`. `None` where any of them is undefined.
    pub fn scores_at(&self, t: usize, window: usize, measure: MomentumMeasure) -> Vec<Option<f64>> {
        if window < 2 || t + 1 < window {
            return vec![None; self.sectors.len()];
        }
        let from = t + 2 - window;
        self.returns
            .iter()
            .map(|series| {
                let trailing: Option<Vec<f64>> = series[from..=t].iter().copied().collect();
                trailing.map(|r| measure.score(&r))
            })
            .collect()
    }
}

/// Sector momentum long/short weights for every in-range rebalance date.
pub fn generate_signals(
    panel: &SecurityPanel,
    config: &BacktestConfig,
    params: &MomentumParams,
) -> Result<SignalSet, SectorlsError> {
    let resampled = panel.resample(config.trading_frequency);
    generate_signals_resampled(&resampled, config, params)
}

pub(crate) fn generate_signals_resampled(
    resampled: &SecurityPanel,
    config: &BacktestConfig,
    params: &MomentumParams,
) -> Result<SignalSet, SectorlsError> {
    let sector_returns = SectorReturns::compute(resampled, params.aggregation);
    let end = config.end_date.or(resampled.last_date());

    let mut weights = Vec::new();
    let mut skipped = Vec::new();
    let mut short_history = 0usize;

    for (t, &date) in resampled.dates().iter().enumerate() {
        if date < config.start_date || end.is_some_and(|e| date > e) {
            continue;
        }
        if t + 1 < config.window {
            short_history += 1;
            skipped.push(date);
            continue;
        }
        match weights_at(resampled, &sector_returns, t, config, params) {
            Some(wv) => weights.push(wv),
            None => skipped.push(date),
        }
    }

    if weights.is_empty() {
        return Err(SectorlsError::InsufficientHistory {
            periods: resampled.date_count(),
            window: config.window,
        });
    }

    if short_history > 0 {
        tracing::warn!(
            skipped = short_history,
            window = config.window,
            "rebalance dates with fewer than window periods of history produce no signal"
        );
    }
    if skipped.len() > short_history {
        tracing::warn!(
            skipped = skipped.len() - short_history,
            "rebalance dates with fewer than two scorable sectors produce no signal"
        );
    }

    Ok(SignalSet {
        trading_frequency: config.trading_frequency,
        weights,
        skipped,
    })
}

fn weights_at(
    panel: &SecurityPanel,
    sector_returns: &SectorReturns,
    t: usize,
    config: &BacktestConfig,
    params: &MomentumParams,
) -> Option<WeightVector> {
    let scores = sector_returns.scores_at(t, config.window, params.measure);

    // (sector index, score, members in the index at t)
    let mut ranked: Vec<(usize, f64, Vec<usize>)> = scores
        .iter()
        .enumerate()
        .filter_map(|(i, score)| {
            let score = (*score)?;
            let present: Vec<usize> = sector_returns.members[i]
                .iter()
                .copied()
                .filter(|&s| panel.is_present(t, s))
                .collect();
            (!present.is_empty()).then_some((i, score, present))
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| sector_returns.sectors[a.0].cmp(&sector_returns.sectors[b.0]))
    });

    let k = params.selection.sleeve_size(ranked.len());
    if k == 0 {
        return None;
    }

    let sleeve_weight = config.gross_exposure / 2.0 / k as f64;
    let mut wv = WeightVector::new(panel.dates()[t]);
    let columns = panel.columns();

    for (sector, _, present) in &ranked[..k] {
        let per_security = sleeve_weight / present.len() as f64;
        for &s in present {
            wv.set(&columns[s].id, per_security);
        }
        wv.long_sectors.push(sector_returns.sectors[*sector].clone());
    }
    for (sector, _, present) in ranked[ranked.len() - k..].iter().rev() {
        let per_security = -sleeve_weight / present.len() as f64;
        for &s in present {
            wv.set(&columns[s].id, per_security);
        }
        wv.short_sectors.push(sector_returns.sectors[*sector].clone());
    }

    Some(wv)
}

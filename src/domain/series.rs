//! Date-indexed series produced by a backtest.

use crate::domain::error::SectorlsError;
use crate::domain::frequency::TradingFrequency;
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ordered (date, value) pairs with strictly increasing dates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

/// Net-of-cost period returns, dated by the end of the holding period.
pub type ReturnSeries = TimeSeries;

/// Turnover per rebalance date.
pub type TurnoverSeries = TimeSeries;

impl TimeSeries {
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self, SectorlsError> {
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SectorlsError::data_integrity(format!(
                "series dates must be strictly increasing ({} followed by {})",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { points })
    }

    pub fn from_pairs(pairs: &[(NaiveDate, f64)]) -> Result<Self, SectorlsError> {
        Self::new(
            pairs
                .iter()
                .map(|&(date, value)| SeriesPoint { date, value })
                .collect(),
        )
    }

    /// Callers guarantee `date` is later than the current last point.
    pub(crate) fn push(&mut self, date: NaiveDate, value: f64) {
        debug_assert!(self.points.last().is_none_or(|p| p.date < date));
        self.points.push(SeriesPoint { date, value });
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Keeps only the points whose date is in `dates`.
    pub fn restrict_to(&self, dates: &BTreeSet<NaiveDate>) -> TimeSeries {
        TimeSeries {
            points: self
                .points
                .iter()
                .filter(|p| dates.contains(&p.date))
                .copied()
                .collect(),
        }
    }

    /// Inner join on date. Dates missing from either side are dropped.
    pub fn inner_join(&self, other: &TimeSeries) -> (TimeSeries, TimeSeries) {
        let common: BTreeSet<NaiveDate> = self
            .dates()
            .collect::<BTreeSet<_>>()
            .intersection(&other.dates().collect())
            .copied()
            .collect();
        (self.restrict_to(&common), other.restrict_to(&common))
    }
}

/// Output of one strategy leg or of the benchmark.
///
/// `turnover` has one point per `returns` point: the i-th turnover is the
/// rebalance that opened the holding period of the i-th return.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResults {
    pub returns: ReturnSeries,
    pub turnover: TurnoverSeries,
    pub trading_frequency: TradingFrequency,
}

impl StrategyResults {
    /// Restricts both series to the holding periods ending on `dates`.
    pub fn restrict_to(&self, dates: &BTreeSet<NaiveDate>) -> StrategyResults {
        let mut returns = TimeSeries::default();
        let mut turnover = TimeSeries::default();
        for (r, t) in self.returns.points().iter().zip(self.turnover.points()) {
            if dates.contains(&r.date) {
                returns.push(r.date, r.value);
                turnover.push(t.date, t.value);
            }
        }
        StrategyResults {
            returns,
            turnover,
            trading_frequency: self.trading_frequency,
        }
    }
}

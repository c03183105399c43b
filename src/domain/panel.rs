//! Security panel: prices and index presence keyed by (date, security).
//!
//! The panel is dense over an ordered date axis and an ordered security
//! axis. Prices are optional, but a security flagged present in the index
//! on a date must have a price that date.

use crate::domain::error::SectorlsError;
use crate::domain::frequency::TradingFrequency;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// One security's full history as handed to [`SecurityPanel::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityColumn {
    pub id: String,
    pub sector: String,
    pub prices: Vec<Option<f64>>,
    pub presence: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityPanel {
    dates: Vec<NaiveDate>,
    columns: Vec<SecurityColumn>,
}

impl SecurityPanel {
    pub fn new(
        dates: Vec<NaiveDate>,
        mut columns: Vec<SecurityColumn>,
    ) -> Result<Self, SectorlsError> {
        if let Some(w) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SectorlsError::data_integrity(format!(
                "dates must be strictly increasing ({} followed by {})",
                w[0], w[1]
            )));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if column.id.trim().is_empty() {
                return Err(SectorlsError::data_integrity("empty security id"));
            }
            if !seen.insert(column.id.as_str()) {
                return Err(SectorlsError::data_integrity(format!(
                    "duplicate security id {}",
                    column.id
                )));
            }
            if column.prices.len() != dates.len() || column.presence.len() != dates.len() {
                return Err(SectorlsError::data_integrity(format!(
                    "security {} has {} prices and {} presence flags for {} dates",
                    column.id,
                    column.prices.len(),
                    column.presence.len(),
                    dates.len()
                )));
            }
            for (i, (price, &present)) in column.prices.iter().zip(&column.presence).enumerate() {
                match price {
                    Some(p) if !p.is_finite() || *p <= 0.0 => {
                        return Err(SectorlsError::data_integrity(format!(
                            "invalid price {} for {} on {}",
                            p, column.id, dates[i]
                        )));
                    }
                    None if present => {
                        return Err(SectorlsError::data_integrity(format!(
                            "missing price for {} on {} while in the index",
                            column.id, dates[i]
                        )));
                    }
                    _ => {}
                }
            }
        }

        columns.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn date_count(&self) -> usize {
        self.dates.len()
    }

    pub fn security_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn columns(&self) -> &[SecurityColumn] {
        &self.columns
    }

    pub fn security_ids(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.id.as_str())
    }

    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    pub fn price(&self, date_idx: usize, security_idx: usize) -> Option<f64> {
        self.columns[security_idx].prices[date_idx]
    }

    pub fn is_present(&self, date_idx: usize, security_idx: usize) -> bool {
        self.columns[security_idx].presence[date_idx]
    }

    /// Simple return of a security over (date_idx - 1, date_idx].
    pub fn period_return(&self, date_idx: usize, security_idx: usize) -> Option<f64> {
        if date_idx == 0 {
            return None;
        }
        let prev = self.price(date_idx - 1, security_idx)?;
        let curr = self.price(date_idx, security_idx)?;
        Some(curr / prev - 1.0)
    }

    pub fn sector_map(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .map(|c| (c.id.clone(), c.sector.clone()))
            .collect()
    }

    pub fn index_presence(&self) -> BTreeMap<(NaiveDate, String), bool> {
        let mut out = BTreeMap::new();
        for column in &self.columns {
            for (date, &present) in self.dates.iter().zip(&column.presence) {
                out.insert((*date, column.id.clone()), present);
            }
        }
        out
    }

    /// Fails when two consecutive dates are more than `max_gap_days` apart.
    pub fn check_gaps(&self, max_gap_days: i64) -> Result<(), SectorlsError> {
        for w in self.dates.windows(2) {
            let gap = (w[1] - w[0]).num_days();
            if gap > max_gap_days {
                return Err(SectorlsError::data_integrity(format!(
                    "gap of {} days between {} and {} exceeds tolerance of {} days",
                    gap, w[0], w[1], max_gap_days
                )));
            }
        }
        Ok(())
    }

    /// Last observation per period: the last non-missing price inside the
    /// period and the presence flag of the period's final row.
    pub fn resample(&self, frequency: TradingFrequency) -> SecurityPanel {
        let mut buckets: Vec<(NaiveDate, usize, usize)> = Vec::new();
        for (i, &date) in self.dates.iter().enumerate() {
            let end = frequency.period_end(date);
            match buckets.last_mut() {
                Some((label, _, last)) if *label == end => *last = i,
                _ => buckets.push((end, i, i)),
            }
        }

        let dates = buckets.iter().map(|(label, _, _)| *label).collect();
        let columns = self
            .columns
            .iter()
            .map(|column| SecurityColumn {
                id: column.id.clone(),
                sector: column.sector.clone(),
                prices: buckets
                    .iter()
                    .map(|&(_, first, last)| {
                        column.prices[first..=last].iter().rev().find_map(|p| *p)
                    })
                    .collect(),
                presence: buckets
                    .iter()
                    .map(|&(_, _, last)| column.presence[last])
                    .collect(),
            })
            .collect();

        SecurityPanel { dates, columns }
    }
}

//! Trading frequency and period bucketing for resampling.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Monday that anchors the fortnightly buckets.
const BIWEEKLY_ANCHOR: (i32, u32, u32) = (1969, 12, 29);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TradingFrequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl TradingFrequency {
    pub fn periods_per_year(self) -> usize {
        match self {
            TradingFrequency::Daily => 252,
            TradingFrequency::Weekly => 52,
            TradingFrequency::Biweekly => 26,
            TradingFrequency::Monthly => 12,
        }
    }

    /// Short code used in config files and reports.
    pub fn code(self) -> &'static str {
        match self {
            TradingFrequency::Daily => "D",
            TradingFrequency::Weekly => "W",
            TradingFrequency::Biweekly => "2W",
            TradingFrequency::Monthly => "M",
        }
    }

    /// Eleven months of periods, never less than two.
    pub fn default_window(self) -> usize {
        (self.periods_per_year() * 11 / 12).max(2)
    }

    /// Label of the period containing `date`: the last calendar day of the period.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            TradingFrequency::Daily => date,
            TradingFrequency::Weekly => {
                let offset = 6 - i64::from(date.weekday().num_days_from_monday());
                date + Duration::days(offset)
            }
            TradingFrequency::Biweekly => {
                let (y, m, d) = BIWEEKLY_ANCHOR;
                let Some(anchor) = NaiveDate::from_ymd_opt(y, m, d) else {
                    return date;
                };
                let bucket = (date - anchor).num_days().div_euclid(14);
                anchor + Duration::days(bucket * 14 + 13)
            }
            TradingFrequency::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|first| first.pred_opt())
                    .unwrap_or(date)
            }
        }
    }
}

impl fmt::Display for TradingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trading frequency '{0}', expected one of D, W, 2W, M")]
pub struct ParseFrequencyError(pub String);

impl FromStr for TradingFrequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" | "DAILY" => Ok(TradingFrequency::Daily),
            "W" | "WEEKLY" => Ok(TradingFrequency::Weekly),
            "2W" | "BIWEEKLY" => Ok(TradingFrequency::Biweekly),
            "M" | "MONTHLY" => Ok(TradingFrequency::Monthly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

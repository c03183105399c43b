//! Target weight vectors and portfolio legs.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Which part of the book a series describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Leg {
    Long,
    Short,
    Combined,
}

impl Leg {
    pub fn label(self) -> &'static str {
        match self {
            Leg::Long => "Long",
            Leg::Short => "Short",
            Leg::Combined => "Combined",
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Signed security weights chosen at one rebalance date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeightVector {
    pub date: NaiveDate,
    /// Nonzero weights only.
    pub weights: BTreeMap<String, f64>,
    pub long_sectors: Vec<String>,
    pub short_sectors: Vec<String>,
}

impl WeightVector {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    pub fn set(&mut self, security: &str, weight: f64) {
        if weight == 0.0 {
            self.weights.remove(security);
        } else {
            self.weights.insert(security.to_string(), weight);
        }
    }

    pub fn get(&self, security: &str) -> f64 {
        self.weights.get(security).copied().unwrap_or(0.0)
    }

    pub fn long_exposure(&self) -> f64 {
        self.weights.values().filter(|w| **w > 0.0).sum()
    }

    pub fn short_exposure(&self) -> f64 {
        self.weights.values().filter(|w| **w < 0.0).map(|w| w.abs()).sum()
    }

    pub fn gross_exposure(&self) -> f64 {
        self.weights.values().map(|w| w.abs()).sum()
    }

    pub fn net_exposure(&self) -> f64 {
        self.weights.values().sum()
    }

    /// The sleeve of this vector that belongs to `leg`.
    pub fn leg(&self, leg: Leg) -> WeightVector {
        let keep = |w: f64| match leg {
            Leg::Long => w > 0.0,
            Leg::Short => w < 0.0,
            Leg::Combined => true,
        };
        WeightVector {
            date: self.date,
            weights: self
                .weights
                .iter()
                .filter(|(_, w)| keep(**w))
                .map(|(id, w)| (id.clone(), *w))
                .collect(),
            long_sectors: if leg == Leg::Short {
                Vec::new()
            } else {
                self.long_sectors.clone()
            },
            short_sectors: if leg == Leg::Long {
                Vec::new()
            } else {
                self.short_sectors.clone()
            },
        }
    }

    /// Flips the sign of the long sleeve, the short sleeve, or both. Sleeves
    /// are told apart by sign, so this must see the uninverted vector.
    pub fn inverted(&self, invert_long: bool, invert_short: bool) -> WeightVector {
        let mut out = self.clone();
        for w in out.weights.values_mut() {
            if (*w > 0.0 && invert_long) || (*w < 0.0 && invert_short) {
                *w = -*w;
            }
        }
        out
    }

    /// Sum of absolute weight changes from `previous`; `None` means a flat book.
    pub fn turnover_from(&self, previous: Option<&WeightVector>) -> f64 {
        let Some(prev) = previous else {
            return self.gross_exposure();
        };
        let ids: BTreeSet<&String> = self.weights.keys().chain(prev.weights.keys()).collect();
        ids.into_iter()
            .map(|id| (self.get(id) - prev.get(id)).abs())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown leg '{0}', expected one of L, S, LS, ALL")]
pub struct ParseLegsError(pub String);

/// Which legs a strategy reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegSelection {
    Long,
    Short,
    Combined,
    #[default]
    All,
}

impl LegSelection {
    pub fn legs(self) -> Vec<Leg> {
        match self {
            LegSelection::Long => vec![Leg::Long],
            LegSelection::Short => vec![Leg::Short],
            LegSelection::Combined => vec![Leg::Combined],
            LegSelection::All => vec![Leg::Long, Leg::Short, Leg::Combined],
        }
    }
}

impl FromStr for LegSelection {
    type Err = ParseLegsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "L" | "LONG" => Ok(LegSelection::Long),
            "S" | "SHORT" => Ok(LegSelection::Short),
            "LS" | "COMBINED" => Ok(LegSelection::Combined),
            "ALL" => Ok(LegSelection::All),
            _ => Err(ParseLegsError(s.to_string())),
        }
    }
}

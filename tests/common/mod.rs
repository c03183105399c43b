#![allow(dead_code)]

use chrono::NaiveDate;
use sectorls::domain::backtest::BacktestConfig;
use sectorls::domain::error::SectorlsError;
use sectorls::domain::frequency::TradingFrequency;
use sectorls::domain::panel::{SecurityColumn, SecurityPanel};
use sectorls::ports::data_port::DataPort;
use std::process::ExitCode;

/// Serves a prebuilt panel, or fails with a fixed reason.
pub struct MockDataPort {
    pub panel: Option<SecurityPanel>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(panel: SecurityPanel) -> Self {
        Self {
            panel: Some(panel),
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            panel: None,
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn get_prices(&self) -> Result<SecurityPanel, SectorlsError> {
        if let Some(reason) = &self.error {
            return Err(SectorlsError::data_integrity(reason.clone()));
        }
        self.panel
            .clone()
            .ok_or_else(|| SectorlsError::data_integrity("no panel"))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive month ends starting January 2020.
pub fn month_ends(n: usize) -> Vec<NaiveDate> {
    (0..n as u32)
        .map(|i| TradingFrequency::Monthly.period_end(date(2020, 1, 1) + chrono::Months::new(i)))
        .collect()
}

/// A security that is in the index on every date.
pub fn listed(id: &str, sector: &str, prices: &[f64]) -> SecurityColumn {
    SecurityColumn {
        id: id.to_string(),
        sector: sector.to_string(),
        prices: prices.iter().map(|p| Some(*p)).collect(),
        presence: vec![true; prices.len()],
    }
}

pub fn monthly_panel(columns: Vec<SecurityColumn>) -> SecurityPanel {
    let n = columns.first().map_or(0, |c| c.prices.len());
    SecurityPanel::new(month_ends(n), columns).unwrap()
}

/// Two sectors, one security each: A [100, 110, 99], B [100, 95, 105].
pub fn two_sector_panel() -> SecurityPanel {
    monthly_panel(vec![
        listed("A1", "A", &[100.0, 110.0, 99.0]),
        listed("B1", "B", &[100.0, 95.0, 105.0]),
    ])
}

/// Six sectors of two securities with deterministic price paths.
pub fn six_sector_panel(periods: usize) -> SecurityPanel {
    let mut columns = Vec::new();
    for (s, sector) in ["S1", "S2", "S3", "S4", "S5", "S6"].iter().enumerate() {
        for k in 0..2 {
            let mut price = 50.0 + 10.0 * s as f64 + k as f64;
            let mut prices = Vec::with_capacity(periods);
            for t in 0..periods {
                let drift = 0.01 * (s as f64 - 2.5);
                let wobble = 0.03 * ((t * (s + 2) + k) as f64).sin();
                price *= 1.0 + drift + wobble;
                prices.push(price);
            }
            columns.push(listed(&format!("{sector}-{k}"), sector, &prices));
        }
    }
    monthly_panel(columns)
}

pub fn monthly_config(window: usize) -> BacktestConfig {
    BacktestConfig {
        window,
        start_date: date(2000, 1, 1),
        max_gap_days: 31,
        ..BacktestConfig::default()
    }
}

/// ExitCode has no PartialEq, so compare the debug form.
pub fn is_exit_code(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}

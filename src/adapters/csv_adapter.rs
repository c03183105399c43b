//! CSV file data adapter.
//!
//! Reads a data folder holding:
//! - `permno_industry_map.csv`: `permno,hsiccd` rows mapping securities to sectors
//! - `spx_prices.csv`: wide table, first column the date, one column per security
//! - `spx_presence.csv`: wide table of index membership snapshots
//!
//! Presence snapshots are carried forward onto every price date until the
//! next snapshot. Prices are taken as given and never filled.

use crate::domain::error::SectorlsError;
use crate::domain::panel::{SecurityColumn, SecurityPanel};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SECTOR_MAP_FILE: &str = "permno_industry_map.csv";
pub const PRESENCE_FILE: &str = "spx_presence.csv";
pub const PRICES_FILE: &str = "spx_prices.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
    panel: SecurityPanel,
    sector_map: BTreeMap<String, String>,
}

/// A date-indexed table with one column per security.
struct WideTable {
    ids: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<String>>,
}

impl WideTable {
    fn read(path: &Path) -> Result<Self, SectorlsError> {
        let mut rdr = csv::Reader::from_path(path)?;
        let ids: Vec<String> = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows: Vec<(NaiveDate, Vec<String>)> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let date_str = record.get(0).unwrap_or_default().trim();
            let date = parse_date(date_str).ok_or_else(|| {
                SectorlsError::data_integrity(format!(
                    "{}: invalid date '{}' on row {}",
                    path.display(),
                    date_str,
                    line + 2
                ))
            })?;
            let cells = (1..=ids.len())
                .map(|i| record.get(i).unwrap_or_default().trim().to_string())
                .collect();
            rows.push((date, cells));
        }
        rows.sort_by_key(|(date, _)| *date);

        let (dates, rows) = rows.into_iter().unzip();
        Ok(Self { ids, dates, rows })
    }

    fn column_index(&self) -> BTreeMap<&str, usize> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }
}

impl CsvAdapter {
    /// Loads and aligns every file in `base_path`.
    pub fn load<P: AsRef<Path>>(base_path: P) -> Result<Self, SectorlsError> {
        let base_path = base_path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            return Err(SectorlsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("data folder '{}' not found", base_path.display()),
            )));
        }

        let sector_map = read_sector_map(&base_path.join(SECTOR_MAP_FILE))?;
        let prices = WideTable::read(&base_path.join(PRICES_FILE))?;
        let presence = WideTable::read(&base_path.join(PRESENCE_FILE))?;

        let panel = build_panel(&prices, &presence, &sector_map)?;
        tracing::info!(
            securities = panel.security_count(),
            dates = panel.date_count(),
            folder = %base_path.display(),
            "price panel loaded"
        );

        Ok(Self {
            base_path,
            panel,
            sector_map,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn panel(&self) -> &SecurityPanel {
        &self.panel
    }
}

impl DataPort for CsvAdapter {
    fn get_prices(&self) -> Result<SecurityPanel, SectorlsError> {
        Ok(self.panel.clone())
    }

    /// The raw mapping, including securities absent from the price files.
    fn get_sector_map(&self) -> Result<BTreeMap<String, String>, SectorlsError> {
        Ok(self.sector_map.clone())
    }
}

fn read_sector_map(path: &Path) -> Result<BTreeMap<String, String>, SectorlsError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                SectorlsError::data_integrity(format!(
                    "{}: missing '{}' column",
                    path.display(),
                    name
                ))
            })
    };
    let permno_col = find("permno")?;
    let sector_col = find("hsiccd")?;

    let mut map = BTreeMap::new();
    for result in rdr.records() {
        let record = result?;
        let permno = record.get(permno_col).unwrap_or_default().trim();
        let sector = record.get(sector_col).unwrap_or_default().trim();
        if permno.is_empty() || sector.is_empty() {
            continue;
        }
        map.insert(permno.to_string(), sector.to_string());
    }
    Ok(map)
}

fn build_panel(
    prices: &WideTable,
    presence: &WideTable,
    sector_map: &BTreeMap<String, String>,
) -> Result<SecurityPanel, SectorlsError> {
    let presence_cols = presence.column_index();
    let dropped_unlisted = prices
        .ids
        .iter()
        .filter(|id| !presence_cols.contains_key(id.as_str()))
        .count();
    if dropped_unlisted > 0 {
        tracing::warn!(
            count = dropped_unlisted,
            "securities without presence data dropped"
        );
    }

    // For each price date, the latest presence snapshot on or before it.
    let mut snapshot = Vec::with_capacity(prices.dates.len());
    let mut next = 0;
    for date in &prices.dates {
        while next < presence.dates.len() && presence.dates[next] <= *date {
            next += 1;
        }
        snapshot.push(next.checked_sub(1));
    }

    let mut columns = Vec::new();
    let mut no_sector = Vec::new();
    for (price_col, id) in prices.ids.iter().enumerate() {
        let Some(&presence_col) = presence_cols.get(id.as_str()) else {
            continue;
        };
        let Some(sector) = sector_map.get(id) else {
            no_sector.push(id.clone());
            continue;
        };

        let mut column_prices = Vec::with_capacity(prices.dates.len());
        let mut column_presence = Vec::with_capacity(prices.dates.len());
        for (t, row) in prices.rows.iter().enumerate() {
            column_prices.push(parse_price(&row[price_col]).map_err(|raw| {
                SectorlsError::data_integrity(format!(
                    "invalid price '{}' for {} on {}",
                    raw, id, prices.dates[t]
                ))
            })?);
            let present = match snapshot[t] {
                Some(s) => parse_presence(&presence.rows[s][presence_col]).ok_or_else(|| {
                    SectorlsError::data_integrity(format!(
                        "invalid presence flag '{}' for {} on {}",
                        presence.rows[s][presence_col], id, presence.dates[s]
                    ))
                })?,
                None => false,
            };
            column_presence.push(present);
        }

        columns.push(SecurityColumn {
            id: id.clone(),
            sector: sector.clone(),
            prices: column_prices,
            presence: column_presence,
        });
    }

    if !no_sector.is_empty() {
        tracing::warn!(
            count = no_sector.len(),
            first = %no_sector[0],
            "securities without a sector mapping dropped"
        );
    }

    SecurityPanel::new(prices.dates.clone(), columns)
}

/// Accepts `YYYY-MM-DD` with an optional trailing time.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

/// Empty and NaN cells are missing prices.
fn parse_price(cell: &str) -> Result<Option<f64>, String> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| cell.to_string())
}

/// Empty cells are treated as not in the index.
fn parse_presence(cell: &str) -> Option<bool> {
    match cell.to_lowercase().as_str() {
        "" | "nan" | "0" | "0.0" | "false" => Some(false),
        "1" | "1.0" | "true" => Some(true),
        _ => None,
    }
}

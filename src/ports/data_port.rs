//! Data access port trait.

use crate::domain::error::SectorlsError;
use crate::domain::panel::SecurityPanel;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Supplies the aligned price panel, sector membership and index presence.
pub trait DataPort {
    fn get_prices(&self) -> Result<SecurityPanel, SectorlsError>;

    /// Security id to sector id.
    fn get_sector_map(&self) -> Result<BTreeMap<String, String>, SectorlsError> {
        Ok(self.get_prices()?.sector_map())
    }

    /// Index membership keyed by (date, security id).
    fn get_index_presence(&self) -> Result<BTreeMap<(NaiveDate, String), bool>, SectorlsError> {
        Ok(self.get_prices()?.index_presence())
    }
}

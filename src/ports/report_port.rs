//! Report output port trait.

use crate::domain::backtest::BacktestReturns;
use crate::domain::error::SectorlsError;
use std::path::Path;

/// Port for writing the return and turnover series of a run.
pub trait ReportPort {
    fn write(&self, returns: &BacktestReturns, output_path: &Path) -> Result<(), SectorlsError>;
}

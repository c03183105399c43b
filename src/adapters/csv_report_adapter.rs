//! CSV report adapter: dumps every return series of a run.

use crate::domain::backtest::BacktestReturns;
use crate::domain::error::SectorlsError;
use crate::domain::series::StrategyResults;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

pub const REPORT_HEADER: [&str; 4] = ["series", "date", "return", "turnover"];

/// Writes one row per (series, return date), with the turnover of the
/// rebalance that opened that period.
#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_to<W: Write>(
        &self,
        returns: &BacktestReturns,
        writer: W,
    ) -> Result<(), SectorlsError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(REPORT_HEADER)?;
        for (name, results) in &returns.all() {
            write_series(&mut wtr, name, results)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn write_series<W: Write>(
    wtr: &mut csv::Writer<W>,
    name: &str,
    results: &StrategyResults,
) -> Result<(), SectorlsError> {
    let turnover = results.turnover.points();
    for (i, point) in results.returns.points().iter().enumerate() {
        let date = point.date.format("%Y-%m-%d").to_string();
        let value = point.value.to_string();
        let turnover = turnover
            .get(i)
            .map(|t| t.value.to_string())
            .unwrap_or_default();
        wtr.write_record([name, date.as_str(), value.as_str(), turnover.as_str()])?;
    }
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, returns: &BacktestReturns, output_path: &Path) -> Result<(), SectorlsError> {
        let file = std::fs::File::create(output_path)?;
        self.write_to(returns, std::io::BufWriter::new(file))
    }
}

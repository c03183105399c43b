//! Return and turnover engine.
//!
//! A weight vector set at rebalance date T earns the simple returns of its
//! securities over (T, T+1], where T+1 is the next resampled period end.
//! Transaction costs are charged on turnover at T against that same period.
//!
//! Exit policy: a held security that leaves the index by T+1 with no price
//! in that period is carried at its last price, so it contributes nothing.
//! A missing price is an error only while the security is still in the index.
//!
//! Turnover is measured against the previous rebalance only when it opened
//! the immediately preceding period. After a period with no signal the book
//! is flat, and the next rebalance pays for rebuilding it in full.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::SectorlsError;
use crate::domain::panel::SecurityPanel;
use crate::domain::series::{ReturnSeries, TimeSeries, TurnoverSeries};
use crate::domain::weights::WeightVector;
use std::collections::HashMap;

pub const BPS_PER_UNIT: f64 = 10_000.0;

/// Cost drag for a given turnover.
pub fn transaction_cost(turnover: f64, transaction_cost_bps: f64) -> f64 {
    turnover * transaction_cost_bps / BPS_PER_UNIT
}

/// Net-of-cost returns and turnover for a weight path.
pub fn calculate_returns(
    weights: &[WeightVector],
    panel: &SecurityPanel,
    config: &BacktestConfig,
) -> Result<(ReturnSeries, TurnoverSeries), SectorlsError> {
    let resampled = panel.resample(config.trading_frequency);
    calculate_returns_resampled(weights, &resampled, config)
}

/// Same as [`calculate_returns`] for a panel already on the trading calendar.
pub(crate) fn calculate_returns_resampled(
    weights: &[WeightVector],
    resampled: &SecurityPanel,
    config: &BacktestConfig,
) -> Result<(ReturnSeries, TurnoverSeries), SectorlsError> {
    if let Some(w) = weights.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(SectorlsError::data_integrity(format!(
            "rebalance dates must be strictly increasing ({} followed by {})",
            w[0].date, w[1].date
        )));
    }

    let security_index: HashMap<&str, usize> = resampled
        .security_ids()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();
    let dates = resampled.dates();
    let end = config.end_date.or(resampled.last_date());

    let mut returns = TimeSeries::default();
    let mut turnover = TimeSeries::default();
    // (period index, weights) of the last priced rebalance
    let mut previous: Option<(usize, &WeightVector)> = None;

    for wv in weights {
        if wv.date < config.start_date || end.is_some_and(|e| wv.date > e) {
            continue;
        }
        let t = resampled.date_index(wv.date).ok_or_else(|| {
            SectorlsError::data_integrity(format!(
                "rebalance date {} is not a {} period end",
                wv.date, config.trading_frequency
            ))
        })?;
        let next = t + 1;
        if next >= dates.len() || end.is_some_and(|e| dates[next] > e) {
            break;
        }

        let mut raw = 0.0;
        for (id, weight) in &wv.weights {
            let s = *security_index.get(id.as_str()).ok_or_else(|| {
                SectorlsError::data_integrity(format!("weight for unknown security {id}"))
            })?;
            let r = match resampled.period_return(next, s) {
                Some(r) => r,
                None if resampled.price(t, s).is_some() && !resampled.is_present(next, s) => {
                    tracing::debug!(
                        security = %id,
                        date = %dates[next],
                        "held security left the index without a price, carried at last price"
                    );
                    0.0
                }
                None => {
                    return Err(SectorlsError::data_integrity(format!(
                        "no price for held security {} over the period {} to {}",
                        id, dates[t], dates[next]
                    )));
                }
            };
            raw += weight * r;
        }

        let prior = previous
            .filter(|(prev_t, _)| prev_t + 1 == t)
            .map(|(_, prev)| prev);
        let period_turnover = wv.turnover_from(prior);
        let cost = transaction_cost(period_turnover, config.transaction_cost_bps);
        returns.push(dates[next], raw - cost);
        turnover.push(wv.date, period_turnover);
        previous = Some((t, wv));
    }

    Ok((returns, turnover))
}

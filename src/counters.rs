//! Counter Accounting
//!
//! Tracks the last value observed for every monotonic series so that an
//! additive sink (a prometheus counter) only ever receives non-negative
//! increments, even though the simulation exposes absolute totals.

use std::collections::HashMap;

/// Last-observed value per counter series.
#[derive(Debug, Default)]
pub struct CounterLedger {
    last: HashMap<String, f64>,
}

impl CounterLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` for `series` and return how much it grew since the
    /// previous observation. The first observation reports the full value.
    /// A reading below the stored one yields zero and does not lower the
    /// watermark, so the sink never moves backwards.
    pub fn advance(&mut self, series: &str, current: f64) -> f64 {
        let current = if current.is_finite() { current.max(0.0) } else { 0.0 };
        match self.last.get_mut(series) {
            Some(last) => {
                let delta = (current - *last).max(0.0);
                if current > *last {
                    *last = current;
                }
                delta
            }
            None => {
                self.last.insert(series.to_string(), current);
                current
            }
        }
    }

}

/// Add `delta` to a running total. A non-finite or negative contribution,
/// or one that would overflow the total, leaves it unchanged.
pub fn accumulate(total: &mut f64, delta: f64) {
    let next = *total + delta;
    if delta >= 0.0 && next.is_finite() {
        *total = next;
    }
}

/// Series key for a metric name plus an optional label value.
pub fn series_key(name: &str, label: Option<&str>) -> String {
    match label {
        Some(value) => format!("{}{{{}}}", name, value),
        None => name.to_string(),
    }
}

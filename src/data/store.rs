//! Candle storage keyed by symbol and interval
//!
//! Series are kept ordered by timestamp ascending with uniqueness enforced
//! per timestamp. Closed candles are immutable; only the most recent candle
//! may be rewritten in place while it is still forming.

use std::collections::HashMap;

use crate::data::Candle;

/// In-memory candle store
#[derive(Debug, Default)]
pub struct CandleStore {
    /// Series keyed by "SYMBOL:interval"
    series: HashMap<String, Vec<Candle>>,
}

impl CandleStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
        }
    }

    fn key(symbol: &str, interval: &str) -> String {
        format!("{}:{}", symbol, interval)
    }

    /// Merge a batch of candles (e.g. one gateway page) into the series.
    ///
    /// Duplicates by timestamp are replaced with the incoming candle, the
    /// result is re-sorted ascending. Gateway pages may overlap; the caller
    /// never has to dedup.
    pub fn merge(&mut self, symbol: &str, interval: &str, candles: Vec<Candle>) {
        if candles.is_empty() {
            return;
        }
        let series = self
            .series
            .entry(Self::key(symbol, interval))
            .or_default();
        for candle in candles {
            match series.iter().position(|c| c.timestamp == candle.timestamp) {
                Some(i) => series[i] = candle,
                None => series.push(candle),
            }
        }
        series.sort_by_key(|c| c.timestamp);
    }

    /// Apply a live tick: rewrite the forming candle in place when the
    /// timestamp matches the last stored candle, append otherwise.
    pub fn apply_tick(&mut self, symbol: &str, interval: &str, candle: Candle) {
        let series = self
            .series
            .entry(Self::key(symbol, interval))
            .or_default();
        match series.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            Some(last) if last.timestamp < candle.timestamp => series.push(candle),
            None => series.push(candle),
            // A tick older than the forming candle is stale; drop it.
            _ => {}
        }
    }

    /// Get the series for a symbol/interval
    pub fn series(&self, symbol: &str, interval: &str) -> Option<&[Candle]> {
        self.series
            .get(&Self::key(symbol, interval))
            .map(Vec::as_slice)
    }

    /// Latest candle for a symbol/interval
    pub fn latest(&self, symbol: &str, interval: &str) -> Option<&Candle> {
        self.series(symbol, interval)?.last()
    }

    /// Number of candles stored for a symbol/interval
    pub fn len(&self, symbol: &str, interval: &str) -> usize {
        self.series(symbol, interval).map_or(0, <[Candle]>::len)
    }

    /// Check whether nothing is stored at all
    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }

    /// Drop candles older than the retention window, keeping `keep` newest
    pub fn trim(&mut self, symbol: &str, interval: &str, keep: usize) {
        if let Some(series) = self.series.get_mut(&Self::key(symbol, interval)) {
            if series.len() > keep {
                series.drain(..series.len() - keep);
            }
        }
    }
}

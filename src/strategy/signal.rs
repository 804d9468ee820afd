//! Trading signal types

use serde::{Deserialize, Serialize};

/// Signal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// Enter long
    Long,
    /// Enter short
    Short,
    /// No entry
    None,
}

/// Entry signal for one evaluation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal direction
    pub kind: SignalKind,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Why the signal fired (or why it did not)
    pub reasoning: String,
    /// Candle index the signal was generated at
    pub generated_at: usize,
}

impl Signal {
    /// Create long signal
    pub fn long(confidence: f64, reasoning: String, generated_at: usize) -> Self {
        Self {
            kind: SignalKind::Long,
            confidence,
            reasoning,
            generated_at,
        }
    }

    /// Create short signal
    pub fn short(confidence: f64, reasoning: String, generated_at: usize) -> Self {
        Self {
            kind: SignalKind::Short,
            confidence,
            reasoning,
            generated_at,
        }
    }

    /// Create no-entry signal
    pub fn none(reasoning: String, generated_at: usize) -> Self {
        Self {
            kind: SignalKind::None,
            confidence: 0.0,
            reasoning,
            generated_at,
        }
    }

    /// A directional signal that clears the confidence threshold
    pub fn is_actionable(&self, min_confidence: f64) -> bool {
        self.kind != SignalKind::None && self.confidence >= min_confidence
    }
}

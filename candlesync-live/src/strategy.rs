//! Strategy seam for realtime evaluation.
//!
//! A strategy sees one symbol's latest candle window per tick and answers
//! with trade intents. Sizing, pricing and account state are the router's
//! concern, not the strategy's.

use candlesync_core::domain::Candle;

/// Trade intents from one evaluation. Both flags may be set; the session
/// routes the sell first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signal {
    pub buy: bool,
    pub sell: bool,
}

impl Signal {
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn buy() -> Self {
        Self {
            buy: true,
            sell: false,
        }
    }

    pub fn sell() -> Self {
        Self {
            buy: false,
            sell: true,
        }
    }

    pub fn is_hold(&self) -> bool {
        !self.buy && !self.sell
    }
}

/// A realtime trading strategy, evaluated once per tick per symbol.
///
/// Implementations may keep indicator state between ticks; the candle window
/// arrives oldest first.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn evaluate(&mut self, symbol: &str, candles: &[Candle]) -> Signal;
}

/// Baseline strategy that never trades.
#[derive(Debug, Default)]
pub struct HoldStrategy;

impl Strategy for HoldStrategy {
    fn name(&self) -> &str {
        "hold"
    }

    fn evaluate(&mut self, _symbol: &str, _candles: &[Candle]) -> Signal {
        Signal::hold()
    }
}

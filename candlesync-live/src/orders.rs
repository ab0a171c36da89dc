//! Order routing seam.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("account unlock failed: {0}")]
    Unlock(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("order routing unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("buy"),
            OrderSide::Sell => f.write_str("sell"),
        }
    }
}

/// Acknowledgement for one accepted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
}

/// Order entry for the session.
///
/// Implementations own sizing and pricing; the session only expresses
/// direction. Every router must be unlocked before its first order.
pub trait OrderRouter: Send {
    /// Unlock the trading account.
    fn unlock(&mut self) -> Result<(), OrderError>;

    fn place_buy(&mut self, symbol: &str) -> Result<OrderAck, OrderError>;

    fn place_sell(&mut self, symbol: &str) -> Result<OrderAck, OrderError>;
}

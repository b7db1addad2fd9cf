use chrono::NaiveDateTime;

use crate::fixedpoint::{Micros, Qty};

/// BUY or SELL for executions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Parse an export side string (`"buy"`, `" SELL "`, ...).
    pub fn parse(s: &str) -> Option<Side> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

/// A single completed order fill (the matching atom).
///
/// quantity is always positive, price is never negative.
/// `seq` is the source row index; it breaks ties between equal timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Execution {
    pub account_id: String,
    pub instrument_key: String,
    pub side: Side,
    pub quantity: Qty,
    pub price: Micros,
    pub timestamp: NaiveDateTime,
    pub seq: u64,
}

impl Execution {
    pub fn new<A: Into<String>, K: Into<String>>(
        account_id: A,
        instrument_key: K,
        side: Side,
        quantity: Qty,
        price: Micros,
        timestamp: NaiveDateTime,
        seq: u64,
    ) -> Self {
        debug_assert!(quantity.is_positive(), "Execution.quantity must be > 0");
        debug_assert!(!price.is_negative(), "Execution.price must be >= 0");
        Self {
            account_id: account_id.into(),
            instrument_key: instrument_key.into(),
            side,
            quantity,
            price,
            timestamp,
            seq,
        }
    }
}

/// A resting FIFO lot: the unmatched remainder of one execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenLot {
    pub remaining_quantity: Qty,
    pub price: Micros,
    pub timestamp: NaiveDateTime,
}

/// Which leg was resting when the pair was formed.
///
/// `SellThenBuy`: a resting sell lot was closed by an incoming buy.
/// `BuyThenSell`: a resting buy lot was closed by an incoming sell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    SellThenBuy,
    BuyThenSell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::SellThenBuy => "SELL→BUY",
            Direction::BuyThenSell => "BUY→SELL",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One realized match between a buy leg and a sell leg.
///
/// Both legs always carry the same quantity.
/// `realized_value = sell_value - buy_value` (positive = profit).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradePair {
    pub instrument_key: String,
    pub direction: Direction,
    pub buy_time: NaiveDateTime,
    pub buy_quantity: Qty,
    pub buy_avg_price: Micros,
    pub buy_value: Micros,
    pub sell_time: NaiveDateTime,
    pub sell_quantity: Qty,
    pub sell_avg_price: Micros,
    pub sell_value: Micros,
    pub realized_value: Micros,
}

impl TradePair {
    /// Matched quantity (identical on both legs).
    pub fn quantity(&self) -> Qty {
        self.buy_quantity
    }
}

use std::collections::VecDeque;

use crate::fixedpoint::{value_of_saturating, Micros, Qty};
use crate::ordering::group_by_instrument;
use crate::types::{Direction, Execution, OpenLot, Side, TradePair};

/// FIFO state for a single instrument.
///
/// Rules:
/// - BUY closes resting sell lots oldest-first, then rests any remainder as a
///   buy lot.
/// - SELL closes resting buy lots oldest-first, then rests any remainder as a
///   sell lot.
/// - At most one of the two queues is non-empty after every execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrumentBook {
    instrument_key: String,
    buys: VecDeque<OpenLot>,
    sells: VecDeque<OpenLot>,
}

impl InstrumentBook {
    pub fn new<S: Into<String>>(instrument_key: S) -> Self {
        Self {
            instrument_key: instrument_key.into(),
            buys: VecDeque::new(),
            sells: VecDeque::new(),
        }
    }

    pub fn instrument_key(&self) -> &str {
        &self.instrument_key
    }

    /// Apply one execution, appending any realized pairs to `out`.
    ///
    /// Caller guarantees executions arrive in canonical order.
    pub fn apply(&mut self, ex: &Execution, out: &mut Vec<TradePair>) {
        debug_assert!(ex.quantity.is_positive());
        debug_assert_eq!(ex.instrument_key, self.instrument_key);

        match ex.side {
            Side::Buy => self.buy_fifo(ex, out),
            Side::Sell => self.sell_fifo(ex, out),
        }

        debug_assert!(
            self.buys.is_empty() || self.sells.is_empty(),
            "both side queues open for {}",
            self.instrument_key
        );
    }

    /// Incoming buy: drain resting sells, rest the remainder.
    fn buy_fifo(&mut self, ex: &Execution, out: &mut Vec<TradePair>) {
        let mut qty = ex.quantity;

        while qty.is_positive() {
            let Some(front) = self.sells.front_mut() else {
                break;
            };

            let m = qty.min(front.remaining_quantity);
            out.push(make_pair(
                &self.instrument_key,
                Direction::SellThenBuy,
                Leg { time: ex.timestamp, qty: m, price: ex.price },
                Leg { time: front.timestamp, qty: m, price: front.price },
            ));

            front.remaining_quantity -= m;
            qty -= m;
            if front.remaining_quantity.is_zero() {
                self.sells.pop_front();
            }
        }

        if qty.is_positive() {
            self.buys.push_back(OpenLot {
                remaining_quantity: qty,
                price: ex.price,
                timestamp: ex.timestamp,
            });
        }
    }

    /// Incoming sell: drain resting buys, rest the remainder.
    fn sell_fifo(&mut self, ex: &Execution, out: &mut Vec<TradePair>) {
        let mut qty = ex.quantity;

        while qty.is_positive() {
            let Some(front) = self.buys.front_mut() else {
                break;
            };

            let m = qty.min(front.remaining_quantity);
            out.push(make_pair(
                &self.instrument_key,
                Direction::BuyThenSell,
                Leg { time: front.timestamp, qty: m, price: front.price },
                Leg { time: ex.timestamp, qty: m, price: ex.price },
            ));

            front.remaining_quantity -= m;
            qty -= m;
            if front.remaining_quantity.is_zero() {
                self.buys.pop_front();
            }
        }

        if qty.is_positive() {
            self.sells.push_back(OpenLot {
                remaining_quantity: qty,
                price: ex.price,
                timestamp: ex.timestamp,
            });
        }
    }

    /// Side of the resting lots, or `None` when flat.
    pub fn open_side(&self) -> Option<Side> {
        if !self.buys.is_empty() {
            Some(Side::Buy)
        } else if !self.sells.is_empty() {
            Some(Side::Sell)
        } else {
            None
        }
    }

    /// Resting lots in FIFO order (whichever side is open).
    pub fn open_lots(&self) -> impl Iterator<Item = &OpenLot> {
        self.buys.iter().chain(self.sells.iter())
    }

    /// Signed residual quantity (+long, -short, 0 flat).
    pub fn net_qty(&self) -> Qty {
        let long: Qty = self.buys.iter().map(|l| l.remaining_quantity).sum();
        let short: Qty = self.sells.iter().map(|l| l.remaining_quantity).sum();
        long - short
    }

    pub fn is_flat(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }
}

struct Leg {
    time: chrono::NaiveDateTime,
    qty: Qty,
    price: Micros,
}

fn make_pair(instrument_key: &str, direction: Direction, buy: Leg, sell: Leg) -> TradePair {
    let buy_value = value_of_saturating(buy.price, buy.qty);
    let sell_value = value_of_saturating(sell.price, sell.qty);
    TradePair {
        instrument_key: instrument_key.to_string(),
        direction,
        buy_time: buy.time,
        buy_quantity: buy.qty,
        buy_avg_price: buy.price,
        buy_value,
        sell_time: sell.time,
        sell_quantity: sell.qty,
        sell_avg_price: sell.price,
        sell_value,
        realized_value: sell_value.saturating_sub(buy_value),
    }
}

// ---------------------------------------------------------------------------
// Batch entry points
// ---------------------------------------------------------------------------

/// Outcome of matching one instrument's execution sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrumentMatch {
    pub instrument_key: String,
    /// Pairs in the order the matches occurred.
    pub pairs: Vec<TradePair>,
    /// Side of the residual lots (`None` when flat).
    pub open_side: Option<Side>,
    /// Residual lots in FIFO order.
    pub open_lots: Vec<OpenLot>,
}

impl InstrumentMatch {
    pub fn net_qty(&self) -> Qty {
        let total: Qty = self.open_lots.iter().map(|l| l.remaining_quantity).sum();
        match self.open_side {
            Some(Side::Sell) => -total,
            _ => total,
        }
    }
}

/// Match one instrument's executions, which must already be in canonical order.
pub fn match_instrument(instrument_key: &str, executions: &[Execution]) -> InstrumentMatch {
    let mut book = InstrumentBook::new(instrument_key);
    let mut pairs = Vec::new();
    for ex in executions {
        book.apply(ex, &mut pairs);
    }
    InstrumentMatch {
        instrument_key: instrument_key.to_string(),
        pairs,
        open_side: book.open_side(),
        open_lots: book.open_lots().cloned().collect(),
    }
}

/// Matching results for a whole batch, one entry per instrument in order of
/// first appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub instruments: Vec<InstrumentMatch>,
}

impl MatchReport {
    /// All pairs, grouped by instrument, in match order within each group.
    pub fn pairs(&self) -> impl Iterator<Item = &TradePair> {
        self.instruments.iter().flat_map(|m| m.pairs.iter())
    }

    pub fn pair_count(&self) -> usize {
        self.instruments.iter().map(|m| m.pairs.len()).sum()
    }

    /// Instruments that still carry residual lots.
    pub fn open_positions(&self) -> impl Iterator<Item = &InstrumentMatch> {
        self.instruments.iter().filter(|m| !m.open_lots.is_empty())
    }

    /// Pairs cloned into a flat vector (for the aggregator / writers).
    pub fn into_pairs(self) -> Vec<TradePair> {
        self.instruments
            .into_iter()
            .flat_map(|m| m.pairs.into_iter())
            .collect()
    }
}

/// Match a multi-instrument batch.
///
/// Executions are grouped by instrument (first appearance order) and each
/// group is sorted canonically before matching; input order is otherwise
/// irrelevant.  Instruments share no state.
pub fn match_executions(executions: &[Execution]) -> MatchReport {
    let instruments = group_by_instrument(executions)
        .into_iter()
        .map(|(key, seq)| match_instrument(&key, &seq))
        .collect();
    MatchReport { instruments }
}

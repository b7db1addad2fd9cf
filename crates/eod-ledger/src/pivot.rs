//! Per-instrument aggregation of realized trade pairs.

use std::collections::HashMap;

use crate::fixedpoint::Micros;
use crate::types::TradePair;

/// Label carried by the synthetic total row. Identity comes from
/// [`PivotRow::is_total`], never from this text.
pub const GRAND_TOTAL_KEY: &str = "Grand Total";

/// Aggregated figures for one instrument (or the grand total).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PivotRow {
    pub instrument_key: String,
    pub completed_transitions: u64,
    pub total_buy_value: Micros,
    pub total_sell_value: Micros,
    pub total_realized_value: Micros,
    /// Set only on the grand-total row.
    pub is_total: bool,
}

impl PivotRow {
    fn empty(instrument_key: &str, is_total: bool) -> Self {
        Self {
            instrument_key: instrument_key.to_string(),
            is_total,
            completed_transitions: 0,
            total_buy_value: Micros::ZERO,
            total_sell_value: Micros::ZERO,
            total_realized_value: Micros::ZERO,
        }
    }

    fn absorb(&mut self, p: &TradePair) {
        self.completed_transitions += 1;
        self.total_buy_value = self.total_buy_value.saturating_add(p.buy_value);
        self.total_sell_value = self.total_sell_value.saturating_add(p.sell_value);
        self.total_realized_value = self.total_realized_value.saturating_add(p.realized_value);
    }
}

/// Instrument rows in first-appearance order plus the grand total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PivotReport {
    pub rows: Vec<PivotRow>,
    pub grand_total: PivotRow,
}

impl PivotReport {
    /// Instrument rows followed by the grand-total row, as rendered.
    pub fn rows_with_total(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().chain(std::iter::once(&self.grand_total))
    }
}

/// Group pairs by instrument and total them.
///
/// Returns `None` when there are no pairs: "no completed transitions" is a
/// distinct outcome from a zero-valued report and carries no total row.
pub fn aggregate_pairs<'a, I>(pairs: I) -> Option<PivotReport>
where
    I: IntoIterator<Item = &'a TradePair>,
{
    let mut slot: HashMap<&'a str, usize> = HashMap::new();
    let mut rows: Vec<PivotRow> = Vec::new();

    for p in pairs {
        let idx = match slot.get(p.instrument_key.as_str()) {
            Some(&i) => i,
            None => {
                rows.push(PivotRow::empty(&p.instrument_key, false));
                slot.insert(p.instrument_key.as_str(), rows.len() - 1);
                rows.len() - 1
            }
        };
        rows[idx].absorb(p);
    }

    if rows.is_empty() {
        return None;
    }

    let mut grand_total = PivotRow::empty(GRAND_TOTAL_KEY, true);
    for r in &rows {
        grand_total.completed_transitions += r.completed_transitions;
        grand_total.total_buy_value = grand_total.total_buy_value.saturating_add(r.total_buy_value);
        grand_total.total_sell_value = grand_total
            .total_sell_value
            .saturating_add(r.total_sell_value);
        grand_total.total_realized_value = grand_total
            .total_realized_value
            .saturating_add(r.total_realized_value);
    }

    Some(PivotReport { rows, grand_total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Qty};
    use chrono::NaiveDate;

    fn pair(key: &str, buy: i64, sell: i64) -> TradePair {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        TradePair {
            instrument_key: key.to_string(),
            direction: Direction::BuyThenSell,
            buy_time: ts,
            buy_quantity: Qty::from_units(1),
            buy_avg_price: Micros::from_units(buy),
            buy_value: Micros::from_units(buy),
            sell_time: ts,
            sell_quantity: Qty::from_units(1),
            sell_avg_price: Micros::from_units(sell),
            sell_value: Micros::from_units(sell),
            realized_value: Micros::from_units(sell - buy),
        }
    }

    #[test]
    fn empty_input_has_no_report() {
        assert_eq!(aggregate_pairs(&[]), None);
    }

    #[test]
    fn rows_keep_first_appearance_order() {
        let pairs = vec![pair("NIFTY", 10, 12), pair("BANK", 5, 4), pair("NIFTY", 7, 9)];
        let r = aggregate_pairs(&pairs).unwrap();
        let keys: Vec<&str> = r.rows.iter().map(|r| r.instrument_key.as_str()).collect();
        assert_eq!(keys, vec!["NIFTY", "BANK"]);
        assert_eq!(r.rows[0].completed_transitions, 2);
        assert_eq!(r.rows[0].total_realized_value, Micros::from_units(4));
        assert_eq!(r.rows[1].total_realized_value, Micros::from_units(-1));
    }

    #[test]
    fn grand_total_sums_every_column() {
        let pairs = vec![pair("A", 10, 12), pair("B", 5, 4), pair("A", 7, 9)];
        let r = aggregate_pairs(&pairs).unwrap();
        assert!(r.grand_total.is_total);
        assert!(r.rows.iter().all(|row| !row.is_total));
        assert_eq!(r.grand_total.completed_transitions, 3);
        assert_eq!(r.grand_total.total_buy_value, Micros::from_units(22));
        assert_eq!(r.grand_total.total_sell_value, Micros::from_units(25));
        assert_eq!(r.grand_total.total_realized_value, Micros::from_units(3));
        assert_eq!(r.rows_with_total().count(), 3);
    }

    #[test]
    fn instrument_named_like_the_total_is_still_an_instrument() {
        let pairs = vec![pair(GRAND_TOTAL_KEY, 10, 12), pair("A", 5, 6)];
        let r = aggregate_pairs(&pairs).unwrap();
        assert_eq!(r.rows[0].instrument_key, GRAND_TOTAL_KEY);
        assert!(!r.rows[0].is_total);
        let totals: Vec<&PivotRow> = r.rows_with_total().filter(|row| row.is_total).collect();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].completed_transitions, 2);
    }
}

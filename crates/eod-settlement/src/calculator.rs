use eod_ledger::{value_of, Micros, Qty};
use tracing::{debug, warn};

use crate::error::SettlementError;
use crate::types::{PositionRow, Segment, SettlementConfig};

/// Per-row valuation produced by [`compute_settlement`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementValuation {
    pub account_id: Option<String>,
    pub segment: Segment,
    pub symbol: String,
    pub instrument_key: String,
    pub net_quantity: Qty,
    /// `None` when settlement is off for the segment or the key is unmapped.
    pub settlement_price: Option<Micros>,
    pub calculated_realized_pnl: Micros,
    pub calculated_settlement_pnl: Micros,
}

/// An instrument with no settlement price while settlement was enabled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnmatchedReference {
    pub account_id: Option<String>,
    pub segment: Segment,
    pub instrument_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentTotals {
    pub segment: Segment,
    pub rows: usize,
    pub realized: Micros,
    pub settlement: Micros,
}

impl SegmentTotals {
    fn empty(segment: Segment) -> Self {
        Self {
            segment,
            rows: 0,
            realized: Micros::ZERO,
            settlement: Micros::ZERO,
        }
    }

    pub fn total(&self) -> Micros {
        self.realized.saturating_add(self.settlement)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementResult {
    pub nfo: SegmentTotals,
    pub bfo: SegmentTotals,
    pub overall_realized: Micros,
    pub overall_settlement: Micros,
    /// overall_realized + overall_settlement
    pub grand_total: Micros,
    pub valuations: Vec<SettlementValuation>,
    pub unmatched: Vec<UnmatchedReference>,
}

impl SettlementResult {
    pub fn segment(&self, segment: Segment) -> &SegmentTotals {
        match segment {
            Segment::Nfo => &self.nfo,
            Segment::Bfo => &self.bfo,
        }
    }
}

fn overflow(row: &PositionRow, field: &'static str) -> SettlementError {
    SettlementError::Overflow {
        instrument_key: row.instrument_key.clone(),
        field,
    }
}

/// (a - b) * qty, checked end to end.
fn spread_value(a: Micros, b: Micros, qty: Qty) -> Option<Micros> {
    a.checked_sub(b).and_then(|d| value_of(d, qty))
}

/// Closed-form realized PNL for one position row.
///
/// net_qty >= 0: (sell_avg - buy_avg) * sell_qty
/// net_qty <  0: (sell_avg - buy_avg) * buy_qty
pub fn realized_pnl(row: &PositionRow) -> Result<Micros, SettlementError> {
    let closed_qty = if row.net_qty.is_negative() {
        row.buy_qty
    } else {
        row.sell_qty
    };
    spread_value(row.sell_avg_price, row.buy_avg_price, closed_qty)
        .ok_or_else(|| overflow(row, "realized_pnl"))
}

/// Settlement PNL of the open quantity against `settle`.
///
/// net_qty > 0: (settle - buy_avg) * |net_qty|
/// net_qty < 0: (sell_avg - settle) * |net_qty|
/// net_qty = 0: 0
pub fn settlement_pnl(row: &PositionRow, settle: Micros) -> Result<Micros, SettlementError> {
    let open = row.net_qty.abs();
    let v = if row.net_qty.is_positive() {
        spread_value(settle, row.buy_avg_price, open)
    } else if row.net_qty.is_negative() {
        spread_value(row.sell_avg_price, settle, open)
    } else {
        Some(Micros::ZERO)
    };
    v.ok_or_else(|| overflow(row, "settlement_pnl"))
}

fn accumulate(
    totals: &mut SegmentTotals,
    realized: Micros,
    settlement: Micros,
    row: &PositionRow,
) -> Result<(), SettlementError> {
    totals.rows += 1;
    totals.realized = totals
        .realized
        .checked_add(realized)
        .ok_or_else(|| overflow(row, "segment_realized"))?;
    totals.settlement = totals
        .settlement
        .checked_add(settlement)
        .ok_or_else(|| overflow(row, "segment_settlement"))?;
    Ok(())
}

/// Value every NFO/BFO row and roll the results up per segment.
///
/// Rows of other exchanges are skipped. Returns `Ok(None)` when `rows` is
/// empty so callers can tell "no data" apart from a computed zero.
pub fn compute_settlement<'a, I>(
    rows: I,
    cfg: &SettlementConfig,
) -> Result<Option<SettlementResult>, SettlementError>
where
    I: IntoIterator<Item = &'a PositionRow>,
{
    let mut seen_any = false;
    let mut nfo = SegmentTotals::empty(Segment::Nfo);
    let mut bfo = SegmentTotals::empty(Segment::Bfo);
    let mut valuations = Vec::new();
    let mut unmatched = Vec::new();

    for row in rows {
        seen_any = true;
        let Some(segment) = row.segment() else {
            continue;
        };

        let realized = realized_pnl(row)?;

        let (settlement_price, settlement) = match cfg.segment(segment).active_prices() {
            None => (None, Micros::ZERO),
            Some(prices) => match prices.get(&row.instrument_key) {
                Some(px) => (Some(px), settlement_pnl(row, px)?),
                None => {
                    warn!(
                        segment = %segment,
                        instrument = %row.instrument_key,
                        account = row.account_id.as_deref().unwrap_or("-"),
                        "no settlement price; settlement pnl set to 0"
                    );
                    unmatched.push(UnmatchedReference {
                        account_id: row.account_id.clone(),
                        segment,
                        instrument_key: row.instrument_key.clone(),
                    });
                    (None, Micros::ZERO)
                }
            },
        };

        let totals = match segment {
            Segment::Nfo => &mut nfo,
            Segment::Bfo => &mut bfo,
        };
        accumulate(totals, realized, settlement, row)?;

        valuations.push(SettlementValuation {
            account_id: row.account_id.clone(),
            segment,
            symbol: row.symbol.clone(),
            instrument_key: row.instrument_key.clone(),
            net_quantity: row.net_qty,
            settlement_price,
            calculated_realized_pnl: realized,
            calculated_settlement_pnl: settlement,
        });
    }

    if !seen_any {
        return Ok(None);
    }

    let grand_overflow = || SettlementError::Overflow {
        instrument_key: "*".to_string(),
        field: "grand_total",
    };
    let overall_realized = nfo
        .realized
        .checked_add(bfo.realized)
        .ok_or_else(grand_overflow)?;
    let overall_settlement = nfo
        .settlement
        .checked_add(bfo.settlement)
        .ok_or_else(grand_overflow)?;
    let grand_total = overall_realized
        .checked_add(overall_settlement)
        .ok_or_else(grand_overflow)?;

    debug!(
        nfo_rows = nfo.rows,
        bfo_rows = bfo.rows,
        unmatched = unmatched.len(),
        %grand_total,
        "settlement computed"
    );

    Ok(Some(SettlementResult {
        nfo,
        bfo,
        overall_realized,
        overall_settlement,
        grand_total,
        valuations,
        unmatched,
    }))
}

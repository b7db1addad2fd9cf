use std::collections::BTreeMap;

use eod_ledger::{Micros, Qty};

use crate::error::SettlementError;

/// Exchange segments that carry settlement valuation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Nfo,
    Bfo,
}

impl Segment {
    pub const ALL: [Segment; 2] = [Segment::Nfo, Segment::Bfo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Nfo => "NFO",
            Segment::Bfo => "BFO",
        }
    }

    /// Exact exchange code match (`"NFO"` / `"BFO"`); anything else is not a segment.
    pub fn from_exchange(exchange: &str) -> Option<Segment> {
        match exchange.trim() {
            "NFO" => Some(Segment::Nfo),
            "BFO" => Some(Segment::Bfo),
            _ => None,
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column names a positions export must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Exchange",
    "Symbol",
    "Net Qty",
    "Buy Avg Price",
    "Sell Avg Price",
    "Sell Qty",
    "Buy Qty",
    "Realized Profit",
    "Unrealized Profit",
];

/// Account id column; only the multi-account summary needs it.
pub const ACCOUNT_COLUMN: &str = "UserID";

/// Fail with every missing required column named, in declaration order.
pub fn check_required_columns<S: AsRef<str>>(columns: &[S]) -> Result<(), SettlementError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|req| !columns.iter().any(|c| c.as_ref() == **req))
        .map(|s| s.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SettlementError::MissingColumns(missing))
    }
}

/// One instrument line of a positions export.
///
/// `net_qty` is signed (+long, -short); the leg quantities are not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionRow {
    pub account_id: Option<String>,
    pub exchange: String,
    pub symbol: String,
    /// Settlement lookup key (strike + option type for NFO/BFO rows).
    pub instrument_key: String,
    pub net_qty: Qty,
    pub buy_avg_price: Micros,
    pub sell_avg_price: Micros,
    pub buy_qty: Qty,
    pub sell_qty: Qty,
    /// Broker-reported figures, carried through for the report but never used
    /// by the calculator.
    pub realized_profit: Micros,
    pub unrealized_profit: Micros,
}

impl PositionRow {
    pub fn segment(&self) -> Option<Segment> {
        Segment::from_exchange(&self.exchange)
    }
}

/// A validated positions dataset.
///
/// Construction checks the column set once; the calculator never looks at
/// column names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionTable {
    has_account_column: bool,
    rows: Vec<PositionRow>,
}

impl PositionTable {
    pub fn new<S: AsRef<str>>(
        columns: &[S],
        rows: Vec<PositionRow>,
    ) -> Result<Self, SettlementError> {
        check_required_columns(columns)?;
        let has_account_column = columns.iter().any(|c| c.as_ref() == ACCOUNT_COLUMN);
        Ok(Self {
            has_account_column,
            rows,
        })
    }

    pub fn rows(&self) -> &[PositionRow] {
        &self.rows
    }

    pub fn has_account_column(&self) -> bool {
        self.has_account_column
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows belonging to `account_id`.
    pub fn rows_for_account<'a>(
        &'a self,
        account_id: &'a str,
    ) -> impl Iterator<Item = &'a PositionRow> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.account_id.as_deref() == Some(account_id))
    }

    /// Distinct account ids in order of first appearance.
    pub fn distinct_accounts(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for r in &self.rows {
            if let Some(a) = &r.account_id {
                if !out.contains(a) {
                    out.push(a.clone());
                }
            }
        }
        out
    }
}

/// Instrument key -> settlement (or close) price for one segment.
///
/// Already filtered to the relevant expiry by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementPrices {
    prices: BTreeMap<String, Micros>,
}

impl SettlementPrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already present; returns `false` for a
    /// duplicate (first price wins).
    pub fn insert_first<S: Into<String>>(&mut self, key: S, price: Micros) -> bool {
        let key = key.into();
        if self.prices.contains_key(&key) {
            return false;
        }
        self.prices.insert(key, price);
        true
    }

    pub fn get(&self, key: &str) -> Option<Micros> {
        self.prices.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Micros)> for SettlementPrices {
    fn from_iter<I: IntoIterator<Item = (S, Micros)>>(iter: I) -> Self {
        let mut out = SettlementPrices::new();
        for (k, px) in iter {
            out.insert_first(k, px);
        }
        out
    }
}

/// Settlement switch + price source for one segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentSettlement {
    pub enabled: bool,
    pub prices: Option<SettlementPrices>,
}

impl SegmentSettlement {
    pub fn enabled(prices: SettlementPrices) -> Self {
        Self {
            enabled: true,
            prices: Some(prices),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// The price map, only when settlement is switched on and a map exists.
    pub fn active_prices(&self) -> Option<&SettlementPrices> {
        if self.enabled {
            self.prices.as_ref()
        } else {
            None
        }
    }
}

/// Per-segment settlement inputs for one calculator run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementConfig {
    pub nfo: SegmentSettlement,
    pub bfo: SegmentSettlement,
}

impl SettlementConfig {
    pub fn segment(&self, segment: Segment) -> &SegmentSettlement {
        match segment {
            Segment::Nfo => &self.nfo,
            Segment::Bfo => &self.bfo,
        }
    }
}

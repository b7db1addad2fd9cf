//! Broker positions export -> [`PositionTable`].
//!
//! Required columns are checked by `eod-settlement`; `UserID` is optional.
//! Empty numeric cells read as zero, anything else unparseable is fatal.

use std::io::Read;
use std::path::Path;

use eod_ledger::{Micros, Qty};
use eod_settlement::{check_required_columns, PositionRow, PositionTable, Segment, ACCOUNT_COLUMN};
use tracing::info;

use crate::decimal::{parse_micros_raw, DecimalError};
use crate::error::IngestError;
use crate::table::{csv_reader, open, ColumnIndex};

/// Settlement lookup key for a position symbol.
///
/// NFO/BFO option symbols end in `<type> <strike>` (e.g. `NIFTY 27MAR25 CE 24500`);
/// the key is the last five characters followed by characters `[-8, -6)`
/// (`24500CE`). Short symbols degrade to whatever characters exist. Other
/// exchanges keep the symbol unchanged.
pub fn instrument_key(exchange: &str, symbol: &str) -> String {
    if Segment::from_exchange(exchange).is_none() {
        return symbol.to_string();
    }
    let chars: Vec<char> = symbol.chars().collect();
    let n = chars.len();
    let strike: String = chars[n.saturating_sub(5)..].iter().collect();
    let kind: String = chars[n.saturating_sub(8)..n.saturating_sub(6)].iter().collect();
    format!("{strike}{kind}")
}

pub fn read_positions_path(path: &Path) -> Result<PositionTable, IngestError> {
    let table = read_positions(open(path)?)?;
    info!(
        path = %path.display(),
        rows = table.rows().len(),
        accounts = table.distinct_accounts().len(),
        "positions loaded"
    );
    Ok(table)
}

pub fn read_positions<R: Read>(src: R) -> Result<PositionTable, IngestError> {
    let mut rdr = csv_reader(src);
    let cols = ColumnIndex::from_headers(rdr.headers()?);
    check_required_columns(cols.names())?;
    let has_account = cols.has(ACCOUNT_COLUMN);

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row_no = i + 1;

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let text = |name: &str| cols.get(&record, name).unwrap_or("").to_string();
        let num = |name: &str| -> Result<i64, IngestError> {
            let raw = cols.get(&record, name).unwrap_or("");
            match parse_micros_raw(raw) {
                Ok(v) => Ok(v),
                Err(DecimalError::Empty) => Ok(0),
                Err(_) => Err(IngestError::ParseField {
                    row: row_no,
                    column: name.to_string(),
                    raw: raw.to_string(),
                }),
            }
        };
        let qty = |name: &str| num(name).map(Qty::new);
        let money = |name: &str| num(name).map(Micros::new);

        let exchange = text("Exchange");
        let symbol = text("Symbol");
        let account_id = if has_account {
            cols.get_nonempty(&record, ACCOUNT_COLUMN).map(str::to_string)
        } else {
            None
        };

        rows.push(PositionRow {
            account_id,
            instrument_key: instrument_key(&exchange, &symbol),
            net_qty: qty("Net Qty")?,
            buy_avg_price: money("Buy Avg Price")?,
            sell_avg_price: money("Sell Avg Price")?,
            buy_qty: qty("Buy Qty")?,
            sell_qty: qty("Sell Qty")?,
            realized_profit: money("Realized Profit")?,
            unrealized_profit: money("Unrealized Profit")?,
            exchange,
            symbol,
        });
    }

    Ok(PositionTable::new(cols.names(), rows)?)
}
